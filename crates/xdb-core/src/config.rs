//! Configuration types for the XDB document service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`DocumentService`](crate::DocumentService).
///
/// Every section has defaults, so a configuration file only needs the keys
/// it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XdbConfig {
    /// Where documents are kept.
    pub storage: StorageConfig,

    /// Administrator account.
    pub auth: AuthConfig,

    /// Service behaviour.
    pub policy: PolicyConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database directory.
    pub db_path: PathBuf,

    /// Keep everything in memory and discard it on exit.
    pub temporary: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./xdb_store.db"),
            temporary: false,
        }
    }
}

/// Administrator account configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Password of the `root` account created in an empty user store.
    pub root_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root_password: "qwerty".to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("root_password", &"<redacted>")
            .finish()
    }
}

/// Service behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Only members may delete documents.
    pub require_membership_for_delete: bool,

    /// Charset assumed for uploads that declare none and carry neither a
    /// byte-order mark nor an encoding in their XML declaration.
    pub default_encoding: String,

    /// Indent XML returned to readers.
    pub prettify: bool,

    /// Root element name used when a stored tree has no single root.
    pub default_root_name: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            require_membership_for_delete: false,
            default_encoding: "utf-8".to_string(),
            prettify: true,
            default_root_name: "root".to_string(),
        }
    }
}
