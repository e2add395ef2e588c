//! Error types for the XDB service facade.

use thiserror::Error;

/// Service error type.
#[derive(Debug, Error)]
pub enum XdbError {
    /// Store error passthrough.
    #[error("Store error: {0}")]
    Store(#[from] xdb_store::StoreError),

    /// Codec error passthrough.
    #[error("Codec error: {0}")]
    Codec(#[from] xdb_codec::CodecError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
