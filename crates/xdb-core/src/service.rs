//! The document service facade.
//!
//! [`DocumentService`] owns the storage handle and the administrator
//! account, and exposes the operations a request router needs: organization
//! lookup, document read, upload and removal. Callers pass a user that has
//! already been authenticated.

use crate::{
    auth::{self, Credentials},
    config::XdbConfig,
    error::XdbError,
    response::{ApiResult, XmlDocument, DOCUMENT_CORRUPTED, NO_XML_DATA},
    Result,
};

use xdb_codec::decode::{is_self_describing, output_encoding, resolve_encoding};
use xdb_codec::{Method, XmlOptions};
use xdb_store::{OrganizationSummary, Outcome, Repository, Storage, User};

use tracing::{debug, info, warn};

/// Entry point for document operations.
///
/// # Example
///
/// ```rust
/// use xdb_core::{Credentials, DocumentService, XdbConfig};
///
/// let mut config = XdbConfig::default();
/// config.storage.temporary = true;
/// let service = DocumentService::open(config).unwrap();
///
/// let root = service
///     .authenticate(&Credentials::new("root", "qwerty"))
///     .unwrap()
///     .unwrap();
/// let org = service.repository().org_create_one("Acme").unwrap();
///
/// let created = service
///     .add_document(&root, org.org_id(), br#"<person name="Ann">42</person>"#, None)
///     .unwrap();
/// assert_eq!(serde_json::to_string(&created).unwrap(), r#"{"result":1,"doc_id":1}"#);
/// ```
pub struct DocumentService {
    config: XdbConfig,
    storage: Storage,
}

impl DocumentService {
    /// Opens the store and makes sure the `root` account exists.
    ///
    /// # Errors
    ///
    /// - `XdbError::Config` if the default encoding is not recognised
    /// - `XdbError::Io` if the database directory cannot be created
    /// - `XdbError::Store` if the database cannot be opened
    pub fn open(config: XdbConfig) -> Result<Self> {
        resolve_encoding(&config.policy.default_encoding).map_err(|_| {
            XdbError::Config(format!(
                "unknown default encoding `{}`",
                config.policy.default_encoding
            ))
        })?;

        let storage = if config.storage.temporary {
            Storage::temporary()?
        } else {
            if let Some(parent) = config.storage.db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Storage::open(&config.storage.db_path)?
        };

        let root = User::root(&config.auth.root_password)?;
        if Repository::new(&storage).init_users_storage(&root)? {
            info!("created root account");
        }

        info!(
            "document service opened ({})",
            if config.storage.temporary {
                "in memory".to_string()
            } else {
                config.storage.db_path.display().to_string()
            }
        );

        Ok(Self { config, storage })
    }

    pub fn config(&self) -> &XdbConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.storage)
    }

    /// Checks credentials, returning the user on success.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>> {
        auth::authenticate(&self.repository(), credentials)
    }

    /// Organization metadata, or `None` if it does not exist.
    pub fn org_info(&self, org_id: &str) -> Result<Option<OrganizationSummary>> {
        Ok(self.repository().org_get_info(org_id)?)
    }

    /// Reads one document as XML in its stored encoding.
    ///
    /// Returns `None` when the document does not exist or `user` is not a
    /// member of the organization; the two cases are not told apart.
    pub fn get_document(&self, user: &User, org_id: &str, doc_id: u64) -> Result<Option<XmlDocument>> {
        let doc = match self.repository().doc_find_one(user, org_id, doc_id)? {
            Outcome::Done(doc) => doc,
            other => {
                debug!("document {}/{} not served: {:?}", org_id, doc_id, other);
                return Ok(None);
            }
        };

        let options = XmlOptions::new()
            .with_method(Method::Xml)
            .with_prettify(self.config.policy.prettify)
            .with_default_root_name(self.config.policy.default_root_name.as_str());
        let body = doc.to_xml(&options)?;
        let (_, encoding) = output_encoding(doc.encoding())?;

        Ok(Some(XmlDocument { encoding, body }))
    }

    /// Stores an uploaded XML document.
    ///
    /// `charset` is the caller's declared charset. When absent, the body's
    /// own byte-order mark or XML declaration decides, and failing those the
    /// configured default encoding.
    ///
    /// # Returns
    ///
    /// - `{result: 1, doc_id}` when stored
    /// - `{result: 0, error}` for an empty or malformed body
    /// - `{result: 0}` when `user` may not write to the organization
    pub fn add_document(
        &self,
        user: &User,
        org_id: &str,
        body: &[u8],
        charset: Option<&str>,
    ) -> Result<ApiResult> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiResult::error(NO_XML_DATA));
        }

        let declared = charset.filter(|c| !c.trim().is_empty());
        let charset = match declared {
            Some(label) => Some(label),
            None if !is_self_describing(body) => Some(self.config.policy.default_encoding.as_str()),
            None => None,
        };

        match self.repository().doc_create_one(user, org_id, body, charset) {
            Ok(Outcome::Done(doc_id)) => Ok(ApiResult::success(doc_id)),
            Ok(outcome) => {
                debug!("upload to {} by {} refused: {:?}", org_id, user.login(), outcome);
                Ok(ApiResult::failure())
            }
            Err(err) if err.is_parse() => {
                warn!("upload to {} by {} rejected: {}", org_id, user.login(), err);
                Ok(ApiResult::error(DOCUMENT_CORRUPTED))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes one document.
    ///
    /// Any authenticated user may delete unless
    /// `policy.require_membership_for_delete` is set.
    pub fn delete_document(&self, user: &User, org_id: &str, doc_id: u64) -> Result<ApiResult> {
        let repo = self.repository();
        if self.config.policy.require_membership_for_delete
            && !repo.org_check_user(org_id, user.login())?
        {
            debug!("delete in {} by non-member {} refused", org_id, user.login());
            return Ok(ApiResult::failure());
        }

        Ok(match repo.doc_remove_one(org_id, doc_id)? {
            Outcome::Done(doc_id) => ApiResult::success(doc_id),
            _ => ApiResult::error(format!("No document with ID {} found.", doc_id)),
        })
    }
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("storage", &self.storage)
            .field("policy", &self.config.policy)
            .finish()
    }
}
