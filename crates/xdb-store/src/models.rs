//! # Data Models for the Document Store
//!
//! Users, organizations and documents, plus the result types shared by the
//! storage and repository layers.
//!
//! ## Invariants
//!
//! | Type | Invariant |
//! |------|-----------|
//! | `User` | login is 4 to 39 characters, stored lowercased; password kept only as SHA-256 hex |
//! | `Organization` | name is 1 to 149 characters; `root` is a member from creation |
//! | `Organization` | `doc_count` only grows; a document id is never handed out twice |
//! | `Document` | cannot be stored before its data is set |
//!
//! ## Persisted Layout
//!
//! ```text
//! organizations/<org_id> = {
//!     "org_id", "org_name", "creation_date", "doc_count",
//!     "users": ["root", ...],
//!     "docs": [{"doc_id", "last_modified", "encoding", "data"}, ...]
//! }
//! users/<login> = {"login", "password_hash"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;
use xdb_codec::decode::{detect_encoding, encoding_label, resolve_encoding};
use xdb_codec::{xml_to_json_with_charset, CodecError, Tree, XmlOptions};

/// Login of the administrator present in every organization.
pub const ROOT_LOGIN: &str = "root";

/// Shortest accepted login, in characters.
pub const LOGIN_MIN_LEN: usize = 4;

/// Logins must be strictly shorter than this.
pub const LOGIN_MAX_LEN: usize = 40;

/// Organization names must be strictly shorter than this.
pub const ORG_NAME_MAX_LEN: usize = 150;

/// Encoding assumed for documents that do not declare one.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Returns the SHA-256 hex digest stored in place of a password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// A user account.
///
/// Built once through [`User::new`] and never mutated. Two users are equal
/// when both the login and the password hash match.
///
/// # Example
///
/// ```rust
/// use xdb_store::User;
///
/// let user = User::new("Alice", "secret").unwrap();
/// assert_eq!(user.login(), "alice");
/// assert_eq!(user, User::new("alice", "secret").unwrap());
/// assert_ne!(user, User::new("alice", "other").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    login: String,
    password_hash: String,
}

impl User {
    /// Creates a user, hashing the password.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the login is shorter than 4 or
    /// longer than 39 characters.
    pub fn new(login: &str, password: &str) -> Result<Self> {
        let len = login.chars().count();
        if !(LOGIN_MIN_LEN..LOGIN_MAX_LEN).contains(&len) {
            return Err(StoreError::Validation(format!(
                "login must have at least {} and fewer than {} characters, got {}",
                LOGIN_MIN_LEN, LOGIN_MAX_LEN, len
            )));
        }
        Ok(User {
            login: login.to_lowercase(),
            password_hash: hash_password(password),
        })
    }

    /// Creates the administrator account.
    pub fn root(password: &str) -> Result<Self> {
        User::new(ROOT_LOGIN, password)
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_root(&self) -> bool {
        self.login == ROOT_LOGIN
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.login)
    }
}

/// Organization metadata without members or documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub org_id: String,
    pub org_name: String,
    pub creation_date: DateTime<Utc>,
    pub doc_count: u64,
}

/// A tenant owning a set of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    org_id: String,
    org_name: String,
    creation_date: DateTime<Utc>,
    doc_count: u64,
    users: Vec<String>,
    docs: Vec<DocumentRecord>,
}

impl Organization {
    /// Creates an organization with a fresh id and `root` as its only member.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the name is empty or has 150 or
    /// more characters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xdb_store::Organization;
    ///
    /// let org = Organization::new("Acme").unwrap();
    /// assert_eq!(org.doc_count(), 0);
    /// assert!(org.has_user("root"));
    /// assert!(Organization::new("").is_err());
    /// ```
    pub fn new(org_name: &str) -> Result<Self> {
        Organization::with_contents(org_name, &[], &[])
    }

    /// Creates an organization with initial members and documents.
    ///
    /// `root` always comes first among the members; documents are numbered
    /// from 1 in the order given.
    ///
    /// # Errors
    ///
    /// - `StoreError::Validation` for a bad name
    /// - `StoreError::MissingData` if a document has no data
    pub fn with_contents(org_name: &str, users: &[User], docs: &[Document]) -> Result<Self> {
        let len = org_name.chars().count();
        if len == 0 || len >= ORG_NAME_MAX_LEN {
            return Err(StoreError::Validation(format!(
                "organization name must have at least 1 and fewer than {} characters, got {}",
                ORG_NAME_MAX_LEN, len
            )));
        }
        let mut org = Organization {
            org_id: Uuid::new_v4().simple().to_string(),
            org_name: org_name.to_string(),
            creation_date: Utc::now(),
            doc_count: 0,
            users: vec![ROOT_LOGIN.to_string()],
            docs: Vec::new(),
        };
        for user in users.iter().filter(|u| !u.is_root()) {
            org.add_user(user)?;
        }
        for doc in docs {
            org.append_doc(doc)?;
        }
        Ok(org)
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Number of document ids ever assigned.
    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn docs(&self) -> &[DocumentRecord] {
        &self.docs
    }

    pub fn summary(&self) -> OrganizationSummary {
        OrganizationSummary {
            org_id: self.org_id.clone(),
            org_name: self.org_name.clone(),
            creation_date: self.creation_date,
            doc_count: self.doc_count,
        }
    }

    pub fn has_user(&self, login: &str) -> bool {
        self.users.iter().any(|u| u == login)
    }

    /// Adds a member. Returns false if the login is already a member.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for the reserved `root` login.
    pub fn add_user(&mut self, user: &User) -> Result<bool> {
        reject_reserved(user)?;
        if self.has_user(user.login()) {
            return Ok(false);
        }
        self.users.push(user.login().to_string());
        Ok(true)
    }

    /// Removes a member. Returns false if the login was not a member.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for the reserved `root` login.
    pub fn remove_user(&mut self, user: &User) -> Result<bool> {
        reject_reserved(user)?;
        let before = self.users.len();
        self.users.retain(|u| u != user.login());
        Ok(self.users.len() != before)
    }

    pub fn find_doc(&self, doc_id: u64) -> Option<&DocumentRecord> {
        self.docs.iter().find(|d| d.doc_id == doc_id)
    }

    /// Assigns the next id to `doc` and appends it.
    ///
    /// The counter and the list change together, so callers must run this
    /// inside a single atomic update.
    pub(crate) fn append_doc(&mut self, doc: &Document) -> Result<u64> {
        let doc_id = self.doc_count + 1;
        let record = doc.to_storage_form_with_id(doc_id)?;
        self.doc_count = doc_id;
        self.docs.push(record);
        Ok(doc_id)
    }

    /// Removes a document. The counter is left alone.
    pub(crate) fn remove_doc(&mut self, doc_id: u64) -> bool {
        let before = self.docs.len();
        self.docs.retain(|d| d.doc_id != doc_id);
        self.docs.len() != before
    }
}

pub(crate) fn reject_reserved(user: &User) -> Result<()> {
    if user.is_root() {
        return Err(StoreError::Validation(format!(
            "login `{}` is reserved",
            ROOT_LOGIN
        )));
    }
    Ok(())
}

/// Parses `bytes` as the JSON text of a tree, if that is what they are.
///
/// Only input whose first significant character opens an object is tried;
/// XML never starts that way.
fn json_tree(bytes: &[u8]) -> Option<Tree> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Tree::from_json_slice(body).ok(),
        _ => None,
    }
}

/// Stored form of a document inside its organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: u64,
    pub last_modified: DateTime<Utc>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    pub data: Tree,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

/// Input accepted by [`Document::set_data`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// A tree, stored as given.
    Tree(Tree),
    /// Raw bytes: JSON text of a tree is stored as parsed, anything else
    /// is read as XML.
    Raw(Vec<u8>),
}

impl From<Tree> for Payload {
    fn from(tree: Tree) -> Self {
        Payload::Tree(tree)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Raw(text.as_bytes().to_vec())
    }
}

/// A document before or after it is placed in an organization.
///
/// # Example
///
/// ```rust
/// use xdb_store::Document;
///
/// let mut doc = Document::new();
/// assert!(doc.to_storage_form().is_err());
///
/// doc.set_data(r#"<person name="Ann">42</person>"#).unwrap();
/// let json = doc.data().unwrap().to_json_string().unwrap();
/// assert_eq!(json, r#"{"person":{"@name":"Ann","$":"42"}}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    doc_id: Option<u64>,
    last_modified: DateTime<Utc>,
    encoding: String,
    data: Option<Tree>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            doc_id: None,
            last_modified: Utc::now(),
            encoding: default_encoding(),
            data: None,
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from raw input and an optional declared charset.
    pub fn from_raw(raw: impl Into<Payload>, charset: Option<&str>) -> Result<Self> {
        let mut doc = Document::new();
        doc.set_data_with_charset(raw, charset)?;
        Ok(doc)
    }

    /// Rebuilds a document from its stored form.
    pub fn from_record(record: DocumentRecord) -> Self {
        Document {
            doc_id: Some(record.doc_id),
            last_modified: record.last_modified,
            encoding: record.encoding,
            data: Some(record.data),
        }
    }

    pub fn doc_id(&self) -> Option<u64> {
        self.doc_id
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn data(&self) -> Option<&Tree> {
        self.data.as_ref()
    }

    /// Replaces the encoding label, keeping the content.
    pub fn set_encoding(&mut self, label: &str) -> Result<()> {
        self.encoding = encoding_label(resolve_encoding(label)?);
        Ok(())
    }

    /// Sets the content, detecting the encoding of XML input.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Codec` when XML input does not parse.
    pub fn set_data(&mut self, raw: impl Into<Payload>) -> Result<()> {
        self.set_data_with_charset(raw, None)
    }

    /// Sets the content using a caller-declared charset.
    ///
    /// For XML input the encoding is taken from a byte-order mark, then
    /// `charset`, then the XML declaration, then UTF-8; the label found is
    /// recorded on the document. A tree, given directly or as JSON text, is
    /// stored unchanged and only takes the label of `charset` when one is
    /// given.
    pub fn set_data_with_charset(
        &mut self,
        raw: impl Into<Payload>,
        charset: Option<&str>,
    ) -> Result<()> {
        match raw.into() {
            Payload::Tree(tree) => self.set_tree(tree, charset)?,
            Payload::Raw(bytes) => match json_tree(&bytes) {
                Some(tree) => self.set_tree(tree, charset)?,
                None => {
                    let encoding = detect_encoding(&bytes, charset)?;
                    let tree = xml_to_json_with_charset(&bytes, charset)?;
                    self.encoding = encoding_label(encoding);
                    self.data = Some(tree);
                }
            },
        }
        self.last_modified = Utc::now();
        Ok(())
    }

    fn set_tree(&mut self, tree: Tree, charset: Option<&str>) -> Result<()> {
        if let Some(label) = charset.filter(|l| !l.trim().is_empty()) {
            self.encoding = encoding_label(resolve_encoding(label)?);
        }
        self.data = Some(tree);
        Ok(())
    }

    /// Produces the stored form.
    ///
    /// # Errors
    ///
    /// - `StoreError::MissingData` if no data has been set
    /// - `StoreError::Validation` if the document has no id yet
    pub fn to_storage_form(&self) -> Result<DocumentRecord> {
        let doc_id = self.doc_id.ok_or_else(|| {
            StoreError::Validation("document has not been assigned an id".to_string())
        })?;
        self.to_storage_form_with_id(doc_id)
    }

    fn to_storage_form_with_id(&self, doc_id: u64) -> Result<DocumentRecord> {
        let data = self.data.clone().ok_or(StoreError::MissingData)?;
        Ok(DocumentRecord {
            doc_id,
            last_modified: self.last_modified,
            encoding: self.encoding.clone(),
            data,
        })
    }

    /// Renders the document as XML in its own encoding.
    ///
    /// The encoding in `options` is replaced by the document's.
    pub fn to_xml(&self, options: &XmlOptions) -> Result<Vec<u8>> {
        let data = self.data.as_ref().ok_or(StoreError::MissingData)?;
        let options = options.clone().with_encoding(self.encoding.as_str());
        Ok(xdb_codec::json_to_xml(data, &options)?)
    }
}

/// Result of a conditional update on one organization.
///
/// Mirrors the matched/modified counts of a document database update so
/// callers can tell "no such organization" apart from "nothing changed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult<A> {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Value returned by the update when it modified the record.
    pub value: Option<A>,
}

impl<A> UpdateResult<A> {
    pub fn unmatched() -> Self {
        UpdateResult {
            matched_count: 0,
            modified_count: 0,
            value: None,
        }
    }

    pub fn unmodified() -> Self {
        UpdateResult {
            matched_count: 1,
            modified_count: 0,
            value: None,
        }
    }

    pub fn modified(value: A) -> Self {
        UpdateResult {
            matched_count: 1,
            modified_count: 1,
            value: Some(value),
        }
    }

    /// Collapses the counts into an [`Outcome`].
    pub fn into_outcome(self) -> Outcome<A> {
        match (self.matched_count, self.value) {
            (0, _) => Outcome::NotFound,
            (_, Some(value)) if self.modified_count > 0 => Outcome::Done(value),
            _ => Outcome::Unmodified,
        }
    }
}

/// Expected results of a repository operation that are not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation took effect.
    Done(T),
    /// The caller is not a member of the organization.
    PermissionDenied,
    /// The organization or document does not exist.
    NotFound,
    /// The target exists but nothing was changed.
    Unmodified,
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::PermissionDenied => Outcome::PermissionDenied,
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Unmodified => Outcome::Unmodified,
        }
    }
}

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded database failed.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad constructor argument or reserved login.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record with this key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Document content could not be converted.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A stored record has an unexpected shape.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// A document was stored or rendered before its data was set.
    #[error("Document data has not been set")]
    MissingData,
}

impl StoreError {
    /// Returns true when the error comes from malformed document content.
    pub fn is_parse(&self) -> bool {
        matches!(self, StoreError::Codec(e) if e.is_parse())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
