//! # XDB Store
//!
//! Persistence for the XDB document service: users, organizations and the
//! XML documents they own, kept in an embedded Sled database.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          XDB STORE                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   Repository<'_>   membership gates, id assignment,          │
//! │        │           Outcome values                            │
//! │        ▼                                                     │
//! │   Storage          sled trees `users` / `organizations`,     │
//! │        │           CAS inserts, transactional updates        │
//! │        ▼                                                     │
//! │   models           User, Organization, Document              │
//! │                    (documents held as xdb_codec::Tree)       │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! A document id is `doc_count + 1`, computed inside the same transaction
//! that appends the document and bumps the counter. Concurrent writers to
//! one organization therefore always receive distinct, increasing ids, and
//! removing a document never makes its id available again.
//!
//! ## Usage
//!
//! ```rust
//! use xdb_store::{Outcome, Repository, Storage, User};
//!
//! let storage = Storage::temporary().unwrap();
//! let repo = Repository::new(&storage);
//! let root = User::root("qwerty").unwrap();
//!
//! let org = repo.org_create_one("Acme").unwrap();
//! let id = repo.doc_create_one(&root, org.org_id(), "<a>1</a>", None).unwrap();
//! assert_eq!(id, Outcome::Done(1));
//!
//! let doc = repo.doc_find_one(&root, org.org_id(), 1).unwrap().done().unwrap();
//! assert_eq!(doc.data().unwrap().to_json_string().unwrap(), r#"{"a":{"$":"1"}}"#);
//! ```

pub mod models;
pub mod repository;
pub mod storage;

pub use models::{
    hash_password, Document, DocumentRecord, Organization, OrganizationSummary, Outcome, Payload,
    Result, StoreError, UpdateResult, User, DEFAULT_ENCODING, ROOT_LOGIN,
};
pub use repository::Repository;
pub use storage::Storage;
