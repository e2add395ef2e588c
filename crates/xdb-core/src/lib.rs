//! # XDB Core
//!
//! A small multi-tenant XML document service. Organizations own documents;
//! each document is stored as an order-preserving JSON tree and served back
//! as XML. Callers authenticate with a login and password.
//!
//! ## Operations
//!
//! | Operation | Success | Failure |
//! |-----------|---------|---------|
//! | `org_info` | organization summary | `None` |
//! | `get_document` | XML body + charset | `None` |
//! | `add_document` | `{"result":1,"doc_id":n}` | `{"result":0,"error":...}` or `{"result":0}` |
//! | `delete_document` | `{"result":1,"doc_id":n}` | `{"result":0,"error":...}` |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            XDB CORE                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   Credentials ──▶ authenticate ──▶ User                         │
//! │                                      │                          │
//! │                        ┌─────────────▼─────────────┐            │
//! │                        │      DocumentService      │            │
//! │                        └─────────────┬─────────────┘            │
//! │                                      │                          │
//! │              ┌───────────────────────┼──────────────────┐       │
//! │              ▼                       ▼                  ▼       │
//! │      ┌──────────────┐        ┌──────────────┐   ┌────────────┐  │
//! │      │  xdb-codec   │        │  Repository  │   │ XdbConfig  │  │
//! │      │ XML <-> tree │        │ (xdb-store)  │   │  policy    │  │
//! │      └──────────────┘        └──────────────┘   └────────────┘  │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use xdb_core::{Credentials, DocumentService, XdbConfig};
//!
//! let mut config = XdbConfig::default();
//! config.storage.temporary = true;
//! let service = DocumentService::open(config).unwrap();
//!
//! let root = service.authenticate(&Credentials::new("root", "qwerty")).unwrap().unwrap();
//! let org = service.repository().org_create_one("Acme").unwrap();
//! service.add_document(&root, org.org_id(), b"<note>hi</note>", None).unwrap();
//!
//! let doc = service.get_document(&root, org.org_id(), 1).unwrap().unwrap();
//! assert_eq!(doc.content_type(), "text/xml; charset=utf-8");
//! ```
//!
//! ## Notes
//!
//! - Permission failures are reported without detail
//! - Unparseable uploads never change the store
//! - Document ids are never reused after deletion

mod auth;
mod config;
mod error;
mod response;
mod service;

pub use auth::{authenticate, Credentials};
pub use config::{AuthConfig, PolicyConfig, StorageConfig, XdbConfig};
pub use error::XdbError;
pub use response::{ApiResult, XmlDocument, DOCUMENT_CORRUPTED, NO_XML_DATA};
pub use service::DocumentService;

// Re-export component types for convenience
pub use xdb_codec::{Method, Tree, XmlOptions};
pub use xdb_store::{Organization, OrganizationSummary, Outcome, Repository, Storage, User};

/// Core result type for service operations.
pub type Result<T> = std::result::Result<T, XdbError>;
