//! # XDB Codec
//!
//! Lossless, order-preserving mapping between XML documents and JSON trees,
//! following the BadgerFish convention. Documents are stored as trees and
//! turned back into XML on read.
//!
//! ## Convention
//!
//! | XML construct              | Tree form                                  |
//! |----------------------------|--------------------------------------------|
//! | `<a>...</a>`               | key `"a"` holding an object                |
//! | `name="v"` attribute       | key `"@name"` holding `"v"`                |
//! | character data             | key `"$"`                                  |
//! | `xmlns:p="uri"`            | `"@xmlns": {"p": "uri"}`                   |
//! | `xmlns="uri"`              | `"@xmlns": {"$": "uri"}`                   |
//! | repeated `<b>` siblings    | key `"b"` holding an array                 |
//!
//! Key order is significant in both directions. Within an element the order
//! is `@xmlns`, attributes, `$`, then children in document order. Repeated
//! siblings are folded into one array at the position of their first
//! occurrence.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         XDB CODEC                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   bytes ──▶ decode ──▶ reader ──▶ Tree (IndexMap)            │
//! │   (BOM / charset /     (quick-xml       │                    │
//! │    prolog sniffing)     events)         │                    │
//! │                                         ▼                    │
//! │   bytes ◀── encode ◀── xml / html / text / c14n ◀── writer   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use xdb_codec::{json_to_xml, xml_to_json, XmlOptions};
//!
//! let tree = xml_to_json(r#"<person name="Ann">42</person>"#).unwrap();
//! assert_eq!(tree.to_json_string().unwrap(), r#"{"person":{"@name":"Ann","$":"42"}}"#);
//!
//! let xml = json_to_xml(&tree, &XmlOptions::default()).unwrap();
//! assert_eq!(
//!     String::from_utf8(xml).unwrap(),
//!     "<?xml version='1.0' encoding='utf-8'?>\n<person name=\"Ann\">42</person>"
//! );
//! ```
//!
//! ## Limits
//!
//! - No DTD or schema validation; a DOCTYPE is accepted and ignored
//! - Comments and processing instructions are dropped
//! - Whole documents are held in memory
//!
//! ## References
//!
//! - BadgerFish: <http://www.sklar.com/badgerfish/>
//! - Canonical XML 1.0: <https://www.w3.org/TR/xml-c14n>

mod c14n;
pub mod decode;
mod error;
mod options;
mod reader;
mod tree;
mod writer;

pub use error::{CodecError, Result};
pub use options::{Method, XmlOptions};
pub use reader::{validate, xml_str_to_json, xml_to_json, xml_to_json_with_charset, XML_NAMESPACE};
pub use tree::{Map, Tree, Value, ATTR_PREFIX, TEXT_KEY, XMLNS_KEY};
pub use writer::{json_str_to_xml, json_to_xml};

#[cfg(test)]
mod tests;
