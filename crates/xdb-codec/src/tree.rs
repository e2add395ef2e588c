//! # Order-Preserving JSON Tree
//!
//! The storage form of every document is a JSON object whose key order is
//! significant: it is the order in which attributes and child elements are
//! emitted when the document is turned back into XML. A generic JSON map
//! does not promise to keep that order, so the tree is its own type built on
//! [`IndexMap`].
//!
//! ## Convention
//!
//! | XML construct | Tree form |
//! |---------------|-----------|
//! | element `<a>` | key `"a"` holding an object |
//! | attribute `x="1"` | key `"@x"` holding `"1"` |
//! | character data | key `"$"` holding a string |
//! | namespace declarations | key `"@xmlns"` holding `{prefix: uri}`, `"$"` for the default namespace |
//! | repeated `<b>` siblings | key `"b"` holding an array of objects |
//!
//! ## Example
//!
//! ```rust
//! use xdb_codec::Tree;
//!
//! let tree: Tree = r#"{"person": {"@name": "Ann", "$": "42"}}"#.parse().unwrap();
//! let (root, body) = tree.root().unwrap();
//! assert_eq!(root, "person");
//! assert_eq!(body.get("@name").and_then(|v| v.as_str()), Some("Ann"));
//! ```

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Key under which an element's text is stored.
pub const TEXT_KEY: &str = "$";

/// Prefix marking attribute keys.
pub const ATTR_PREFIX: char = '@';

/// Key under which an element's namespace declarations are stored.
pub const XMLNS_KEY: &str = "@xmlns";

/// Ordered object type used at every level of the tree.
pub type Map = IndexMap<String, Value>;

/// A node of the tree.
///
/// Mirrors the JSON data model, except that objects keep insertion order.
/// Note that `PartialEq` on [`Map`] ignores order; compare key sequences when
/// order matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the ordered object if this is an object value.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements if this is an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Stringifies a scalar the way it should appear in XML character data.
    ///
    /// Returns `None` for `null`, arrays and objects.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "sequence",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

/// A whole document in tree form: the top-level ordered object.
///
/// A tree produced from XML always has exactly one key, the root element.
/// Trees with several top-level keys are accepted by the XML writer, which
/// wraps them in a synthesized root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree(Map);

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Tree(Map::new())
    }

    /// Creates a single-rooted tree.
    pub fn with_root(name: impl Into<String>, body: Value) -> Self {
        let mut map = Map::new();
        map.insert(name.into(), body);
        Tree(map)
    }

    /// Decodes a tree from JSON text, keeping key order.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Json` if the text is not a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes a tree from JSON bytes, keeping key order.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encodes the tree as compact JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the tree as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the root element name and body when the tree is single-rooted.
    pub fn root(&self) -> Option<(&str, &Value)> {
        if self.0.len() != 1 {
            return None;
        }
        self.0.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map {
        &self.0
    }

    pub fn into_map(self) -> Map {
        self.0
    }
}

impl From<Map> for Tree {
    fn from(map: Map) -> Self {
        Tree(map)
    }
}

impl FromStr for Tree {
    type Err = crate::error::CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Tree::from_json_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_survives_json() {
        let text = r#"{"root":{"@z":"1","@a":"2","b":{},"a":{}}}"#;
        let tree = Tree::from_json_str(text).unwrap();
        let body = tree.get("root").unwrap().as_object().unwrap();
        let keys: Vec<&str> = body.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["@z", "@a", "b", "a"]);
        assert_eq!(tree.to_json_string().unwrap(), text);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(Tree::from_json_str("[1, 2]").is_err());
        assert!(Tree::from_json_str("\"text\"").is_err());
        assert!(Tree::from_json_str("<a/>").is_err());
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Value::from("x").scalar_text().as_deref(), Some("x"));
        assert_eq!(Value::Bool(true).scalar_text().as_deref(), Some("true"));
        assert_eq!(
            Value::Number(serde_json::Number::from(42)).scalar_text().as_deref(),
            Some("42")
        );
        assert_eq!(Value::Null.scalar_text(), None);
        assert_eq!(Value::Object(Map::new()).scalar_text(), None);
    }

    #[test]
    fn test_root_requires_single_key() {
        let tree = Tree::from_json_str(r#"{"a":{},"b":{}}"#).unwrap();
        assert!(tree.root().is_none());
        assert!(Tree::new().root().is_none());

        let single = Tree::with_root("doc", Value::Object(Map::new()));
        assert_eq!(single.root().map(|(k, _)| k), Some("doc"));
    }

    #[test]
    fn test_null_and_numbers_deserialize() {
        let tree = Tree::from_json_str(r#"{"a":{"@n":3,"@f":1.5,"@b":false,"$":null}}"#).unwrap();
        let body = tree.get("a").unwrap();
        assert!(matches!(body.get("@n"), Some(Value::Number(_))));
        assert!(matches!(body.get("@f"), Some(Value::Number(_))));
        assert_eq!(body.get("@b"), Some(&Value::Bool(false)));
        assert_eq!(body.get("$"), Some(&Value::Null));
    }
}
