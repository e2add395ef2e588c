//! # XML to Tree
//!
//! Parses an XML document and builds its order-preserving tree. Parsing and
//! validation happen in one pass: the document is rejected as soon as it
//! stops being well-formed or namespace-well-formed.
//!
//! ## Rules
//!
//! For every element, keys are emitted in this order:
//!
//! 1. `@xmlns` when the element declares namespaces
//! 2. `@name` for each attribute, in document order
//! 3. `$` for the element's own text
//! 4. one key per distinct child tag, in order of first appearance
//!
//! A leaf element keeps its text verbatim, whitespace included. An element
//! with children keeps only non-blank text, trimmed; indentation between
//! children is not content.
//!
//! ## Rejected Input
//!
//! | Problem | Example |
//! |---------|---------|
//! | Mismatched tags | `<a><b></a>` |
//! | Unclosed element | `<a><b/>` |
//! | Several roots | `<a/><b/>` |
//! | Text outside the root | `<a/>tail` |
//! | Duplicate attribute | `<a x="1" x="2"/>` |
//! | Undeclared prefix | `<p:a/>` |
//! | Undeclared prefix binding | `<a xmlns:p=""/>` |

use crate::decode::decode_xml;
use crate::error::{CodecError, Result};
use crate::tree::{Map, Tree, Value, TEXT_KEY, XMLNS_KEY};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Converts XML bytes to a tree, detecting the encoding from the input.
///
/// # Errors
///
/// Returns `CodecError::Parse` when the document is malformed.
///
/// # Example
///
/// ```rust
/// use xdb_codec::xml_to_json;
///
/// let tree = xml_to_json(br#"<person name="Ann">42</person>"#).unwrap();
/// assert_eq!(
///     tree.to_json_string().unwrap(),
///     r#"{"person":{"@name":"Ann","$":"42"}}"#
/// );
/// ```
pub fn xml_to_json(xml: impl AsRef<[u8]>) -> Result<Tree> {
    xml_to_json_with_charset(xml, None)
}

/// Converts XML bytes to a tree using a caller-declared charset.
///
/// A byte-order mark in the input still takes precedence over `charset`.
pub fn xml_to_json_with_charset(xml: impl AsRef<[u8]>, charset: Option<&str>) -> Result<Tree> {
    let (text, encoding) = decode_xml(xml.as_ref(), charset)?;
    debug!("decoded {} bytes as {}", xml.as_ref().len(), encoding.name());
    xml_str_to_json(&text)
}

/// Converts already-decoded XML text to a tree.
pub fn xml_str_to_json(text: &str) -> Result<Tree> {
    let mut reader = Reader::from_str(text);
    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event()? {
            Event::Start(start) => builder.open(&start)?,
            Event::Empty(start) => {
                builder.open(&start)?;
                let name = utf8(start.name().as_ref())?.to_string();
                builder.close(&name)?;
            }
            Event::End(end) => builder.close(utf8(end.name().as_ref())?)?,
            Event::Text(text) => builder.text(&text.unescape()?)?,
            Event::CData(cdata) => builder.text(utf8(&cdata.into_inner())?)?,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::DocType(_) => builder.doctype()?,
            Event::Eof => break,
        }
    }

    builder.finish()
}

/// Checks that bytes form a well-formed, namespace-well-formed XML document.
pub fn validate(xml: impl AsRef<[u8]>) -> Result<()> {
    xml_to_json(xml).map(|_| ())
}

/// An element whose end tag has not been seen yet.
struct Frame {
    name: String,
    body: Map,
    /// Namespace declarations made on this element, `""` for the default.
    declared: Vec<(String, String)>,
    text: String,
    has_text: bool,
    has_children: bool,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<(String, Value)>,
}

impl TreeBuilder {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(CodecError::Parse(
                "document has more than one root element".to_string(),
            ));
        }

        let name = utf8(start.name().as_ref())?.to_string();
        let mut namespaces = Map::new();
        let mut declared = Vec::new();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();

            if key == "xmlns" {
                namespaces.insert(TEXT_KEY.to_string(), Value::String(value.clone()));
                declared.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                check_binding(prefix, &value)?;
                namespaces.insert(prefix.to_string(), Value::String(value.clone()));
                declared.push((prefix.to_string(), value));
            } else {
                attributes.push((key, value));
            }
        }

        let mut frame = Frame {
            name,
            body: Map::new(),
            declared,
            text: String::new(),
            has_text: false,
            has_children: false,
        };

        if let Some(prefix) = prefix_of(&frame.name)? {
            self.require_bound(prefix, &frame)?;
        }
        for (key, _) in &attributes {
            if let Some(prefix) = prefix_of(key)? {
                self.require_bound(prefix, &frame)?;
            }
        }

        if !namespaces.is_empty() {
            frame
                .body
                .insert(XMLNS_KEY.to_string(), Value::Object(namespaces));
        }
        for (key, value) in attributes {
            frame.body.insert(format!("@{}", key), Value::String(value));
        }

        if let Some(parent) = self.stack.last_mut() {
            parent.has_children = true;
        }
        self.stack.push(frame);
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        let frame = self.stack.pop().ok_or_else(|| {
            CodecError::Parse(format!("closing tag </{}> without an open element", name))
        })?;
        if frame.name != name {
            return Err(CodecError::Parse(format!(
                "expected </{}>, found </{}>",
                frame.name, name
            )));
        }

        let (name, value) = finish_frame(frame);
        match self.stack.last_mut() {
            Some(parent) => attach(&mut parent.body, name, value),
            None => self.root = Some((name, value)),
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.text.push_str(text);
                frame.has_text = true;
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(CodecError::Parse(
                "character data outside the root element".to_string(),
            )),
        }
    }

    fn doctype(&self) -> Result<()> {
        if self.stack.is_empty() && self.root.is_none() {
            Ok(())
        } else {
            Err(CodecError::Parse(
                "document type declaration after the root element".to_string(),
            ))
        }
    }

    fn require_bound(&self, prefix: &str, current: &Frame) -> Result<()> {
        if prefix == "xml" {
            return Ok(());
        }
        let bound = std::iter::once(current)
            .chain(self.stack.iter().rev())
            .flat_map(|frame| frame.declared.iter())
            .any(|(declared, _)| declared == prefix);
        if bound {
            Ok(())
        } else {
            Err(CodecError::Parse(format!(
                "namespace prefix `{}` is not declared",
                prefix
            )))
        }
    }

    fn finish(self) -> Result<Tree> {
        if let Some(open) = self.stack.last() {
            return Err(CodecError::Parse(format!(
                "element <{}> is never closed",
                open.name
            )));
        }
        match self.root {
            Some((name, value)) => Ok(Tree::with_root(name, value)),
            None => Err(CodecError::Parse("document has no root element".to_string())),
        }
    }
}

fn finish_frame(frame: Frame) -> (String, Value) {
    let mut body = frame.body;
    if frame.has_children {
        let trimmed = frame.text.trim();
        if !trimmed.is_empty() {
            // Text goes after the attributes, ahead of the children.
            let at = body.keys().take_while(|k| k.starts_with('@')).count();
            body.shift_insert(at, TEXT_KEY.to_string(), Value::String(trimmed.to_string()));
        }
    } else if frame.has_text {
        body.insert(TEXT_KEY.to_string(), Value::String(frame.text));
    }
    (frame.name, Value::Object(body))
}

/// Adds a child under its tag, folding repeated tags into a sequence.
fn attach(parent: &mut Map, name: String, child: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(child),
        Some(existing) => {
            let first = std::mem::replace(existing, Value::Null);
            *existing = Value::Array(vec![first, child]);
        }
        None => {
            parent.insert(name, child);
        }
    }
}

fn check_binding(prefix: &str, uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(CodecError::Parse(format!(
            "namespace prefix `{}` cannot be bound to an empty URI",
            prefix
        )));
    }
    if prefix == "xmlns" || (prefix == "xml" && uri != XML_NAMESPACE) {
        return Err(CodecError::Parse(format!(
            "reserved prefix `{}` cannot be rebound",
            prefix
        )));
    }
    Ok(())
}

/// Splits the prefix off a qualified name.
fn prefix_of(qname: &str) -> Result<Option<&str>> {
    match qname.split_once(':') {
        None => Ok(None),
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() && !local.contains(':') => {
            Ok(Some(prefix))
        }
        Some(_) => Err(CodecError::Parse(format!("invalid qualified name `{}`", qname))),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| CodecError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(xml: &str) -> String {
        xml_str_to_json(xml).unwrap().to_json_string().unwrap()
    }

    #[test]
    fn test_attribute_and_text() {
        assert_eq!(
            json(r#"<person name="Ann">42</person>"#),
            r#"{"person":{"@name":"Ann","$":"42"}}"#
        );
    }

    #[test]
    fn test_empty_element_has_no_text() {
        assert_eq!(json("<a></a>"), r#"{"a":{}}"#);
        assert_eq!(json("<a/>"), r#"{"a":{}}"#);
    }

    #[test]
    fn test_leaf_keeps_whitespace() {
        assert_eq!(json("<a> </a>"), r#"{"a":{"$":" "}}"#);
    }

    #[test]
    fn test_indentation_between_children_dropped() {
        let xml = "<a>\n  <b>1</b>\n  <c>2</c>\n</a>";
        assert_eq!(json(xml), r#"{"a":{"b":{"$":"1"},"c":{"$":"2"}}}"#);
    }

    #[test]
    fn test_mixed_text_precedes_children() {
        let xml = r#"<a x="1"><b/> hello </a>"#;
        assert_eq!(json(xml), r#"{"a":{"@x":"1","$":"hello","b":{}}}"#);
    }

    #[test]
    fn test_repeated_children_fold() {
        let xml = "<list><item>1</item><other/><item>2</item></list>";
        assert_eq!(
            json(xml),
            r#"{"list":{"item":[{"$":"1"},{"$":"2"}],"other":{}}}"#
        );
    }

    #[test]
    fn test_namespaces_come_first() {
        let xml = r#"<r id="7" xmlns="urn:d" xmlns:p="urn:p"><p:c/></r>"#;
        assert_eq!(
            json(xml),
            r#"{"r":{"@xmlns":{"$":"urn:d","p":"urn:p"},"@id":"7","p:c":{}}}"#
        );
    }

    #[test]
    fn test_entities_and_cdata() {
        assert_eq!(json("<a>&lt;&amp;&#65;</a>"), r#"{"a":{"$":"<&A"}}"#);
        assert_eq!(json("<a><![CDATA[<raw>]]></a>"), r#"{"a":{"$":"<raw>"}}"#);
    }

    #[test]
    fn test_prolog_and_comments_ignored() {
        let xml = "<?xml version='1.0'?>\n<!-- c --><a><!-- inner -->x</a>\n";
        assert_eq!(json(xml), r#"{"a":{"$":"x"}}"#);
    }

    #[test]
    fn test_mismatched_tags() {
        assert!(xml_str_to_json("<a><b></a>").unwrap_err().is_parse());
    }

    #[test]
    fn test_unclosed_element() {
        assert!(xml_str_to_json("<a><b/>").unwrap_err().is_parse());
    }

    #[test]
    fn test_multiple_roots() {
        assert!(xml_str_to_json("<a/><b/>").unwrap_err().is_parse());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(xml_str_to_json("<a/>tail").unwrap_err().is_parse());
        assert!(xml_str_to_json("just text").unwrap_err().is_parse());
        assert!(xml_str_to_json("").unwrap_err().is_parse());
    }

    #[test]
    fn test_duplicate_attribute() {
        assert!(xml_str_to_json(r#"<a x="1" x="2"/>"#).unwrap_err().is_parse());
    }

    #[test]
    fn test_undeclared_prefix() {
        assert!(xml_str_to_json("<p:a/>").unwrap_err().is_parse());
        assert!(xml_str_to_json(r#"<a p:x="1"/>"#).unwrap_err().is_parse());
        assert!(xml_str_to_json(r#"<a xmlns:p=""/>"#).unwrap_err().is_parse());
    }

    #[test]
    fn test_prefix_in_scope_from_ancestor() {
        let xml = r#"<a xmlns:p="urn:p"><b><p:c p:x="1"/></b></a>"#;
        assert!(xml_str_to_json(xml).is_ok());
        assert!(xml_str_to_json(r#"<a xml:lang="en"/>"#).is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(validate("<a><b/></a>").is_ok());
        assert!(validate("<a><b></a>").is_err());
    }
}
