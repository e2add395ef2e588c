//! # Tree to XML
//!
//! Rebuilds an XML document from its tree. Conversion runs in two stages:
//! the tree is first turned into an element structure (where every shape
//! error is caught), then that structure is serialized with the requested
//! method and encoding.
//!
//! ## Root Selection
//!
//! A tree with exactly one top-level key names its root. Any other tree
//! (empty, several keys, a single key holding a sequence) is nested under a
//! synthesized root named by [`XmlOptions::default_root_name`].
//!
//! ## Namespaces
//!
//! `@xmlns` entries are written as declarations on their element, `$` being
//! the default namespace. Keys in Clark notation (`{uri}local`) are mapped to
//! an in-scope prefix for that URI; when none exists a prefix `ns0`, `ns1`, ...
//! is synthesized and declared on the element where it is first needed.

use crate::c14n;
use crate::decode::{encode, output_encoding};
use crate::error::{CodecError, Result};
use crate::options::{Method, XmlOptions};
use crate::tree::{Map, Tree, Value, TEXT_KEY, XMLNS_KEY};
use encoding_rs::UTF_8;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::writer::Writer;
use std::borrow::Cow;
use std::io::Write;

/// An element ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub name: String,
    /// Declarations on this element; the empty prefix is the default namespace.
    pub namespaces: Vec<(String, String)>,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    fn named(name: String) -> Self {
        Node {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_none() && self.children.is_empty()
    }
}

/// Converts a tree to encoded XML.
///
/// # Arguments
///
/// * `tree` - The document tree
/// * `options` - Root name, method, encoding and indentation
///
/// # Errors
///
/// - `CodecError::UnknownEncoding` if the output encoding is not recognised
/// - `CodecError::Conversion` if part of the tree cannot become an element
///
/// # Example
///
/// ```rust
/// use xdb_codec::{json_to_xml, Tree, XmlOptions};
///
/// let tree: Tree = r#"{"person": {"@name": "Ann", "$": "42"}}"#.parse().unwrap();
/// let xml = json_to_xml(&tree, &XmlOptions::default()).unwrap();
/// assert_eq!(
///     String::from_utf8(xml).unwrap(),
///     "<?xml version='1.0' encoding='utf-8'?>\n<person name=\"Ann\">42</person>"
/// );
/// ```
pub fn json_to_xml(tree: &Tree, options: &XmlOptions) -> Result<Vec<u8>> {
    let (encoding, label) = match options.method {
        Method::C14n => (UTF_8, String::new()),
        _ => output_encoding(&options.encoding)?,
    };

    let root = build_document(tree, &options.default_root_name)?;

    let text = match options.method {
        Method::Xml | Method::Html => write_markup(&root, options.method, options.prettify, &label)?,
        Method::Text => {
            let mut out = String::new();
            collect_text(&root, &mut out);
            out
        }
        Method::C14n => c14n::canonicalize(&root),
    };

    Ok(encode(&text, encoding))
}

/// Converts JSON text to encoded XML.
///
/// The text is decoded as an order-preserving tree first.
///
/// # Errors
///
/// Returns `CodecError::Json` if the text is not a JSON object, otherwise
/// the same errors as [`json_to_xml`].
pub fn json_str_to_xml(json: &str, options: &XmlOptions) -> Result<Vec<u8>> {
    let tree = Tree::from_json_str(json)?;
    json_to_xml(&tree, options)
}

/// Builds the element structure for a tree.
pub(crate) fn build_document(tree: &Tree, default_root: &str) -> Result<Node> {
    let mut builder = NodeBuilder::default();
    match tree.root() {
        Some((name, value)) if !matches!(value, Value::Array(_)) => {
            builder.element(name, value, &[])
        }
        _ => builder.element_from_map(default_root, tree.as_map(), &[]),
    }
}

#[derive(Default)]
struct NodeBuilder {
    synthesized: usize,
}

impl NodeBuilder {
    fn element(&mut self, key: &str, value: &Value, scope: &[(String, String)]) -> Result<Node> {
        match value {
            Value::Object(map) => self.element_from_map(key, map, scope),
            Value::Array(_) => Err(CodecError::Conversion(format!(
                "<{}> holds a sequence inside a sequence",
                key
            ))),
            scalar => {
                let mut namespaces = Vec::new();
                let mut in_scope = scope.to_vec();
                let name = self.resolve_name(key, true, &mut namespaces, &mut in_scope)?;
                let mut node = Node::named(name);
                node.namespaces = namespaces;
                node.text = scalar.scalar_text();
                Ok(node)
            }
        }
    }

    fn element_from_map(
        &mut self,
        key: &str,
        map: &Map,
        scope: &[(String, String)],
    ) -> Result<Node> {
        let mut namespaces = match map.get(XMLNS_KEY) {
            Some(decls) => namespace_declarations(key, decls)?,
            None => Vec::new(),
        };
        let mut in_scope = scope.to_vec();
        in_scope.extend(namespaces.iter().cloned());

        let name = self.resolve_name(key, true, &mut namespaces, &mut in_scope)?;
        let mut node = Node::named(name);

        for (k, v) in map {
            if k == XMLNS_KEY {
                continue;
            }
            if let Some(attr) = k.strip_prefix('@') {
                let value = v.scalar_text().ok_or_else(|| {
                    CodecError::Conversion(format!(
                        "attribute `{}` of <{}> must be a scalar, found {}",
                        attr,
                        key,
                        v.kind()
                    ))
                })?;
                let attr_name = self.resolve_name(attr, false, &mut namespaces, &mut in_scope)?;
                node.attributes.push((attr_name, value));
            } else if k == TEXT_KEY {
                if let Value::Array(_) | Value::Object(_) = v {
                    return Err(CodecError::Conversion(format!(
                        "text of <{}> must be a scalar, found {}",
                        key,
                        v.kind()
                    )));
                }
                node.text = v.scalar_text();
            } else if let Value::Array(items) = v {
                for item in items {
                    node.children.push(self.element(k, item, &in_scope)?);
                }
            } else {
                node.children.push(self.element(k, v, &in_scope)?);
            }
        }

        node.namespaces = namespaces;
        Ok(node)
    }

    /// Turns a tree key into a qualified name valid in `in_scope`.
    fn resolve_name(
        &mut self,
        key: &str,
        is_element: bool,
        declarations: &mut Vec<(String, String)>,
        in_scope: &mut Vec<(String, String)>,
    ) -> Result<String> {
        if let Some(rest) = key.strip_prefix('{') {
            let (uri, local) = rest.split_once('}').ok_or_else(|| {
                CodecError::Conversion(format!("malformed namespaced name `{}`", key))
            })?;
            check_ncname(local, key)?;

            if uri.is_empty() {
                return Ok(local.to_string());
            }
            if is_element && lookup(in_scope, "") == Some(uri) {
                return Ok(local.to_string());
            }
            if let Some(prefix) = prefix_for(in_scope, uri) {
                return Ok(format!("{}:{}", prefix, local));
            }

            let prefix = format!("ns{}", self.synthesized);
            self.synthesized += 1;
            declarations.push((prefix.clone(), uri.to_string()));
            in_scope.push((prefix.clone(), uri.to_string()));
            return Ok(format!("{}:{}", prefix, local));
        }

        match key.split_once(':') {
            Some((prefix, local)) => {
                check_ncname(prefix, key)?;
                check_ncname(local, key)?;
                if prefix != "xml" && lookup(in_scope, prefix).is_none() {
                    return Err(CodecError::Conversion(format!(
                        "namespace prefix `{}` of `{}` is not declared",
                        prefix, key
                    )));
                }
            }
            None => check_ncname(key, key)?,
        }
        Ok(key.to_string())
    }
}

fn namespace_declarations(element: &str, value: &Value) -> Result<Vec<(String, String)>> {
    let map = value.as_object().ok_or_else(|| {
        CodecError::Conversion(format!(
            "`@xmlns` of <{}> must be an object, found {}",
            element,
            value.kind()
        ))
    })?;

    let mut declarations = Vec::with_capacity(map.len());
    for (prefix, uri) in map {
        let uri = uri.scalar_text().ok_or_else(|| {
            CodecError::Conversion(format!(
                "namespace `{}` of <{}> must be a string",
                prefix, element
            ))
        })?;
        if prefix == TEXT_KEY {
            declarations.push((String::new(), uri));
            continue;
        }
        check_ncname(prefix, prefix)?;
        if prefix == "xmlns" || uri.is_empty() {
            return Err(CodecError::Conversion(format!(
                "invalid namespace declaration `{}` on <{}>",
                prefix, element
            )));
        }
        declarations.push((prefix.clone(), uri));
    }
    Ok(declarations)
}

/// Most recent binding of `prefix`.
pub(crate) fn lookup<'a>(scope: &'a [(String, String)], prefix: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// A non-empty prefix currently bound to `uri` and not shadowed.
fn prefix_for<'a>(scope: &'a [(String, String)], uri: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .filter(|(p, u)| !p.is_empty() && u == uri)
        .map(|(p, _)| p.as_str())
        .find(|p| lookup(scope, p) == Some(uri))
}

fn check_ncname(name: &str, context: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => chars.all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
        }),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CodecError::Conversion(format!(
            "`{}` is not a valid XML name",
            context
        )))
    }
}

/// HTML elements written without an end tag.
const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn write_markup(root: &Node, method: Method, prettify: bool, label: &str) -> Result<String> {
    let declaration = format!("<?xml version='1.0' encoding='{}'?>\n", label).into_bytes();
    let mut writer = Writer::new(declaration);

    write_node(&mut writer, root, method, prettify.then_some(0))?;

    String::from_utf8(writer.into_inner()).map_err(|e| CodecError::Conversion(e.to_string()))
}

/// Writes one element. `depth` is `None` when not indenting.
fn write_node<W: Write>(
    writer: &mut Writer<W>,
    node: &Node,
    method: Method,
    depth: Option<usize>,
) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (prefix, uri) in &node.namespaces {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        start.push_attribute(escaped_attribute(&key, uri));
    }
    for (key, value) in &node.attributes {
        start.push_attribute(escaped_attribute(key, value));
    }

    if node.is_empty() {
        match method {
            Method::Html if is_void(&node.name) => return emit(writer, Event::Start(start)),
            Method::Html => {}
            _ => return emit(writer, Event::Empty(start)),
        }
    }

    emit(writer, Event::Start(start))?;
    if let Some(text) = &node.text {
        let mut escaped = String::with_capacity(text.len());
        c14n::escape_text(text, &mut escaped);
        emit(writer, Event::Text(BytesText::from_escaped(escaped)))?;
    }
    let inner = depth.map(|d| d + 1);
    for (i, child) in node.children.iter().enumerate() {
        // text directly before the first child stays on its line
        if i > 0 || node.text.is_none() {
            line_break(writer, inner)?;
        }
        write_node(writer, child, method, inner)?;
    }
    if !node.children.is_empty() {
        line_break(writer, depth)?;
    }
    emit(writer, Event::End(BytesEnd::new(node.name.as_str())))
}

/// An attribute whose value survives attribute-value normalization.
fn escaped_attribute<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    let mut escaped = String::with_capacity(value.len());
    c14n::escape_attribute(value, &mut escaped);
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    }
}

fn is_void(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    HTML_VOID_ELEMENTS.contains(&name.as_str())
}

fn line_break<W: Write>(writer: &mut Writer<W>, depth: Option<usize>) -> Result<()> {
    match depth {
        Some(depth) => emit(
            writer,
            Event::Text(BytesText::from_escaped(format!("\n{}", "  ".repeat(depth)))),
        ),
        None => Ok(()),
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| CodecError::Conversion(e.to_string()))
}

fn collect_text(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
    }
    for child in &node.children {
        collect_text(child, out);
    }
}
