//! # Canonical XML
//!
//! Serializes an element structure as Canonical XML 1.0 (W3C, without
//! comments). The canonical form of a document is byte-for-byte stable, so two
//! trees describing the same XML produce identical output.
//!
//! ## Rules Applied
//!
//! | Construct              | Canonical form                                   |
//! |------------------------|--------------------------------------------------|
//! | XML declaration        | omitted                                          |
//! | Encoding               | UTF-8                                            |
//! | Empty element          | `<a></a>`                                        |
//! | Namespace declarations | default first, then by prefix; redundant dropped |
//! | Attributes             | by namespace URI, then local name                |
//! | Attribute values       | `"` delimited; `& < " TAB LF CR` escaped         |
//! | Text                   | `& < > CR` escaped                               |
//!
//! ## References
//!
//! - [Canonical XML Version 1.0](https://www.w3.org/TR/xml-c14n)

use crate::reader::XML_NAMESPACE;
use crate::writer::{lookup, Node};

/// Writes `root` in canonical form.
pub(crate) fn canonicalize(root: &Node) -> String {
    let mut out = String::new();
    write_element(root, &[], &mut out);
    out
}

/// `rendered` holds the namespace bindings already output by ancestors.
fn write_element(node: &Node, rendered: &[(String, String)], out: &mut String) {
    let mut scope = rendered.to_vec();

    let mut declarations: Vec<&(String, String)> = node
        .namespaces
        .iter()
        .filter(|(prefix, uri)| lookup(rendered, prefix).unwrap_or("") != uri.as_str())
        .collect();
    declarations.sort_by(|a, b| a.0.cmp(&b.0));
    declarations.dedup_by(|a, b| a.0 == b.0);
    scope.extend(declarations.iter().copied().cloned());

    let mut attributes: Vec<(&str, &str, &str, &str)> = node
        .attributes
        .iter()
        .map(|(name, value)| {
            let (uri, local) = match name.split_once(':') {
                Some(("xml", local)) => (XML_NAMESPACE, local),
                Some((prefix, local)) => (lookup(&scope, prefix).unwrap_or(""), local),
                None => ("", name.as_str()),
            };
            (uri, local, name.as_str(), value.as_str())
        })
        .collect();
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push('<');
    out.push_str(&node.name);
    for (prefix, uri) in declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    for (_, _, name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    if let Some(text) = &node.text {
        escape_text(text, out);
    }
    for child in &node.children {
        write_element(child, &scope, out);
    }

    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}
