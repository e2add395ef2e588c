//! # Cross-Module Tests for the Codec
//!
//! Exercises the reader, writer and canonicalizer together.
//!
//! ## Test Categories
//!
//! 1. **Round Trip**: XML → tree → XML keeps the document
//! 2. **Tree Input**: trees that did not come from XML
//! 3. **Canonical Equivalence**: c14n output as a document fingerprint
//! 4. **Encodings**: non-UTF-8 input and output

use crate::writer::build_document;
use crate::{json_to_xml, xml_str_to_json, xml_to_json, xml_to_json_with_charset, Method, Tree, XmlOptions};

// =============================================================================
// Helper Functions
// =============================================================================

fn compact() -> XmlOptions {
    XmlOptions::new().with_prettify(false)
}

fn canonical(tree: &Tree) -> String {
    let options = XmlOptions::new().with_method(Method::C14n);
    String::from_utf8(json_to_xml(tree, &options).unwrap()).unwrap()
}

fn reparse(tree: &Tree, options: &XmlOptions) -> Tree {
    let xml = json_to_xml(tree, options).unwrap();
    xml_to_json(xml).unwrap()
}

fn same_order(a: &Tree, b: &Tree) {
    assert_eq!(a.to_json_string().unwrap(), b.to_json_string().unwrap());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_compact() {
    let xml = r#"<order id="17" state="open"><line sku="A-1">2</line><line sku="B-2">1</line><note>leave at door</note></order>"#;
    let tree = xml_str_to_json(xml).unwrap();
    let out = json_to_xml(&tree, &compact()).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out, format!("<?xml version='1.0' encoding='utf-8'?>\n{}", xml));
}

#[test]
fn test_round_trip_pretty_keeps_tree() {
    let xml = "<catalog>\n  <book isbn=\"1\">\n    <title>Dune</title>\n    <tag>sf</tag>\n    <tag>classic</tag>\n  </book>\n  <book isbn=\"2\"/>\n</catalog>";
    let tree = xml_str_to_json(xml).unwrap();
    same_order(&tree, &reparse(&tree, &XmlOptions::default()));
}

#[test]
fn test_round_trip_mixed_content() {
    let tree = xml_str_to_json(r#"<p class="x">intro<b>bold</b></p>"#).unwrap();
    same_order(&tree, &reparse(&tree, &XmlOptions::default()));
    same_order(&tree, &reparse(&tree, &compact()));
}

#[test]
fn test_round_trip_namespaces() {
    let xml = r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:c p:x="1">t</p:c><c/></r>"#;
    let tree = xml_str_to_json(xml).unwrap();
    same_order(&tree, &reparse(&tree, &compact()));
}

#[test]
fn test_round_trip_whitespace_leaf() {
    let tree = xml_str_to_json("<a><b>  </b></a>").unwrap();
    same_order(&tree, &reparse(&tree, &XmlOptions::default()));
}

#[test]
fn test_round_trip_escaped_content() {
    let xml = r#"<a q="&quot;x&quot; &amp; &lt;y&gt;">1 &lt; 2 &amp;&amp; 3 &gt; 2</a>"#;
    let tree = xml_str_to_json(xml).unwrap();
    same_order(&tree, &reparse(&tree, &compact()));
}

#[test]
fn test_round_trip_whitespace_characters_in_attributes_and_text() {
    let xml = "<a v=\"x&#10;y&#9;z\">p&#13;q</a>";
    let tree = xml_str_to_json(xml).unwrap();
    assert_eq!(tree.to_json_string().unwrap(), r#"{"a":{"@v":"x\ny\tz","$":"p\rq"}}"#);

    let out = String::from_utf8(json_to_xml(&tree, &compact()).unwrap()).unwrap();
    assert!(out.ends_with(r#"<a v="x&#xA;y&#x9;z">p&#xD;q</a>"#), "{}", out);
    assert!(!out.contains('\r') && !out.contains('\t'), "{}", out);
    same_order(&tree, &reparse(&tree, &XmlOptions::default()));
}

// =============================================================================
// Tree Input Tests
// =============================================================================

#[test]
fn test_tree_from_json_is_accepted_as_is() {
    let tree = Tree::from_json_str(r#"{"person":{"@name":"Ann","$":"42"}}"#).unwrap();
    same_order(&tree, &reparse(&tree, &compact()));
}

#[test]
fn test_clark_keys_reparse_with_prefixes() {
    let tree = Tree::from_json_str(r#"{"{urn:a}r":{"{urn:a}c":{"$":"1"}}}"#).unwrap();
    let back = reparse(&tree, &compact());
    assert_eq!(
        back.to_json_string().unwrap(),
        r#"{"ns0:r":{"@xmlns":{"ns0":"urn:a"},"ns0:c":{"$":"1"}}}"#
    );
}

#[test]
fn test_synthesized_root_holds_every_key() {
    let tree = Tree::from_json_str(r#"{"a":{"$":"1"},"b":[{"$":"2"},{"$":"3"}]}"#).unwrap();
    let root = build_document(&tree, "doc").unwrap();
    assert_eq!(root.name, "doc");
    let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "b"]);
}

// =============================================================================
// Canonical Equivalence Tests
// =============================================================================

#[test]
fn test_canonical_form_ignores_formatting() {
    let spaced = xml_str_to_json("<a  y='2'   x=\"1\">\n  <b/>\n</a>").unwrap();
    let tight = xml_str_to_json(r#"<a x="1" y="2"><b></b></a>"#).unwrap();
    assert_eq!(canonical(&spaced), canonical(&tight));
    assert_eq!(canonical(&tight), r#"<a x="1" y="2"><b></b></a>"#);
}

#[test]
fn test_canonical_form_stable_across_round_trip() {
    let tree = xml_str_to_json(r#"<r xmlns:p="urn:p"><p:c p:x="1" a="2">t</p:c></r>"#).unwrap();
    let again = reparse(&tree, &XmlOptions::default());
    assert_eq!(canonical(&tree), canonical(&again));
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_prolog_declared_encoding_is_honoured() {
    let (body, _, _) = encoding_rs::KOI8_R.encode("<?xml version='1.0' encoding='koi8-r'?><a>привет</a>");
    let tree = xml_to_json(&body).unwrap();
    assert_eq!(tree.to_json_string().unwrap(), r#"{"a":{"$":"привет"}}"#);
}

#[test]
fn test_charset_round_trip() {
    let (body, _, _) = encoding_rs::WINDOWS_1251.encode("<org>ТОВ ТЕСТ</org>");
    let tree = xml_to_json_with_charset(&body, Some("windows-1251")).unwrap();

    let options = compact().with_encoding("windows-1251");
    let out = json_to_xml(&tree, &options).unwrap();
    let again = xml_to_json(&out).unwrap();
    same_order(&tree, &again);
}
