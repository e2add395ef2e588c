//! Integration tests for the public codec API.

use xdb_codec::{
    json_str_to_xml, json_to_xml, validate, xml_to_json, CodecError, Method, Tree, XmlOptions,
};

fn xml_string(tree: &Tree, options: &XmlOptions) -> String {
    String::from_utf8(json_to_xml(tree, options).unwrap()).unwrap()
}

#[test]
fn test_person_document_both_ways() {
    let tree = xml_to_json(r#"<person name="Ann">42</person>"#).unwrap();
    assert_eq!(
        tree.to_json_string().unwrap(),
        r#"{"person":{"@name":"Ann","$":"42"}}"#
    );
    assert_eq!(
        xml_string(&tree, &XmlOptions::default()),
        "<?xml version='1.0' encoding='utf-8'?>\n<person name=\"Ann\">42</person>"
    );
}

#[test]
fn test_key_order_drives_emission_order() {
    let tree: Tree = r#"{"r":{"@b":"1","@a":"2","z":{},"y":{}}}"#.parse().unwrap();
    let xml = xml_string(&tree, &XmlOptions::new().with_prettify(false));
    assert!(xml.ends_with(r#"<r b="1" a="2"><z/><y/></r>"#), "{}", xml);
}

#[test]
fn test_round_trip_is_whitespace_insensitive() {
    let original = "<inventory>\n\t<item code=\"x1\">\n\t\t<qty>4</qty>\n\t</item>\n\t<item code=\"x2\"><qty>0</qty></item>\n</inventory>\n";
    let tree = xml_to_json(original).unwrap();

    for prettify in [true, false] {
        let options = XmlOptions::new().with_prettify(prettify);
        let again = xml_to_json(json_to_xml(&tree, &options).unwrap()).unwrap();
        assert_eq!(
            tree.to_json_string().unwrap(),
            again.to_json_string().unwrap()
        );
    }
}

#[test]
fn test_already_a_tree_is_idempotent() {
    let tree = xml_to_json("<a><b x='1'>t</b><b/></a>").unwrap();
    let json = tree.to_json_string().unwrap();
    let reparsed: Tree = json.parse().unwrap();
    assert_eq!(reparsed.to_json_string().unwrap(), json);
}

#[test]
fn test_malformed_documents_rejected() {
    for xml in ["<a><b></a>", "<a>", "<a/><b/>", "<a>&bogus;</a>"] {
        let err = xml_to_json(xml).unwrap_err();
        assert!(err.is_parse(), "{}: {}", xml, err);
        assert!(validate(xml).is_err());
    }
    assert!(validate("<ok/>").is_ok());
}

#[test]
fn test_invalid_method_rejected() {
    let err = "pdf".parse::<Method>().unwrap_err();
    assert!(matches!(err, CodecError::InvalidMethod(_)));
    assert!(!err.is_parse());
}

#[test]
fn test_malformed_json_rejected() {
    let err = json_str_to_xml("{not json", &XmlOptions::default()).unwrap_err();
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn test_text_method_has_no_markup() {
    let tree = xml_to_json("<a>one<b>two</b></a>").unwrap();
    let text = xml_string(&tree, &XmlOptions::new().with_method(Method::Text));
    assert_eq!(text, "onetwo");
}
