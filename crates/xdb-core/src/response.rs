//! Response envelopes returned to callers.

use serde::{Deserialize, Serialize};

/// Message for an upload with an empty body.
pub const NO_XML_DATA: &str = "No XML data received.";

/// Message for an upload that is not well-formed XML.
pub const DOCUMENT_CORRUPTED: &str = "Document data corrupted. Unable to parse.";

/// JSON result of a write: `{"result": 1, "doc_id": n}` or
/// `{"result": 0, "error": "..."}`.
///
/// # Example
///
/// ```rust
/// use xdb_core::ApiResult;
///
/// let json = serde_json::to_string(&ApiResult::success(1)).unwrap();
/// assert_eq!(json, r#"{"result":1,"doc_id":1}"#);
///
/// let json = serde_json::to_string(&ApiResult::failure()).unwrap();
/// assert_eq!(json, r#"{"result":0}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult {
    pub result: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResult {
    pub fn success(doc_id: u64) -> Self {
        Self {
            result: 1,
            doc_id: Some(doc_id),
            error: None,
        }
    }

    /// A failure without detail, used when the caller may not learn why.
    pub fn failure() -> Self {
        Self {
            result: 0,
            doc_id: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: 0,
            doc_id: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == 1
    }
}

/// An XML document ready to be sent to a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// Label of the encoding `body` is written in.
    pub encoding: String,
    pub body: Vec<u8>,
}

impl XmlDocument {
    /// Value for a `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("text/xml; charset={}", self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_string(&ApiResult::error(NO_XML_DATA)).unwrap();
        assert_eq!(json, r#"{"result":0,"error":"No XML data received."}"#);
    }

    #[test]
    fn test_envelope_parses_back() {
        let parsed: ApiResult = serde_json::from_str(r#"{"result":1,"doc_id":7}"#).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.doc_id, Some(7));
    }

    #[test]
    fn test_content_type() {
        let doc = XmlDocument {
            encoding: "windows-1251".to_string(),
            body: Vec::new(),
        };
        assert_eq!(doc.content_type(), "text/xml; charset=windows-1251");
    }
}
