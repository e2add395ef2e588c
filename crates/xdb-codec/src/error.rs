//! Error types for the XDB codec.

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while converting between XML and the JSON tree.
///
/// `Parse` covers every way an input document can be malformed: broken
/// markup, undecodable bytes, namespace violations. `Conversion` is the
/// reverse direction: a tree whose shape cannot be turned into elements.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The XML input is not well-formed or not namespace-well-formed.
    #[error("malformed XML: {0}")]
    Parse(String),

    /// The tree cannot be expressed as an XML element.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The requested output method is not one of `xml`, `html`, `text`, `c14n`.
    #[error("invalid output method `{0}`: expected one of xml, html, text, c14n")]
    InvalidMethod(String),

    /// The character encoding label is not recognised.
    #[error("unknown character encoding `{0}`")]
    UnknownEncoding(String),

    /// A JSON payload could not be decoded into a tree.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Returns true for errors caused by malformed input data.
    ///
    /// Callers use this to distinguish "document corrupted" from
    /// configuration mistakes such as an unknown method.
    pub fn is_parse(&self) -> bool {
        matches!(self, CodecError::Parse(_) | CodecError::Json(_))
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(err: quick_xml::Error) -> Self {
        CodecError::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CodecError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CodecError::Parse(err.to_string())
    }
}
