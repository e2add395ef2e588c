//! Output options for tree-to-XML conversion.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialization method for [`json_to_xml`](crate::json_to_xml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// XML with a declaration.
    #[default]
    Xml,
    /// Like `Xml`, but empty elements are written as start/end pairs.
    Html,
    /// Character data only, no markup.
    Text,
    /// Canonical XML 1.0 (W3C), no declaration, always UTF-8.
    C14n,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Xml => "xml",
            Method::Html => "html",
            Method::Text => "text",
            Method::C14n => "c14n",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(Method::Xml),
            "html" => Ok(Method::Html),
            "text" => Ok(Method::Text),
            "c14n" => Ok(Method::C14n),
            _ => Err(CodecError::InvalidMethod(s.to_string())),
        }
    }
}

/// Options for [`json_to_xml`](crate::json_to_xml).
///
/// # Example
///
/// ```rust
/// use xdb_codec::{Method, XmlOptions};
///
/// let options = XmlOptions::new()
///     .with_method(Method::C14n)
///     .with_prettify(false);
/// assert_eq!(options.default_root_name, "root");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlOptions {
    /// Name of the root synthesized for trees without a single root key.
    pub default_root_name: String,

    /// Serialization method.
    pub method: Method,

    /// Output character encoding label (ignored by `c14n`).
    pub encoding: String,

    /// Indent nested elements.
    pub prettify: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            default_root_name: "root".to_string(),
            method: Method::Xml,
            encoding: "utf-8".to_string(),
            prettify: true,
        }
    }
}

impl XmlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_root_name(mut self, name: impl Into<String>) -> Self {
        self.default_root_name = name.into();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_prettify(mut self, prettify: bool) -> Self {
        self.prettify = prettify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("xml".parse::<Method>().unwrap(), Method::Xml);
        assert_eq!("HTML".parse::<Method>().unwrap(), Method::Html);
        assert_eq!("text".parse::<Method>().unwrap(), Method::Text);
        assert_eq!("c14n".parse::<Method>().unwrap(), Method::C14n);
    }

    #[test]
    fn test_invalid_method() {
        let err = "json".parse::<Method>().unwrap_err();
        assert!(matches!(err, CodecError::InvalidMethod(ref m) if m == "json"));
    }

    #[test]
    fn test_default_options() {
        let options = XmlOptions::default();
        assert_eq!(options.method, Method::Xml);
        assert_eq!(options.encoding, "utf-8");
        assert!(options.prettify);
    }
}
