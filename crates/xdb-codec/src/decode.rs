//! Character encoding detection and transcoding.
//!
//! Documents arrive as raw bytes. The encoding is taken, in order of
//! precedence, from a byte-order mark, from the caller's declared charset,
//! from the `encoding` pseudo-attribute of the XML declaration, and finally
//! defaults to UTF-8.

use crate::error::{CodecError, Result};
use encoding_rs::{Encoding, UTF_8};

/// Resolves an encoding label such as `utf-8` or `windows-1251`.
///
/// # Errors
///
/// Returns `CodecError::UnknownEncoding` for labels outside the WHATWG
/// encoding registry.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CodecError::UnknownEncoding(label.to_string()))
}

/// Canonical lowercase label for an encoding, e.g. `utf-8`.
pub fn encoding_label(encoding: &'static Encoding) -> String {
    encoding.name().to_ascii_lowercase()
}

/// Determines the encoding of an XML byte stream.
///
/// # Example
///
/// ```rust
/// use xdb_codec::decode::{detect_encoding, encoding_label};
///
/// let xml = b"<?xml version='1.0' encoding='windows-1251'?><a/>";
/// let encoding = detect_encoding(xml, None).unwrap();
/// assert_eq!(encoding_label(encoding), "windows-1251");
///
/// let plain = detect_encoding(b"<a/>", None).unwrap();
/// assert_eq!(encoding_label(plain), "utf-8");
/// ```
pub fn detect_encoding(bytes: &[u8], declared: Option<&str>) -> Result<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Ok(encoding);
    }
    if let Some(label) = declared.filter(|l| !l.trim().is_empty()) {
        return resolve_encoding(label);
    }
    match prolog_encoding(bytes) {
        Some(label) => resolve_encoding(&label),
        None => Ok(UTF_8),
    }
}

/// Returns true if the bytes name their own encoding through a byte-order
/// mark or an `encoding` pseudo-attribute.
pub fn is_self_describing(bytes: &[u8]) -> bool {
    Encoding::for_bom(bytes).is_some() || prolog_encoding(bytes).is_some()
}

/// Decodes XML bytes into text, returning the encoding that was used.
///
/// A byte-order mark is stripped. Malformed byte sequences are an error,
/// never silently replaced.
pub fn decode_xml(bytes: &[u8], declared: Option<&str>) -> Result<(String, &'static Encoding)> {
    let encoding = detect_encoding(bytes, declared)?;
    let body = match Encoding::for_bom(bytes) {
        Some((_, bom_len)) => &bytes[bom_len..],
        None => bytes,
    };

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            CodecError::Parse(format!("input is not valid {}", encoding.name()))
        })?;

    Ok((text.into_owned(), encoding))
}

/// Picks the encoding used to write output for a requested label.
///
/// Returns the encoding plus the label to put in the XML declaration. Labels
/// that cannot be produced as output (UTF-16 variants) fall back to UTF-8 and
/// the declaration says so.
pub fn output_encoding(label: &str) -> Result<(&'static Encoding, String)> {
    let requested = resolve_encoding(label)?;
    let output = requested.output_encoding();
    let declared = if output == requested {
        label.trim().to_string()
    } else {
        encoding_label(output)
    };
    Ok((output, declared))
}

/// Encodes text, writing unmappable characters as numeric character references.
pub(crate) fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

/// Reads `encoding="..."` from an ASCII-compatible XML declaration.
fn prolog_encoding(bytes: &[u8]) -> Option<String> {
    let rest = bytes.strip_prefix(b"<?xml")?;
    let end = rest.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&rest[..end]).ok()?;

    let at = decl.find("encoding")?;
    let after = decl[at + "encoding".len()..].trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    let close = value.find(quote)?;

    Some(value[..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prolog_encoding() {
        assert_eq!(
            prolog_encoding(br#"<?xml version="1.0" encoding="KOI8-R"?><a/>"#).as_deref(),
            Some("KOI8-R")
        );
        assert_eq!(
            prolog_encoding(b"<?xml version='1.0' encoding = 'utf-8' ?><a/>").as_deref(),
            Some("utf-8")
        );
        assert_eq!(prolog_encoding(b"<?xml version='1.0'?><a/>"), None);
        assert_eq!(prolog_encoding(b"<a/>"), None);
    }

    #[test]
    fn test_precedence() {
        let bom = b"\xEF\xBB\xBF<?xml version='1.0' encoding='windows-1251'?><a/>";
        assert_eq!(detect_encoding(bom, Some("koi8-r")).unwrap(), UTF_8);

        let declared = b"<?xml version='1.0' encoding='windows-1251'?><a/>";
        let enc = detect_encoding(declared, Some("koi8-r")).unwrap();
        assert_eq!(encoding_label(enc), "koi8-r");

        let enc = detect_encoding(declared, None).unwrap();
        assert_eq!(encoding_label(enc), "windows-1251");
    }

    #[test]
    fn test_self_describing() {
        assert!(is_self_describing(b"\xEF\xBB\xBF<a/>"));
        assert!(is_self_describing(b"<?xml version='1.0' encoding='koi8-r'?><a/>"));
        assert!(!is_self_describing(b"<?xml version='1.0'?><a/>"));
        assert!(!is_self_describing(b"<a/>"));
    }

    #[test]
    fn test_unknown_label() {
        let err = detect_encoding(b"<a/>", Some("no-such-charset")).unwrap_err();
        assert!(matches!(err, CodecError::UnknownEncoding(_)));
    }

    #[test]
    fn test_decode_cyrillic() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("<a>ТОВ ТЕСТ</a>");
        let (text, enc) = decode_xml(&bytes, Some("windows-1251")).unwrap();
        assert_eq!(text, "<a>ТОВ ТЕСТ</a>");
        assert_eq!(encoding_label(enc), "windows-1251");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_xml(b"<a>\xFF\xFE\xFD</a>", None).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_bom_is_stripped() {
        let (text, _) = decode_xml(b"\xEF\xBB\xBF<a/>", None).unwrap();
        assert_eq!(text, "<a/>");
    }

    #[test]
    fn test_output_encoding_fallback() {
        let (enc, label) = output_encoding("utf-16").unwrap();
        assert_eq!(enc, UTF_8);
        assert_eq!(label, "utf-8");

        let (_, label) = output_encoding("UTF-8").unwrap();
        assert_eq!(label, "UTF-8");
    }
}
