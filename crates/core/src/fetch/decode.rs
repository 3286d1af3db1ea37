use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;
use tracing::debug;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>;]+)"#).unwrap());

/// Bytes of the body searched for a `<meta>` charset declaration.
const META_SNIFF_LEN: usize = 4096;

/// Picks the body encoding: rule preference, then the `Content-Type`
/// charset, then a `<meta>` declaration, then statistical detection.
pub fn detect_encoding(body: &[u8], content_type: Option<&str>, preferred: Option<&str>) -> &'static Encoding {
    if let Some(encoding) = preferred.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        return encoding;
    }

    if let Some(encoding) = content_type
        .and_then(|ct| CHARSET_REGEX.captures(ct))
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
    {
        return encoding;
    }

    let head = &body[..body.len().min(META_SNIFF_LEN)];
    let head_text = String::from_utf8_lossy(head);
    if let Some(encoding) = META_CHARSET_REGEX
        .captures(&head_text)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
    {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, head.len() == body.len());
    detector.guess(None, true)
}

/// Decodes the body into UTF-8, replacing malformed sequences.
pub fn decode_body(body: &[u8], content_type: Option<&str>, preferred: Option<&str>) -> (String, &'static str) {
    let encoding = detect_encoding(body, content_type, preferred);
    let (decoded, used, had_errors) = encoding.decode(body);
    if had_errors {
        debug!(encoding = used.name(), "body contained malformed sequences");
    }
    (decoded.into_owned(), used.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_charset() {
        let (text, label) = decode_body("Hello, 世界!".as_bytes(), Some("text/html; charset=utf-8"), None);
        assert_eq!(text, "Hello, 世界!");
        assert_eq!(label, "UTF-8");
    }

    #[test]
    fn test_meta_charset() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"></head><body>caf\xe9</body></html>";
        let (text, label) = decode_body(body, Some("text/html"), None);
        assert_eq!(label, "windows-1252");
        assert!(text.contains("café"));
    }

    #[test]
    fn test_preferred_encoding_wins() {
        let (gbk, _, _) = encoding_rs::GBK.encode("中文内容");
        let (text, label) = decode_body(&gbk, Some("text/html; charset=utf-8"), Some("gbk"));
        assert_eq!(label, "GBK");
        assert_eq!(text, "中文内容");
    }

    #[test]
    fn test_no_hints_still_decodes_ascii() {
        let (text, _) = decode_body(b"<p>plain ascii</p>", None, None);
        assert_eq!(text, "<p>plain ascii</p>");
    }
}
