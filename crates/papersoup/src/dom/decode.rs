// ABOUTME: Decodes raw document bytes into text before parsing.
// ABOUTME: Honours BOMs, caller charset hints and in-document declarations, then falls back to chardetng.

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

// How far into the document to look for an encoding declaration
const SNIFF_LIMIT: usize = 1024;

static XML_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\?xml[^>]*\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});
static META_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9._:-]+)"#).unwrap());

/// Decodes markup bytes into a String.
///
/// Resolution order: byte-order mark, `charset_hint` (a bare label or a
/// Content-Type value), an XML declaration or `<meta charset>` in the first
/// kilobyte, and finally chardetng detection.
pub fn decode_markup(bytes: &[u8], charset_hint: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let (decoded, _, _) = encoding.decode(bytes);
        return decoded.into_owned();
    }

    let declared = charset_hint
        .map(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_declared(bytes));
    if let Some(encoding) = declared {
        let (decoded, _, _) = encoding.decode(bytes);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

fn sniff_declared(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(SNIFF_LIMIT)];
    XML_DECL_RE
        .captures(head)
        .or_else(|| META_CHARSET_RE.captures(head))
        .and_then(|caps| caps.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()))
}

/// Accepts either a bare label ("utf-8") or a Content-Type value
/// ("text/html; charset=utf-8").
fn extract_charset(hint: &str) -> String {
    let lower = hint.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            return charset.trim_matches('"').trim_matches('\'').to_string();
        }
    }
    lower.trim().to_string()
}
