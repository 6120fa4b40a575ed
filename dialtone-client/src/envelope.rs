//! Feed-response envelope splitting.
//!
//! Feed and search responses arrive as a minimal two-child XML document: the
//! first child's text is a JSON status blob, the second child's text is the
//! HTML fragment with the human-facing conversation markup. That shape is an
//! invariant of the wire format — anything else means the service changed
//! format, and is a hard error rather than something to paper over.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::Value;

use crate::errors::BackendError;

/// Split an envelope into its decoded JSON tree and raw HTML fragment.
pub fn split(envelope: &[u8]) -> Result<(Value, String), BackendError> {
    let text = std::str::from_utf8(envelope)
        .map_err(|e| BackendError::Envelope(format!("not UTF-8: {e}")))?;

    let mut reader = Reader::from_str(text);
    let mut children: Vec<String> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 1 {
                    children.push(String::new());
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 1 {
                    children.push(String::new());
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) => {
                if depth >= 2 {
                    let chunk = t
                        .unescape()
                        .map_err(|e| BackendError::Envelope(format!("bad text node: {e}")))?;
                    if let Some(child) = children.last_mut() {
                        child.push_str(&chunk);
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if depth >= 2 {
                    let bytes = c.into_inner();
                    let chunk = std::str::from_utf8(&bytes)
                        .map_err(|e| BackendError::Envelope(format!("bad CDATA: {e}")))?;
                    if let Some(child) = children.last_mut() {
                        child.push_str(chunk);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(BackendError::Envelope(format!("bad XML: {e}"))),
        }
    }

    if children.len() != 2 {
        return Err(BackendError::Envelope(format!(
            "expected 2 children (json, html), found {}",
            children.len()
        )));
    }

    let html = children.pop().unwrap_or_default();
    let json_text = children.pop().unwrap_or_default();
    let json = parse_json_lenient(&json_text)?;
    Ok((json, html))
}

// ─── Lenient JSON ─────────────────────────────────────────────────────────────

/// Decode the status blob: strict first, then once more after stripping the
/// legacy quirks (`//` line comments, Python-cased `True`/`False` bare
/// literals). The cleaned text still goes through the strict decoder — this
/// is literal substitution, never evaluation.
pub(crate) fn parse_json_lenient(text: &str) -> Result<Value, BackendError> {
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(strict_err) => {
            let cleaned = clean_legacy_quirks(text);
            serde_json::from_str(&cleaned)
                .map_err(|_| BackendError::Envelope(format!("unparsable status JSON: {strict_err}")))
        }
    }
}

/// Drop `//`-to-end-of-line comments and lower-case bare `True`/`False`,
/// both only outside string literals.
fn clean_legacy_quirks(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let mut in_string = false;

    while i < bytes.len() {
        let c = bytes[i];
        if in_string {
            out.push(c);
            if c == b'\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            if c == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            b'"' => {
                in_string = true;
                out.push(b'"');
                i += 1;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ if bytes[i..].starts_with(b"True") && !word_char(bytes.get(i + 4)) => {
                out.extend_from_slice(b"true");
                i += 4;
            }
            _ if bytes[i..].starts_with(b"False") && !word_char(bytes.get(i + 5)) => {
                out.extend_from_slice(b"false");
                i += 5;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    // Only whole ASCII sequences were removed or substituted, so the result
    // is still valid UTF-8.
    String::from_utf8_lossy(&out).into_owned()
}

fn word_char(b: Option<&u8>) -> bool {
    matches!(b, Some(c) if c.is_ascii_alphanumeric() || *c == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str, html: &str) -> String {
        format!("<response><json><![CDATA[{json}]]></json><html><![CDATA[{html}]]></html></response>")
    }

    #[test]
    fn splits_two_children() {
        let env = envelope(r#"{"messages":{}}"#, "<div>hi</div>");
        let (json, html) = split(env.as_bytes()).unwrap();
        assert_eq!(json["messages"], serde_json::json!({}));
        assert_eq!(html, "<div>hi</div>");
    }

    #[test]
    fn text_nodes_work_too() {
        let env = r#"<response><json>{"a": 1}</json><html>plain</html></response>"#;
        let (json, html) = split(env.as_bytes()).unwrap();
        assert_eq!(json["a"], 1);
        assert_eq!(html, "plain");
    }

    #[test]
    fn one_child_is_a_hard_error() {
        let env = r#"<response><json>{}</json></response>"#;
        let err = split(env.as_bytes()).unwrap_err();
        assert!(matches!(err, BackendError::Envelope(_)), "got {err:?}");
    }

    #[test]
    fn three_children_is_a_hard_error() {
        let env = r#"<response><json>{}</json><html>x</html><extra>y</extra></response>"#;
        assert!(matches!(split(env.as_bytes()), Err(BackendError::Envelope(_))));
    }

    #[test]
    fn lenient_strips_line_comments() {
        let v = parse_json_lenient("{\"a\": 1 // trailing note\n}").unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn lenient_lowercases_python_booleans() {
        let v = parse_json_lenient(r#"{"read": True, "spam": False}"#).unwrap();
        assert_eq!(v["read"], true);
        assert_eq!(v["spam"], false);
    }

    #[test]
    fn slashes_inside_strings_survive() {
        let v = parse_json_lenient("{\"url\": \"http://example.com\" // c\n}").unwrap();
        assert_eq!(v["url"], "http://example.com");
    }

    #[test]
    fn truly_broken_json_still_fails() {
        assert!(parse_json_lenient("{nope").is_err());
    }
}
