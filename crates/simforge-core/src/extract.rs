//! Format extraction from raw generation output.
//!
//! Models return structured payloads wrapped in prose, markdown fences,
//! partial JSON wrappers, or nothing recognizable at all. The extractor
//! recovers the embedded payload where one exists and reports a tagged
//! failure where one does not. It never panics and never propagates an
//! error past its boundary: every call returns an [`Extraction`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::document::Document;

lazy_static! {
    static ref JSON_FENCE: Regex =
        Regex::new(r"(?s)```(?:json|JSON)\s*\n(.*?)```").expect("Invalid regex");
    static ref HTML_FENCE: Regex =
        Regex::new(r"(?s)```(?:html|HTML)\s*\n(.*?)```").expect("Invalid regex");
    static ref ANY_FENCE: Regex =
        Regex::new(r"(?s)```[a-zA-Z]*\s*\n(.*?)```").expect("Invalid regex");
    static ref MARKUP_START: Regex =
        Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").expect("Invalid regex");
    static ref MARKUP_END: Regex = Regex::new(r"(?i)</html>").expect("Invalid regex");
}

/// Keys under which a structured payload may carry a markup document.
const MARKUP_KEYS: &[&str] = &["index.html", "html"];

/// The payload shape a stage expects back from generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    /// A key-value JSON payload
    Structured,

    /// A self-contained markup document
    Markup,
}

/// Tagged outcome of extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A recovered key-value payload
    Structured(Map<String, Value>),

    /// A recovered markup document
    Markup(Document),

    /// Nothing recognizable; carries a human-readable reason
    Failed(String),
}

impl Extraction {
    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }
}

/// Recover the embedded payload of the expected shape from raw text.
pub fn extract(raw: &str, expected: ExpectedShape) -> Extraction {
    match expected {
        ExpectedShape::Structured => extract_structured(raw),
        ExpectedShape::Markup => extract_markup(raw),
    }
}

/// Structured extraction, in priority order: direct parse, fenced json
/// block, first balanced brace span. Raw markup with no JSON wrapper is
/// still acceptable and comes back tagged as markup.
fn extract_structured(raw: &str) -> Extraction {
    let text = raw.trim();
    if text.is_empty() {
        return Extraction::Failed("empty response".to_string());
    }

    if let Some(payload) = parse_object(text) {
        return Extraction::Structured(payload);
    }

    if let Some(caps) = JSON_FENCE.captures(text).or_else(|| ANY_FENCE.captures(text)) {
        let inner = caps[1].trim();
        if let Some(payload) = parse_object(inner) {
            return Extraction::Structured(payload);
        }
    }

    if let Some(span) = balanced_brace_span(text) {
        if let Some(payload) = parse_object(span) {
            return Extraction::Structured(payload);
        }
    }

    // The model sometimes ignores the JSON wrapper entirely and emits
    // the document it was asked to wrap.
    if let Extraction::Markup(doc) = extract_markup(text) {
        tracing::debug!("structured extraction recovered raw markup instead");
        return Extraction::Markup(doc);
    }

    Extraction::Failed("no balanced structured span found".to_string())
}

/// Markup extraction, in priority order: markup field inside a JSON
/// wrapper, fenced html block, raw document text, embedded document
/// span.
fn extract_markup(raw: &str) -> Extraction {
    let text = raw.trim();
    if text.is_empty() {
        return Extraction::Failed("empty response".to_string());
    }

    // A JSON wrapper (including a fenced or prose-surrounded one) whose
    // markup field holds the document. A `fixed`/`changes_made` wrapper
    // still yields the inner markup, never the wrapper.
    let candidate = parse_object(text)
        .or_else(|| {
            JSON_FENCE
                .captures(text)
                .and_then(|caps| parse_object(caps[1].trim()))
        })
        .or_else(|| balanced_brace_span(text).and_then(parse_object));
    if let Some(payload) = candidate {
        if let Some(html) = markup_field(&payload) {
            return Extraction::Markup(Document::new(html));
        }
    }

    if let Some(caps) = HTML_FENCE.captures(text) {
        return Extraction::Markup(Document::new(caps[1].trim()));
    }

    if let Some(m) = MARKUP_START.find(text) {
        // Text beginning with a root marker passes through verbatim;
        // with prose before the document, slice from the first root
        // marker to the last closing tag, or to the end when the close
        // is missing.
        if m.start() == 0 {
            return Extraction::Markup(Document::new(text));
        }
        let end = MARKUP_END
            .find_iter(text)
            .last()
            .map(|e| e.end())
            .unwrap_or(text.len());
        if m.start() < end {
            return Extraction::Markup(Document::new(&text[m.start()..end]));
        }
    }

    Extraction::Failed("no markup document found".to_string())
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Pull the markup string out of a structured payload, looking through
/// known markup keys.
fn markup_field(payload: &Map<String, Value>) -> Option<String> {
    MARKUP_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// The first top-level balanced `{...}` span, tolerant of nested
/// objects and of braces inside string literals.
fn balanced_brace_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(raw: &str) -> Extraction {
        extract(raw, ExpectedShape::Structured)
    }

    fn markup(raw: &str) -> Extraction {
        extract(raw, ExpectedShape::Markup)
    }

    fn expect_map(result: Extraction) -> Map<String, Value> {
        match result {
            Extraction::Structured(map) => map,
            other => panic!("expected structured payload, got {other:?}"),
        }
    }

    fn expect_html(result: Extraction) -> String {
        match result {
            Extraction::Markup(doc) => doc.into_html(),
            other => panic!("expected markup payload, got {other:?}"),
        }
    }

    #[test]
    fn test_direct_json_parse() {
        let map = expect_map(structured(r#"{"learning_objectives": ["a"]}"#));
        assert!(map.contains_key("learning_objectives"));
    }

    #[test]
    fn test_fenced_json_with_surrounding_prose() {
        let raw = "Here is the blueprint you asked for:\n```json\n{\"key_concepts\": [\"x\"]}\n```\nLet me know if you need changes.";
        let map = expect_map(structured(raw));
        assert_eq!(map["key_concepts"][0], "x");
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        let map = expect_map(structured(raw));
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_balanced_span_in_prose() {
        let raw = "Sure! The plan is {\"a\": {\"nested\": true}, \"b\": 2} as requested.";
        let map = expect_map(structured(raw));
        assert_eq!(map["a"]["nested"], true);
        assert_eq!(map["b"], 2);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_balance() {
        let raw = r#"prefix {"css": "body { margin: 0; }", "ok": true} suffix"#;
        let map = expect_map(structured(raw));
        assert_eq!(map["ok"], true);
        assert_eq!(map["css"], "body { margin: 0; }");
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let raw = r#"note: {"text": "he said \"hi {there}\"", "n": 1} done"#;
        let map = expect_map(structured(raw));
        assert_eq!(map["n"], 1);
    }

    #[test]
    fn test_structured_failure_reason() {
        match structured("no json here at all") {
            Extraction::Failed(reason) => {
                assert!(reason.contains("no balanced structured span"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_accepts_raw_markup() {
        let raw = "<!DOCTYPE html>\n<html><body></body></html>";
        let html = expect_html(structured(raw));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_markup_from_json_wrapper() {
        let raw = r#"{"index.html": "<!DOCTYPE html><html><body><input></body></html>"}"#;
        let html = expect_html(markup(raw));
        assert!(html.contains("<input>"));
    }

    #[test]
    fn test_fixed_wrapper_yields_inner_markup() {
        let raw = concat!(
            "Here is the corrected file:\n```json\n",
            r#"{"fixed": true, "index.html": "<!DOCTYPE html><html><head></head><body><input></body></html>", "explanations": ["added viewport"]}"#,
            "\n```"
        );
        let html = expect_html(markup(raw));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("explanations"));
    }

    #[test]
    fn test_markup_from_html_fence() {
        let raw = "The page:\n```html\n<!DOCTYPE html>\n<html><body></body></html>\n```";
        let html = expect_html(markup(raw));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_raw_markup_passes_through_verbatim() {
        let raw = "<html lang=\"en\"><body><p>hi</p></body></html>";
        assert_eq!(expect_html(markup(raw)), raw);
    }

    #[test]
    fn test_markup_embedded_in_prose() {
        let raw = "Sure, here you go:\n<!DOCTYPE html>\n<html><body></body></html>\nHope that helps!";
        let html = expect_html(markup(raw));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_markup_without_closing_tag_slices_to_end() {
        let raw = "preamble <html><body><p>truncated";
        let html = expect_html(markup(raw));
        assert!(html.starts_with("<html>"));
        assert!(html.ends_with("truncated"));
    }

    #[test]
    fn test_markup_failure() {
        match markup("just some prose, no document") {
            Extraction::Failed(reason) => assert!(reason.contains("no markup document")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_fails_both_shapes() {
        assert!(structured("   ").is_failed());
        assert!(markup("").is_failed());
    }

    #[test]
    fn test_leading_trailing_whitespace_discarded() {
        let raw = "\n\n   {\"a\": 1}   \n";
        let map = expect_map(structured(raw));
        assert_eq!(map["a"], 1);
    }
}
