//! Markup document artifact, structural validation and repair.
//!
//! A [`Document`] is a single html blob. Its structural feature set is
//! always derived fresh from the blob; nothing is cached, so a check
//! can never go stale against an edited document.
//!
//! Validation reports missing features without discarding the document.
//! Normalization repairs the two auto-fixable features (doctype and
//! viewport meta) and is idempotent: `normalize(normalize(d)) ==
//! normalize(d)`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

lazy_static! {
    // Opening head tag; deliberately does not match <header>.
    static ref HEAD_OPEN: Regex =
        Regex::new(r"(?i)<head(\s[^>]*)?>").expect("Invalid regex");
    static ref VIEWPORT_TAG: Regex =
        Regex::new(r#"(?i)<meta\s+name="viewport""#).expect("Invalid regex");
    static ref DOCTYPE_DECL: Regex =
        Regex::new(r"(?i)<!doctype\s+html").expect("Invalid regex");
}

/// Canonical document-type declaration prepended when missing.
pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// Canonical viewport meta tag inserted when missing.
pub const VIEWPORT_META: &str =
    r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;

/// Markers identifying interactive control elements.
const CONTROL_MARKERS: &[&str] = &["<input", "<button", "<select", "onclick", "addeventlistener"];

/// A structural feature missing from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    MissingDoctype,
    MissingViewport,
    NoInteractiveControls,
    NoStyling,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Violation::MissingDoctype => "Missing DOCTYPE declaration",
            Violation::MissingViewport => "Missing viewport meta tag for mobile",
            Violation::NoInteractiveControls => "No interactive controls found",
            Violation::NoStyling => "No styling found (inline or embedded)",
        };
        f.write_str(msg)
    }
}

/// A generated markup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    html: String,
}

impl Document {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Derive the set of missing structural features.
    ///
    /// Each check is independent and order-insensitive; an empty set
    /// means the document is structurally valid. Pure: safe to call
    /// repeatedly, always recomputed from the blob.
    pub fn violations(&self) -> BTreeSet<Violation> {
        let lower = self.html.to_lowercase();
        let mut missing = BTreeSet::new();

        if !DOCTYPE_DECL.is_match(&self.html) {
            missing.insert(Violation::MissingDoctype);
        }

        if !VIEWPORT_TAG.is_match(&self.html) {
            missing.insert(Violation::MissingViewport);
        }

        if !CONTROL_MARKERS.iter().any(|m| lower.contains(m)) {
            missing.insert(Violation::NoInteractiveControls);
        }

        if !lower.contains("<style") && !lower.contains("style=") {
            missing.insert(Violation::NoStyling);
        }

        missing
    }

    /// Repair the auto-fixable structural omissions.
    ///
    /// Prepends the canonical doctype when missing and inserts the
    /// canonical viewport meta immediately after the opening head tag
    /// when missing. Both checks use the same predicates as
    /// [`Document::violations`], so a repaired document never retains
    /// either violation. If the document has no head tag the viewport
    /// insertion is a no-op and the violation persists. No other
    /// content is altered. Idempotent.
    pub fn normalize(&self) -> Document {
        let mut html = self.html.clone();

        if !VIEWPORT_TAG.is_match(&html) {
            if let Some(pos) = find_head_open_end(&html) {
                html.insert_str(pos, &format!("\n    {VIEWPORT_META}"));
            }
        }

        if !DOCTYPE_DECL.is_match(&html) {
            html = format!("{DOCTYPE}\n{html}");
        }

        Document::new(html)
    }
}

/// Byte offset just past the `>` of the opening `<head>` tag, if any.
fn find_head_open_end(html: &str) -> Option<usize> {
    HEAD_OPEN.find(html).map(|m| m.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FULL_DOC: &str = concat!(
        "<!DOCTYPE html>\n<html>\n<head>\n",
        r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#,
        "\n<style>body { margin: 0; }</style>\n</head>\n",
        "<body><button>Start</button></body>\n</html>"
    );

    #[test]
    fn test_valid_document_has_no_violations() {
        let doc = Document::new(FULL_DOC);
        assert!(doc.violations().is_empty());
    }

    #[test]
    fn test_missing_doctype_and_viewport_detected() {
        let doc = Document::new("<html><head></head><body><button>Go</button><style></style></body></html>");
        let violations = doc.violations();
        assert!(violations.contains(&Violation::MissingDoctype));
        assert!(violations.contains(&Violation::MissingViewport));
        assert!(!violations.contains(&Violation::NoInteractiveControls));
        assert!(!violations.contains(&Violation::NoStyling));
    }

    #[test]
    fn test_normalize_repairs_doctype_and_viewport() {
        let doc = Document::new("<html><head></head><body><input type=\"range\" style=\"width:100%\"></body></html>");
        assert_eq!(doc.violations().len(), 2);

        let fixed = doc.normalize();
        assert!(fixed.violations().is_empty());
        assert!(fixed.html().starts_with(DOCTYPE));
        assert!(fixed.html().contains(VIEWPORT_META));
    }

    #[test]
    fn test_non_html_doctype_token_still_repaired() {
        // A stray non-html doctype must not mask the missing declaration.
        let doc = Document::new("<!doctype foo>\n<html><head></head><body></body></html>");
        assert!(doc.violations().contains(&Violation::MissingDoctype));

        let fixed = doc.normalize();
        assert!(fixed.html().starts_with(DOCTYPE));
        let violations = fixed.violations();
        assert!(!violations.contains(&Violation::MissingDoctype));
        assert!(!violations.contains(&Violation::MissingViewport));
        assert_eq!(fixed.normalize(), fixed);
    }

    #[test]
    fn test_normalize_without_head_leaves_viewport_violation() {
        let doc = Document::new("<html><body><button>Go</button></body></html>");
        let fixed = doc.normalize();
        let violations = fixed.violations();
        assert!(!violations.contains(&Violation::MissingDoctype));
        assert!(violations.contains(&Violation::MissingViewport));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let doc = Document::new("<html><head></head><body></body></html>");
        let once = doc.normalize();
        let twice = once.normalize();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_does_not_touch_valid_document() {
        let doc = Document::new(FULL_DOC);
        assert_eq!(doc.normalize(), doc);
    }

    #[test]
    fn test_header_tag_is_not_a_head_tag() {
        assert_eq!(find_head_open_end("<html><header>x</header></html>"), None);
        assert!(find_head_open_end("<html><head></head></html>").is_some());
        assert!(find_head_open_end("<html><HEAD lang=\"en\"></HEAD></html>").is_some());
    }

    #[test]
    fn test_viewport_inserted_after_head_open() {
        let doc = Document::new("<html><head><title>T</title></head><body></body></html>");
        let fixed = doc.normalize();
        let html = fixed.html();
        let head = html.find("<head>").unwrap();
        let viewport = html.find("viewport").unwrap();
        let title = html.find("<title>").unwrap();
        assert!(head < viewport && viewport < title);
    }

    #[test]
    fn test_feature_set_recomputed_not_cached() {
        let doc = Document::new("<html><body></body></html>");
        assert!(doc.violations().contains(&Violation::MissingDoctype));
        let repaired = doc.normalize();
        assert!(!repaired.violations().contains(&Violation::MissingDoctype));
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(html in ".{0,400}") {
            let doc = Document::new(html);
            let once = doc.normalize();
            prop_assert_eq!(once.normalize(), once);
        }

        #[test]
        fn prop_normalize_fixes_doctype(body in "[a-z ]{0,100}") {
            let doc = Document::new(format!("<html><head></head><body>{body}</body></html>"));
            let fixed = doc.normalize();
            let violations = fixed.violations();
            prop_assert!(!violations.contains(&Violation::MissingDoctype));
            prop_assert!(!violations.contains(&Violation::MissingViewport));
        }
    }
}
