//! Preview document assembly.
//!
//! Pure string work: merge the three source buffers into one self-contained
//! document for the host's sandboxed rendering surface. Never fails;
//! malformed markup passes through as-is.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html[\s>]").unwrap());
static STYLE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<style.*?>").unwrap());
static SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<script.*?>").unwrap());
static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head>").unwrap());
static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body>").unwrap());

/// Merge markup, stylesheet and script into a single document.
///
/// Markup that already carries a top-level `<html>` tag is treated as a full
/// document: the stylesheet is injected before `</head>` and the script
/// before `</body>`, each only when no such tag exists anywhere in the
/// document yet. The presence check is intentionally coarse; any existing
/// `<style>`/`<script>` tag suppresses injection entirely, which avoids
/// duplicates at the cost of sometimes dropping the respective buffer.
/// Markup without an `<html>` tag is wrapped as the body of a minimal HTML5
/// document.
pub fn assemble(markup: &str, stylesheet: &str, script: &str) -> String {
    if HTML_TAG.is_match(markup) {
        let mut doc = markup.to_string();
        if !STYLE_TAG.is_match(&doc) {
            let injected = format!("<style>{stylesheet}</style>\n</head>");
            doc = HEAD_CLOSE.replace(&doc, NoExpand(&injected)).into_owned();
        }
        if !SCRIPT_TAG.is_match(&doc) {
            let injected = format!("<script>{script}</script>\n</body>");
            doc = BODY_CLOSE.replace(&doc, NoExpand(&injected)).into_owned();
        }
        return doc;
    }

    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"/>\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"/>\
         <style>{stylesheet}</style></head>\
         <body>{markup}<script>{script}</script></body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = "<!doctype html>\n<html>\n<head>\n<style>p{color:blue}</style>\n</head>\n<body>\n<p>hi</p>\n<script>console.log('x')</script>\n</body>\n</html>";

    #[test]
    fn full_document_with_both_tags_is_returned_unchanged() {
        let out = assemble(FULL_DOC, "body{color:red}", "console.log(1)");
        assert_eq!(out, FULL_DOC);
    }

    #[test]
    fn injects_into_full_document_missing_style_and_script() {
        let doc = "<html><head></head><body><p>hi</p></body></html>";
        let out = assemble(doc, "body{color:red}", "console.log(1)");
        assert!(out.contains("<style>body{color:red}</style>\n</head>"));
        assert!(out.contains("<script>console.log(1)</script>\n</body>"));
    }

    #[test]
    fn existing_style_tag_suppresses_stylesheet_injection() {
        let doc = "<html><head><style>.a{}</style></head><body></body></html>";
        let out = assemble(doc, "body{color:red}", "");
        assert!(!out.contains("body{color:red}"));
        // The script buffer still lands since no <script> tag exists.
        assert!(out.contains("<script></script>\n</body>"));
    }

    #[test]
    fn wraps_fragment_markup_into_a_minimal_document() {
        let out = assemble("<div>hi</div>", "body{color:red}", "console.log(1)");
        assert!(out.starts_with("<!doctype html><html><head>"));
        assert!(out.contains("<style>body{color:red}</style>"));
        assert!(out.contains("<body><div>hi</div>"));
        assert!(out.contains("<script>console.log(1)</script></body></html>"));
    }

    #[test]
    fn dollar_signs_in_buffers_survive_injection() {
        let doc = "<html><head></head><body></body></html>";
        let out = assemble(doc, ".price::after{content:\"$1\"}", "let x = `$${y}`;");
        assert!(out.contains("content:\"$1\""));
        assert!(out.contains("`$${y}`"));
    }

    #[test]
    fn html_tag_detection_is_case_insensitive() {
        let doc = "<HTML><HEAD></HEAD><BODY></BODY></HTML>";
        let out = assemble(doc, ".a{}", "1;");
        assert!(out.contains("<style>.a{}</style>"));
        assert!(out.contains("<script>1;</script>"));
    }
}
