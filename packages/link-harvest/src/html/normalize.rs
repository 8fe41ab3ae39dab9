//! Page content normalization for prompts.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Elements that never carry page content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "meta", "nav", "footer", "aside", "head", "iframe", "embed", "object",
    "noscript", "link",
];

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static RE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Convert page HTML to compact markdown.
///
/// Headings, lists and paragraphs survive; chrome elements and comments
/// are dropped. Falls back to [`strip_tags`] when conversion fails or
/// loses all text.
pub fn normalize(html: &str) -> String {
    let without_comments = RE_COMMENT.replace_all(html, "");

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    match converter.convert(&without_comments) {
        Ok(markdown) => {
            let markdown = collapse_blank_lines(&markdown);
            if markdown.is_empty() {
                strip_tags(&without_comments)
            } else {
                markdown
            }
        }
        Err(e) => {
            warn!(error = %e, "markdown conversion failed, stripping tags");
            strip_tags(&without_comments)
        }
    }
}

/// Plain-text rendition: scripts and styles removed, tags replaced by
/// spaces, entities decoded, whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let text = RE_SCRIPT.replace_all(html, " ");
    let text = RE_STYLE.replace_all(&text, " ");
    let text = RE_TAG.replace_all(&text, " ");
    let decoded = html_escape::decode_html_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn collapse_blank_lines(markdown: &str) -> String {
    RE_BLANK_LINES
        .replace_all(markdown, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_structure_drops_chrome() {
        let html = r#"
            <html><head><title>T</title><style>.x{}</style></head>
            <body>
              <nav><a href="/">Home</a></nav>
              <h1>Open Roles</h1>
              <!-- hidden note -->
              <ul><li>Engineer</li><li>Designer</li></ul>
              <script>var tracking = 1;</script>
              <footer>Copyright</footer>
            </body></html>
        "#;
        let out = normalize(html);

        assert!(out.contains("Open Roles"));
        assert!(out.contains("Engineer"));
        assert!(out.contains("Designer"));
        assert!(!out.contains("tracking"));
        assert!(!out.contains("Copyright"));
        assert!(!out.contains("hidden note"));
        assert!(!out.contains("Home"));
    }

    #[test]
    fn test_collapses_blank_runs_and_trims() {
        let out = collapse_blank_lines("\n\na\n\n\n\n\nb\n\n");
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn test_strip_tags_fallback() {
        let html =
            "<div>Fish &amp; Chips<script>x()</script><STYLE>p{}</STYLE>\n\n<b>Today</b></div>";
        assert_eq!(strip_tags(html), "Fish & Chips Today");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
