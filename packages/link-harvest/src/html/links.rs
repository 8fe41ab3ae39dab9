//! Same-origin link extraction.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::types::link::LinkRecord;

/// Extract same-origin links from `html`, resolved against `base_url`.
///
/// Returns links in document order, unique by URL (first label wins).
/// An unparseable `base_url` yields no links.
pub fn extract_links(html: &str, base_url: &str) -> Vec<LinkRecord> {
    match Url::parse(base_url) {
        Ok(base) => extract_links_from(html, &base),
        Err(e) => {
            debug!(base_url = %base_url, error = %e, "unparseable base URL, no links extracted");
            Vec::new()
        }
    }
}

/// Same as [`extract_links`] with an already parsed base.
pub fn extract_links_from(html: &str, base: &Url) -> Vec<LinkRecord> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let base_host = base.host_str();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if is_skipped_href(href) {
            continue;
        }

        let mut resolved = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!(href = %href, error = %e, "skipping malformed link");
                continue;
            }
        };
        if resolved.host_str() != base_host {
            continue;
        }
        resolved.set_fragment(None);

        let url = resolved.to_string();
        if seen.insert(url.clone()) {
            links.push(LinkRecord::new(anchor_text(&element), url));
        }
    }

    debug!(base = %base, count = links.len(), "extracted links");
    links
}

fn is_skipped_href(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return true;
    }
    let lower = href.to_ascii_lowercase();
    lower.starts_with("javascript:") || lower.starts_with("mailto:")
}

/// Visible text of the anchor, whitespace collapsed. The parser has already
/// decoded entities.
fn anchor_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(links: &[LinkRecord]) -> Vec<&str> {
        links.iter().map(|l| l.url.as_str()).collect()
    }

    #[test]
    fn test_same_origin_and_resolution() {
        let html = r#"
            <a href="/z">Root</a>
            <a href="z2">Sibling</a>
            <a href="https://b.com/q">Elsewhere</a>
        "#;
        let links = extract_links(html, "https://a.com/x/y");

        assert_eq!(urls(&links), vec!["https://a.com/z", "https://a.com/x/z2"]);
        assert_eq!(links[0].label, "Root");
        assert_eq!(links[1].label, "Sibling");
    }

    #[test]
    fn test_dedup_keeps_first_label() {
        let html = r#"<a href="/p">One</a><a href="/p">Two</a>"#;
        let links = extract_links(html, "https://a.com/");

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "One");
    }

    #[test]
    fn test_skips_non_navigational_hrefs() {
        let html = r##"
            <a href="">Empty</a>
            <a href="#top">Anchor</a>
            <a href="JavaScript:void(0)">Script</a>
            <a href="mailto:jobs@a.com">Mail</a>
            <a href="  /kept  ">Kept</a>
        "##;
        let links = extract_links(html, "https://a.com/");

        assert_eq!(urls(&links), vec!["https://a.com/kept"]);
    }

    #[test]
    fn test_fragments_dedupe_to_one_page() {
        let html = r#"<a href="/p#a">A</a><a href="/p#b">B</a>"#;
        let links = extract_links(html, "https://a.com/");

        assert_eq!(urls(&links), vec!["https://a.com/p"]);
        assert_eq!(links[0].label, "A");
    }

    #[test]
    fn test_label_is_decoded_and_collapsed() {
        let html = "<a href=\"/c\">  Jobs &amp;\n   <b>Careers</b> </a>";
        let links = extract_links(html, "https://a.com/");

        assert_eq!(links[0].label, "Jobs & Careers");
    }

    #[test]
    fn test_absolute_same_host_kept() {
        let html = r#"<a href="https://a.com/abs">Abs</a><a href="//a.com/proto">Proto</a>"#;
        let links = extract_links(html, "https://a.com/x/");

        assert_eq!(
            urls(&links),
            vec!["https://a.com/abs", "https://a.com/proto"]
        );
    }

    #[test]
    fn test_bad_base_yields_nothing() {
        assert!(extract_links(r#"<a href="/z">Z</a>"#, "not a url").is_empty());
    }
}
