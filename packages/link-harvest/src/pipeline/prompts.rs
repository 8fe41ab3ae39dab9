//! Engine prompts for classification and extraction.
//!
//! Pages are long and models drift away from instructions given only at the
//! top, so the user's guidance is restated after every large block.

use crate::types::link::LinkRecord;
use crate::types::schema::FieldSchema;

/// Prompt for bucketing discovered links by relevance.
pub const CLASSIFY_PROMPT: &str = r#"Evaluate the links found on a web page and bucket their indices by relevance to the user's goal.

User goal: {guidance}

Links (index | label | url):
{links}

Reminder of the user goal: {guidance}

Page content (markdown):
{markdown}

Reminder of the user goal: {guidance}

Page HTML:
{html}

Reminder of the user goal: {guidance}

Answer with two range lists of link indices, most relevant first.
A range list is comma-separated tokens, each a single index like 7 or an inclusive ascending range like 10-20.
- high_confidence: links that clearly match the goal
- mid_confidence: links that might match the goal
Use an empty string for an empty bucket. Only use indices from the list above."#;

/// Prompt for schema-constrained extraction of one page.
pub const EXTRACT_PROMPT: &str = r#"You are extracting data for one row of a table from a single web page.

Page: {label} ({url})

Fields to extract:
{fields}
{guidance_section}
Page content (markdown):
{markdown}
{guidance_reminder}
Page HTML:
{html}
{guidance_reminder}
Return a value for every field. Use null when the page does not contain the data. Do not invent values."#;

/// Plain-text fallback prompt used when structured extraction fails.
pub const FALLBACK_PROMPT: &str = r#"Extract data from this content for these fields: {field_names}
{guidance_section}
Content:
{content}

For each field, provide the value or "N/A" if not found. Format as:
{format_lines}"#;

/// Format the classification prompt.
pub fn format_classify_prompt(
    links: &[LinkRecord],
    guidance: &str,
    markdown: &str,
    html: &str,
) -> String {
    let links_text = links
        .iter()
        .enumerate()
        .map(|(i, link)| format!("{} | {} | {}", i, link.label, link.url))
        .collect::<Vec<_>>()
        .join("\n");

    fill(
        CLASSIFY_PROMPT,
        &[
            ("links", links_text.as_str()),
            ("markdown", markdown),
            ("html", html),
            ("guidance", guidance_or_default(guidance)),
        ],
    )
}

/// Format the structured extraction prompt.
pub fn format_extract_prompt(
    link: &LinkRecord,
    schema: &FieldSchema,
    guidance: Option<&str>,
    markdown: &str,
    html: &str,
) -> String {
    let fields = schema
        .fields()
        .iter()
        .map(|f| format!("- {} (key: {})", f.name, f.key))
        .collect::<Vec<_>>()
        .join("\n");

    let (section, reminder) = match guidance.map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) => (
            format!("\nAdditional guidance for extraction:\n{g}\n"),
            format!("\nReminder of the extraction guidance: {g}\n"),
        ),
        None => (String::new(), String::new()),
    };

    fill(
        EXTRACT_PROMPT,
        &[
            ("label", link.display_label()),
            ("url", link.url.as_str()),
            ("fields", fields.as_str()),
            ("guidance_section", section.as_str()),
            ("guidance_reminder", reminder.as_str()),
            ("markdown", markdown),
            ("html", html),
        ],
    )
}

/// Format the plain-text fallback prompt.
pub fn format_fallback_prompt(
    schema: &FieldSchema,
    guidance: Option<&str>,
    content: &str,
) -> String {
    let names = schema.names().collect::<Vec<_>>();
    let format_lines = names
        .iter()
        .map(|name| format!("{name}: [value]"))
        .collect::<Vec<_>>()
        .join("\n");

    let section = match guidance.map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) => format!("\nAdditional guidance: {g}\n"),
        None => String::new(),
    };

    fill(
        FALLBACK_PROMPT,
        &[
            ("field_names", names.join(", ").as_str()),
            ("guidance_section", section.as_str()),
            ("format_lines", format_lines.as_str()),
            ("content", content),
        ],
    )
}

/// Substitute `{name}` placeholders in one left-to-right pass.
///
/// Inserted values are never scanned again, so page text that happens to
/// contain `{html}` stays literal. Unknown `{...}` sequences are kept.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn guidance_or_default(guidance: &str) -> &str {
    let trimmed = guidance.trim();
    if trimmed.is_empty() {
        "(no specific goal given; rank links by how much useful content they likely hold)"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FieldSchema {
        FieldSchema::new(["Company Name", "Email"]).unwrap()
    }

    #[test]
    fn test_classify_prompt_indexes_links_and_repeats_guidance() {
        let links = vec![
            LinkRecord::new("Careers", "https://a.com/careers"),
            LinkRecord::new("Blog", "https://a.com/blog"),
        ];
        let prompt =
            format_classify_prompt(&links, "find job posts", "# Home", "<h1>Home</h1>");

        assert!(prompt.contains("0 | Careers | https://a.com/careers"));
        assert!(prompt.contains("1 | Blog | https://a.com/blog"));
        assert_eq!(prompt.matches("find job posts").count(), 4);
        assert!(prompt.contains("# Home"));
        assert!(prompt.contains("<h1>Home</h1>"));
    }

    #[test]
    fn test_extract_prompt_with_guidance() {
        let link = LinkRecord::new("Acme", "https://a.com/acme");
        let prompt =
            format_extract_prompt(&link, &schema(), Some("prefer HQ"), "md", "<p>x</p>");

        assert!(prompt.contains("https://a.com/acme"));
        assert!(prompt.contains("- Company Name (key: company_name)"));
        assert_eq!(prompt.matches("prefer HQ").count(), 3);
    }

    #[test]
    fn test_extract_prompt_without_guidance() {
        let link = LinkRecord::new("", "https://a.com/acme");
        let prompt = format_extract_prompt(&link, &schema(), Some("   "), "md", "html");

        assert!(!prompt.contains("guidance"));
        assert!(prompt.contains("Page: https://a.com/acme (https://a.com/acme)"));
    }

    #[test]
    fn test_fallback_prompt_format_lines() {
        let prompt = format_fallback_prompt(&schema(), None, "content here");

        assert!(prompt.contains("these fields: Company Name, Email"));
        assert!(prompt.contains("Company Name: [value]\nEmail: [value]"));
        assert!(prompt.contains("content here"));
    }

    #[test]
    fn test_placeholders_in_page_text_stay_literal() {
        let links = vec![LinkRecord::new("Docs {{html}}", "https://a.com/docs")];
        let markdown = "Template syntax: {{html}} and {guidance}";
        let html = "<div>RAWHTML</div>";

        let prompt = format_classify_prompt(&links, "find manuals", markdown, html);
        assert_eq!(prompt.matches("RAWHTML").count(), 1);
        assert!(prompt.contains("0 | Docs {{html}} | https://a.com/docs"));
        assert!(prompt.contains("Template syntax: {{html}} and {guidance}"));
        assert_eq!(prompt.matches("find manuals").count(), 4);

        let prompt = format_extract_prompt(&links[0], &schema(), None, markdown, html);
        assert_eq!(prompt.matches("RAWHTML").count(), 1);
        assert!(prompt.contains("Page: Docs {{html}} (https://a.com/docs)"));
    }

    #[test]
    fn test_fill_keeps_unknown_braces() {
        let out = fill("a {x} {y} {", &[("x", "{y}")]);
        assert_eq!(out, "a {y} {y} {");
    }
}
