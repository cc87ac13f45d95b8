//! HTML-to-Markdown conversion for fetched pages.

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, instrument};
use url::Url;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)]*)\)").expect("valid regex"));
static MULTI_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static TRAILING_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));

/// Options for the conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Keep `[text](href)` links; otherwise only the text survives.
    pub include_links: bool,
    /// Keep images; otherwise `<img>` elements are dropped.
    pub include_images: bool,
}

/// Converts an HTML page to Markdown prefixed with a `Title:`/`URL:` header.
///
/// # Errors
///
/// Returns a description of the failure when `htmd` cannot convert the page.
#[instrument(skip(html, options), fields(url = %source_url))]
pub fn html_to_markdown(
    html: &str,
    source_url: &Url,
    options: MarkdownOptions,
) -> Result<String, String> {
    let title = extract_title(html).unwrap_or_else(|| source_url.to_string());

    let mut skip_tags = vec!["script", "style", "noscript", "iframe", "svg", "head"];
    if !options.include_images {
        skip_tags.push("img");
    }

    let converter = htmd::HtmlToMarkdown::builder().skip_tags(skip_tags).build();
    let raw = converter
        .convert(html)
        .map_err(|e| format!("HTML conversion failed: {e}"))?;

    let body = cleanup(&raw, options);
    debug!(title = %title, raw_len = raw.len(), final_len = body.len(), "conversion complete");

    Ok(format!("Title: {title}\nURL: {source_url}\n\n{body}"))
}

/// Reads the page title from `<title>`, falling back to the first `<h1>`.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    for selector in ["title", "h1"] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Truncates to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn cleanup(markdown: &str, options: MarkdownOptions) -> String {
    let text = if options.include_links {
        markdown.to_string()
    } else {
        LINK_RE
            .replace_all(markdown, |caps: &Captures<'_>| {
                if &caps[1] == "!" {
                    caps[0].to_string()
                } else {
                    caps[2].to_string()
                }
            })
            .into_owned()
    };

    let text = TRAILING_SPACE_RE.replace_all(&text, "");
    let text = MULTI_BLANK_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head><title>Example Domain</title><style>body { color: red; }</style></head>
        <body>
            <h1>Example Domain</h1>
            <p>This domain is for use in <a href="https://iana.org/">documentation</a>.</p>
            <img src="/logo.png" alt="logo">
            <script>alert("hi")</script>
        </body>
    </html>"#;

    fn url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_header_and_body() {
        let md = html_to_markdown(PAGE, &url(), MarkdownOptions::default()).unwrap();

        assert!(md.starts_with("Title: Example Domain\nURL: https://example.com/\n\n"));
        assert!(md.contains("# Example Domain"));
        assert!(md.contains("This domain is for use in documentation."));
        assert!(!md.contains("alert"));
        assert!(!md.contains("color: red"));
        assert!(!md.contains("logo.png"));
    }

    #[test]
    fn test_links_and_images_kept_when_requested() {
        let options = MarkdownOptions {
            include_links: true,
            include_images: true,
        };
        let md = html_to_markdown(PAGE, &url(), options).unwrap();

        assert!(md.contains("[documentation](https://iana.org/)"));
        assert!(md.contains("logo.png"));
    }

    #[test]
    fn test_title_falls_back_to_h1_then_url() {
        assert_eq!(
            extract_title("<body><h1>  Heading\n One </h1></body>").as_deref(),
            Some("Heading One")
        );
        assert_eq!(extract_title("<p>no title</p>"), None);

        let md = html_to_markdown("<p>text</p>", &url(), MarkdownOptions::default()).unwrap();
        assert!(md.starts_with("Title: https://example.com/\n"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("範例網域", 2), "範例");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
