//! HTML text extraction helpers

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::internal(format!("Bad selector '{}': {}", css, e)))
}

/// Trimmed, non-empty `<title>` text
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = selector("title").ok()?;

    document
        .select(&title)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
}

/// Visible text segments of the page body, in document order
pub fn extract_text_segments(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let root = selector("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    visible_segments(root)
}

/// Text of the first element matching `css`, one segment per line
pub fn extract_element_text(html: &str, css: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let sel = selector(css)?;

    Ok(document
        .select(&sel)
        .next()
        .map(|el| visible_segments(el).join("\n"))
        .filter(|text| !text.trim().is_empty()))
}

fn visible_segments(root: ElementRef<'_>) -> Vec<String> {
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                    .unwrap_or(false)
            });
            if hidden {
                return None;
            }
            let segment = collapse_whitespace(text);
            (!segment.is_empty()).then_some(segment)
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
