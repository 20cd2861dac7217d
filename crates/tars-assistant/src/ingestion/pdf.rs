//! PDF text extraction

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

use super::document::DocumentParser;
use crate::error::{Error, Result};

/// Typographic characters flattened to ASCII so the prompt stays plain
const ASCII_APPROXIMATIONS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Unresolved glyph names such as `uni2019`, `(uni2019)` or `<uni2019>`
fn glyph_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[(<]?\buni([0-9A-F]{4})[)>]?").expect("Invalid regex")
    })
}

/// Resolve leftover glyph names and flatten typographic characters
pub fn cleanup_pdf_text(text: &str) -> String {
    let resolved = glyph_name_pattern().replace_all(text, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let mut result = resolved.into_owned();
    for (from, to) in ASCII_APPROXIMATIONS {
        if result.contains(*from) {
            result = result.replace(*from, to);
        }
    }
    result
}

/// PDF parser: lopdf page by page, pdf-extract for the whole file when lopdf
/// finds no text
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for PdfParser {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "pdf")
    }

    fn parse_pages(&self, path: &Path) -> Result<Vec<String>> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let data = std::fs::read(path)?;

        let pages = extract_pages(&filename, &data)?;
        let pages: Vec<String> = pages.iter().map(|p| cleanup_pdf_text(p)).collect();

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }
        Ok(pages)
    }
}

#[cfg(feature = "pdf")]
fn extract_pages(filename: &str, data: &[u8]) -> Result<Vec<String>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                tracing::debug!(file = %filename, page = page_num, error = %e, "Could not extract page text");
                pages.push(String::new());
            }
        }
    }

    if pages.iter().any(|p| !p.trim().is_empty()) {
        return Ok(pages);
    }

    tracing::warn!(file = %filename, "lopdf found no text, trying pdf-extract");
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::file_parse(filename, format!("pdf-extract failed: {}", e)))?;
    Ok(vec![text])
}

#[cfg(not(feature = "pdf"))]
fn extract_pages(_filename: &str, _data: &[u8]) -> Result<Vec<String>> {
    Err(Error::DependencyMissing(
        "PDF support is not compiled in; rebuild with the `pdf` feature".to_string(),
    ))
}
