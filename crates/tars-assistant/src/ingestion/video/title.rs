//! Best-effort video title lookup

use serde::Deserialize;
use std::sync::Arc;

use super::reference::VideoReference;
use crate::error::{Error, Result};
use crate::http::PageFetcher;
use crate::ingestion::html;
use crate::types::SourceType;

const PAGE_SUFFIX: &str = " - YouTube";

#[derive(Debug, Deserialize)]
struct NoembedResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Resolves a title from the oEmbed endpoint, then the watch page, then a
/// placeholder. Never fails.
pub struct VideoTitleResolver {
    fetcher: Arc<dyn PageFetcher>,
    noembed_url: String,
}

impl VideoTitleResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, noembed_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            noembed_url: noembed_url.into(),
        }
    }

    pub async fn resolve(&self, reference: &VideoReference) -> String {
        match self.from_noembed(reference).await {
            Ok(title) => return title,
            Err(e) => tracing::debug!(video_id = %reference.video_id, error = %e, "noembed title lookup failed"),
        }

        match self.from_watch_page(reference).await {
            Ok(title) => return title,
            Err(e) => tracing::debug!(video_id = %reference.video_id, error = %e, "Watch page title lookup failed"),
        }

        tracing::warn!(video_id = %reference.video_id, "Could not resolve video title");
        SourceType::Video.display_name().to_string()
    }

    async fn from_noembed(&self, reference: &VideoReference) -> Result<String> {
        let url = reqwest::Url::parse_with_params(&self.noembed_url, &[("url", reference.watch_url())])
            .map_err(|e| Error::Config(format!("Invalid noembed URL: {}", e)))?;

        let raw = self.fetcher.get_text(url.as_str()).await?;
        let response: NoembedResponse = serde_json::from_str(&raw)?;

        if let Some(error) = response.error {
            return Err(Error::upstream(error));
        }
        response
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::upstream("noembed response has no title"))
    }

    async fn from_watch_page(&self, reference: &VideoReference) -> Result<String> {
        let page = self.fetcher.get_text(&reference.watch_url()).await?;
        html::extract_title(&page)
            .map(|t| t.replace(PAGE_SUFFIX, "").trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::upstream("Watch page has no usable <title>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;

    const NOEMBED: &str = "https://noembed.com/embed";

    fn reference() -> VideoReference {
        VideoReference::parse("https://youtu.be/abc123").unwrap()
    }

    #[tokio::test]
    async fn test_noembed_title() {
        let fetcher = Arc::new(StubFetcher::default().route(NOEMBED, r#"{"title":"Rust in 100 Seconds"}"#));
        let resolver = VideoTitleResolver::new(fetcher.clone(), NOEMBED);

        assert_eq!(resolver.resolve(&reference()).await, "Rust in 100 Seconds");
        assert_eq!(
            fetcher.requested(),
            vec!["https://noembed.com/embed?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc123"]
        );
    }

    #[tokio::test]
    async fn test_watch_page_fallback() {
        let fetcher = Arc::new(
            StubFetcher::default()
                .route(NOEMBED, r#"{"error":"401 Unauthorized"}"#)
                .route(
                    "https://www.youtube.com/watch",
                    "<html><head><title>Borrow Checker Explained - YouTube</title></head></html>",
                ),
        );
        let resolver = VideoTitleResolver::new(fetcher, NOEMBED);

        assert_eq!(resolver.resolve(&reference()).await, "Borrow Checker Explained");
    }

    #[tokio::test]
    async fn test_placeholder_when_everything_fails() {
        let fetcher = Arc::new(StubFetcher::default().route(NOEMBED, "not json"));
        let resolver = VideoTitleResolver::new(fetcher.clone(), NOEMBED);

        assert_eq!(resolver.resolve(&reference()).await, "YouTube Video");
        assert_eq!(fetcher.requested().len(), 2);
    }
}
