//! Web page loader

use std::sync::Arc;

use crate::config::WebConfig;
use crate::error::{Error, Result};
use crate::http::{with_default_scheme, HttpOptions, HttpPageFetcher, PageFetcher};
use crate::types::{NormalizedDocument, SourceType};

use super::html;

const DEFAULT_TITLE: &str = "Web Site";

/// Loads a web page into a [`NormalizedDocument`]
pub struct WebLoader {
    fetcher: Arc<dyn PageFetcher>,
    default_url: Option<String>,
}

impl WebLoader {
    pub fn new(fetcher: Arc<dyn PageFetcher>, default_url: Option<String>) -> Self {
        Self {
            fetcher,
            default_url,
        }
    }

    /// Build a loader with a real HTTP client
    pub fn from_config(config: &WebConfig, options: &HttpOptions) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpPageFetcher::new(options)?),
            config.default_url.clone(),
        ))
    }

    /// Load `url` (or the configured default). Never fails: errors become
    /// error-kind documents.
    pub async fn load(&self, url: Option<&str>) -> NormalizedDocument {
        let url = match url
            .filter(|u| !u.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.default_url.clone())
        {
            Some(url) => with_default_scheme(&url),
            None => {
                return NormalizedDocument::failure(
                    SourceType::Web,
                    None,
                    "URL not provided",
                    &Error::input("A valid URL is required to load a web site."),
                );
            }
        };

        match self.fetch(&url).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to load web site");
                NormalizedDocument::source_error(
                    SourceType::Web,
                    Some(url),
                    "Load failed",
                    format!("Could not load the site content: {}", e),
                )
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<NormalizedDocument> {
        let page = self.fetcher.get_text(url).await?;

        let body = html::extract_text_segments(&page).join("\n");
        if body.is_empty() {
            tracing::warn!(url = %url, "Page has no visible text");
        }

        let title = html::extract_title(&page).unwrap_or_else(|| {
            tracing::debug!(url = %url, "No <title> found, using generic title");
            DEFAULT_TITLE.to_string()
        });

        tracing::info!(url = %url, title = %title, chars = body.len(), "Loaded web site");

        Ok(NormalizedDocument::new(
            SourceType::Web,
            Some(url.to_string()),
            title,
            body,
        ))
    }
}
