//! Third-party transcript relay

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::http::{build_client, HttpOptions, ProxyEndpoint};
use crate::ingestion::html;

/// A service that returns an already-assembled transcript for a video URL
#[async_trait]
pub trait TranscriptRelay: Send + Sync {
    async fn fetch_transcript(&self, video_url: &str, proxy: Option<&ProxyEndpoint>)
        -> Result<String>;
}

/// Relay answering `GET {endpoint}?url=<video url>` with an HTML page whose
/// `div.transcript` holds the text
pub struct RelayTranscriptClient {
    endpoint: String,
    options: HttpOptions,
}

impl RelayTranscriptClient {
    pub fn new(endpoint: impl Into<String>, options: HttpOptions) -> Self {
        Self {
            endpoint: endpoint.into(),
            options,
        }
    }
}

#[async_trait]
impl TranscriptRelay for RelayTranscriptClient {
    async fn fetch_transcript(
        &self,
        video_url: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<String> {
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("url", video_url)])
            .map_err(|e| Error::Config(format!("Invalid relay URL '{}': {}", self.endpoint, e)))?;

        let client = build_client(&self.options, proxy)?;
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!("Relay returned HTTP {}", status)));
        }

        parse_relay_page(&response.text().await?)
    }
}

fn parse_relay_page(page: &str) -> Result<String> {
    html::extract_element_text(page, "div.transcript")?
        .ok_or_else(|| Error::upstream("Relay page has no transcript"))
}
