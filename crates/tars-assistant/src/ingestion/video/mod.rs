//! YouTube transcript loader
//!
//! Resolves a video URL, then walks an ordered strategy chain (direct,
//! proxy rotation, relay) until one yields a transcript. The title is looked
//! up concurrently and never fails the load.

pub mod proxy;
pub mod reference;
pub mod relay;
pub mod strategy;
pub mod title;
pub mod transcript;
pub mod youtube;

pub use proxy::ProxyPool;
pub use reference::{normalize_reference, resolve_video_id, VideoReference};
pub use relay::{RelayTranscriptClient, TranscriptRelay};
pub use strategy::{
    acquire_transcript, AcquiredTranscript, AttemptFailure, DirectStrategy, ProxyRotationStrategy,
    RelayStrategy, StrategyKind, TranscriptStrategy,
};
pub use title::VideoTitleResolver;
pub use transcript::{
    format_timestamp, format_transcript, TranscriptEntry, TranscriptList, TranscriptProvider,
    TranscriptTrack,
};
pub use youtube::YouTubeTranscriptClient;

use std::sync::Arc;
use std::time::Duration;

use crate::config::VideoConfig;
use crate::error::{Error, Result};
use crate::http::{HttpOptions, HttpPageFetcher};
use crate::types::{NormalizedDocument, SourceType};

/// Loads a YouTube video transcript into a [`NormalizedDocument`]
pub struct VideoTranscriptLoader {
    strategies: Vec<Arc<dyn TranscriptStrategy>>,
    titles: VideoTitleResolver,
    default_url: Option<String>,
}

impl VideoTranscriptLoader {
    pub fn new(
        strategies: Vec<Arc<dyn TranscriptStrategy>>,
        titles: VideoTitleResolver,
        default_url: Option<String>,
    ) -> Self {
        Self {
            strategies,
            titles,
            default_url,
        }
    }

    /// Build the canonical chain: direct, then proxy rotation when proxies
    /// are configured, then the relay when one is configured
    pub fn from_config(config: &VideoConfig, options: &HttpOptions) -> Result<Self> {
        let provider: Arc<dyn TranscriptProvider> =
            Arc::new(YouTubeTranscriptClient::new(options.clone())?);
        let pool = ProxyPool::from_urls(config.proxies.as_slice());

        let mut strategies: Vec<Arc<dyn TranscriptStrategy>> =
            vec![Arc::new(DirectStrategy::new(provider.clone()))];

        if !pool.is_empty() {
            strategies.push(Arc::new(ProxyRotationStrategy::new(
                provider,
                pool.clone(),
                config.proxy_delay(),
            )));
        }

        if let Some(relay_url) = &config.relay_url {
            let relay = RelayTranscriptClient::new(
                relay_url.clone(),
                options
                    .clone()
                    .with_timeout(Duration::from_secs(config.relay_timeout_secs)),
            );
            let relay_proxies = (config.relay_via_proxy && !pool.is_empty()).then(|| pool.clone());
            strategies.push(Arc::new(RelayStrategy::new(Arc::new(relay), relay_proxies)));
        }

        let title_fetcher = HttpPageFetcher::new(
            &options
                .clone()
                .with_timeout(Duration::from_secs(config.title_timeout_secs)),
        )?;
        let titles = VideoTitleResolver::new(Arc::new(title_fetcher), config.noembed_url.clone());

        tracing::debug!(
            strategies = strategies.len(),
            proxies = pool.len(),
            "Video transcript loader ready"
        );

        Ok(Self::new(strategies, titles, config.default_url.clone()))
    }

    /// Load the transcript of `reference` (or the configured default).
    /// Never fails: errors become error-kind documents.
    pub async fn load(&self, reference: Option<&str>) -> NormalizedDocument {
        let raw = match reference
            .filter(|r| !r.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.default_url.clone())
        {
            Some(raw) => raw,
            None => {
                return NormalizedDocument::failure(
                    SourceType::Video,
                    None,
                    "URL not provided",
                    &Error::input("A valid URL is required to load a YouTube video."),
                );
            }
        };

        let target = match VideoReference::parse(&raw) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(url = %raw.trim(), "Unrecognized YouTube URL");
                return NormalizedDocument::failure(
                    SourceType::Video,
                    Some(normalize_reference(&raw)),
                    "Load failed",
                    &e,
                );
            }
        };

        let (acquired, title) = tokio::join!(
            acquire_transcript(&self.strategies, &target),
            self.titles.resolve(&target)
        );

        match acquired {
            Ok(transcript) => {
                tracing::info!(
                    video_id = %target.video_id,
                    strategy = %transcript.strategy,
                    title = %title,
                    "Loaded YouTube video"
                );
                NormalizedDocument::new(SourceType::Video, Some(target.url), title, transcript.text)
            }
            Err(failures) => {
                tracing::error!(
                    video_id = %target.video_id,
                    attempts = failures.len(),
                    "No transcript strategy succeeded"
                );
                let body = exhaustion_report(&target, &failures);
                NormalizedDocument::source_error(SourceType::Video, Some(target.url), title, body)
            }
        }
    }
}

fn exhaustion_report(target: &VideoReference, failures: &[AttemptFailure]) -> String {
    let mut report = format!(
        "No transcript is available for this video. It may have no captions, \
         the channel may have disabled them, or YouTube refused the connection.\n\n\
         Video ID: {}\nURL: {}\n\nAttempts:",
        target.video_id, target.url
    );
    for failure in failures {
        report.push_str(&format!("\n- {}: {}", failure.strategy, failure.detail));
    }
    report
}
