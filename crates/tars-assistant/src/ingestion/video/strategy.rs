//! Transcript acquisition strategies and the fallback driver

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::proxy::ProxyPool;
use super::reference::VideoReference;
use super::relay::TranscriptRelay;
use super::transcript::{format_transcript, TranscriptProvider};
use crate::error::{Error, Result};
use crate::http::ProxyEndpoint;

/// Which strategy produced an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Direct,
    ProxyRotation,
    Relay,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ProxyRotation => "proxy rotation",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy that did not produce a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub strategy: StrategyKind,
    pub detail: String,
}

/// Transcript text and the strategy that obtained it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredTranscript {
    pub strategy: StrategyKind,
    pub text: String,
}

/// One way of getting a transcript
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Formatted transcript text for the video
    async fn acquire(&self, target: &VideoReference) -> Result<String>;
}

/// Run `strategies` in order and stop at the first non-empty transcript
pub async fn acquire_transcript(
    strategies: &[Arc<dyn TranscriptStrategy>],
    target: &VideoReference,
) -> std::result::Result<AcquiredTranscript, Vec<AttemptFailure>> {
    let mut failures = Vec::new();

    for strategy in strategies {
        let kind = strategy.kind();
        tracing::debug!(video_id = %target.video_id, strategy = %kind, "Trying transcript strategy");

        let detail = match strategy.acquire(target).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(
                    video_id = %target.video_id,
                    strategy = %kind,
                    chars = text.len(),
                    "Transcript acquired"
                );
                return Ok(AcquiredTranscript { strategy: kind, text });
            }
            Ok(_) => "transcript was empty".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(video_id = %target.video_id, strategy = %kind, error = %detail, "Transcript strategy failed");
        failures.push(AttemptFailure {
            strategy: kind,
            detail,
        });
    }

    Err(failures)
}

/// List, negotiate a language, fetch and format one transcript
async fn fetch_preferred(
    provider: &dyn TranscriptProvider,
    video_id: &str,
    proxy: Option<&ProxyEndpoint>,
) -> Result<String> {
    let list = provider.list_transcripts(video_id, proxy).await?;
    let track = list
        .negotiate()
        .ok_or_else(|| Error::upstream(format!("No transcripts available for video {}", video_id)))?;

    tracing::debug!(
        video_id = %video_id,
        language = %track.language_code,
        generated = track.is_generated,
        "Selected transcript track"
    );

    let entries = provider.fetch_track(track, proxy).await?;
    let text = format_transcript(&entries);
    if text.is_empty() {
        return Err(Error::upstream(format!(
            "Transcript track '{}' has no text",
            track.language_code
        )));
    }
    Ok(text)
}

/// Talk to the provider without a proxy
pub struct DirectStrategy {
    provider: Arc<dyn TranscriptProvider>,
}

impl DirectStrategy {
    pub fn new(provider: Arc<dyn TranscriptProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TranscriptStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn acquire(&self, target: &VideoReference) -> Result<String> {
        fetch_preferred(self.provider.as_ref(), &target.video_id, None).await
    }
}

/// Retry the provider once per pooled proxy, in random order
pub struct ProxyRotationStrategy {
    provider: Arc<dyn TranscriptProvider>,
    pool: ProxyPool,
    delay: Duration,
}

impl ProxyRotationStrategy {
    pub fn new(provider: Arc<dyn TranscriptProvider>, pool: ProxyPool, delay: Duration) -> Self {
        Self {
            provider,
            pool,
            delay,
        }
    }
}

#[async_trait]
impl TranscriptStrategy for ProxyRotationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProxyRotation
    }

    async fn acquire(&self, target: &VideoReference) -> Result<String> {
        if self.pool.is_empty() {
            return Err(Error::Config("No proxies configured".to_string()));
        }

        let mut failures = Vec::new();
        for (i, proxy) in self.pool.shuffled().iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match fetch_preferred(self.provider.as_ref(), &target.video_id, Some(proxy)).await {
                Ok(text) => {
                    tracing::info!(video_id = %target.video_id, proxy = %proxy, "Transcript fetched through proxy");
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(video_id = %target.video_id, proxy = %proxy, error = %e, "Proxy attempt failed");
                    failures.push(format!("{}: {}", proxy, e));
                }
            }
        }

        Err(Error::upstream(format!(
            "all {} proxies failed ({})",
            failures.len(),
            failures.join("; ")
        )))
    }
}

/// Ask the relay for a ready-made transcript
pub struct RelayStrategy {
    relay: Arc<dyn TranscriptRelay>,
    /// Pool to draw one proxy from, when the relay should go through one
    proxies: Option<ProxyPool>,
}

impl RelayStrategy {
    pub fn new(relay: Arc<dyn TranscriptRelay>, proxies: Option<ProxyPool>) -> Self {
        Self { relay, proxies }
    }
}

#[async_trait]
impl TranscriptStrategy for RelayStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Relay
    }

    async fn acquire(&self, target: &VideoReference) -> Result<String> {
        let proxy = self.proxies.as_ref().and_then(ProxyPool::pick);
        let text = self.relay.fetch_transcript(&target.url, proxy.as_ref()).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::video::transcript::{TranscriptEntry, TranscriptList, TranscriptTrack};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Succeeds only through the proxy named `working_proxy` (or directly when `None`)
    struct ScriptedProvider {
        working_proxy: Option<&'static str>,
        direct_works: bool,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedProvider {
        fn new(direct_works: bool, working_proxy: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                working_proxy,
                direct_works,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TranscriptProvider for ScriptedProvider {
        async fn list_transcripts(
            &self,
            video_id: &str,
            proxy: Option<&ProxyEndpoint>,
        ) -> Result<TranscriptList> {
            self.seen.lock().unwrap().push(proxy.map(|p| p.url().to_string()));
            let ok = match proxy {
                None => self.direct_works,
                Some(p) => Some(p.url()) == self.working_proxy,
            };
            if !ok {
                return Err(Error::upstream("HTTP 429 Too Many Requests"));
            }
            Ok(TranscriptList::new(
                video_id,
                vec![TranscriptTrack {
                    language_code: "en".into(),
                    language: "English".into(),
                    is_generated: false,
                    base_url: "https://example.com/en".into(),
                }],
            ))
        }

        async fn fetch_track(
            &self,
            _track: &TranscriptTrack,
            _proxy: Option<&ProxyEndpoint>,
        ) -> Result<Vec<TranscriptEntry>> {
            Ok(vec![TranscriptEntry {
                text: "hello".into(),
                start: 61.0,
                duration: 2.0,
            }])
        }
    }

    struct CountingStrategy {
        kind: StrategyKind,
        result: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptStrategy for CountingStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn acquire(&self, _target: &VideoReference) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map(String::from)
                .ok_or_else(|| Error::upstream(format!("{} broke", self.kind)))
        }
    }

    fn counting(kind: StrategyKind, result: Option<&'static str>) -> Arc<CountingStrategy> {
        Arc::new(CountingStrategy {
            kind,
            result,
            calls: AtomicUsize::new(0),
        })
    }

    fn target() -> VideoReference {
        VideoReference::parse("https://youtu.be/vid42").unwrap()
    }

    #[tokio::test]
    async fn test_driver_short_circuits() {
        let direct = counting(StrategyKind::Direct, None);
        let proxied = counting(StrategyKind::ProxyRotation, Some("[00:00] hi"));
        let relay = counting(StrategyKind::Relay, Some("unused"));
        let chain: Vec<Arc<dyn TranscriptStrategy>> = vec![direct.clone(), proxied.clone(), relay.clone()];

        let acquired = acquire_transcript(&chain, &target()).await.unwrap();
        assert_eq!(acquired.strategy, StrategyKind::ProxyRotation);
        assert_eq!(acquired.text, "[00:00] hi");
        assert_eq!(direct.calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_driver_collects_failures() {
        let chain: Vec<Arc<dyn TranscriptStrategy>> = vec![
            counting(StrategyKind::Direct, None),
            counting(StrategyKind::Relay, Some("   ")),
        ];

        let failures = acquire_transcript(&chain, &target()).await.unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].strategy, StrategyKind::Direct);
        assert!(failures[0].detail.contains("direct broke"));
        assert_eq!(failures[1].detail, "transcript was empty");
    }

    #[tokio::test]
    async fn test_direct_strategy_formats_transcript() {
        let strategy = DirectStrategy::new(ScriptedProvider::new(true, None));
        assert_eq!(strategy.acquire(&target()).await.unwrap(), "[01:01] hello");
    }

    #[tokio::test]
    async fn test_proxy_rotation_tries_each_proxy_once() {
        let provider = ScriptedProvider::new(false, Some("http://good:8080"));
        let pool = ProxyPool::from_urls(&["http://bad1:8080", "http://good:8080", "http://bad2:8080"]);
        let strategy = ProxyRotationStrategy::new(provider.clone(), pool, Duration::ZERO);

        assert_eq!(strategy.acquire(&target()).await.unwrap(), "[01:01] hello");

        let seen = provider.seen.lock().unwrap().clone();
        assert!(seen.iter().all(Option::is_some));
        assert_eq!(seen.last().unwrap().as_deref(), Some("http://good:8080"));
        assert!(seen.len() <= 3);
    }

    #[tokio::test]
    async fn test_proxy_rotation_exhaustion() {
        let provider = ScriptedProvider::new(false, None);
        let pool = ProxyPool::from_urls(&["http://a:1", "http://b:2"]);
        let strategy = ProxyRotationStrategy::new(provider.clone(), pool, Duration::from_millis(1));

        let err = strategy.acquire(&target()).await.unwrap_err();
        assert!(err.to_string().contains("all 2 proxies failed"));
        assert_eq!(provider.seen.lock().unwrap().len(), 2);

        let empty = ProxyRotationStrategy::new(provider, ProxyPool::default(), Duration::ZERO);
        assert!(matches!(empty.acquire(&target()).await, Err(Error::Config(_))));
    }
}
