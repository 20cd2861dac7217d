//! YouTube caption client (InnerTube player API + timedtext)

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;

use super::transcript::{TranscriptEntry, TranscriptList, TranscriptProvider, TranscriptTrack};
use crate::error::{Error, Result};
use crate::http::{build_client, HttpOptions, ProxyEndpoint};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

fn api_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("Invalid regex")
    })
}

fn consent_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("Invalid regex"))
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

/// Caption client talking to youtube.com
///
/// The direct client is built once; proxied clients are built per call so
/// the proxy never outlives the attempt that asked for it.
pub struct YouTubeTranscriptClient {
    options: HttpOptions,
    direct: Client,
}

impl YouTubeTranscriptClient {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let direct = build_client(&options, None)?;
        Ok(Self { options, direct })
    }

    fn client(&self, proxy: Option<&ProxyEndpoint>) -> Result<Client> {
        match proxy {
            Some(proxy) => build_client(&self.options, Some(proxy)),
            None => Ok(self.direct.clone()),
        }
    }

    async fn get_html(&self, client: &Client, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = client.get(url).header("Accept-Language", "en-US");
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!("GET {} returned HTTP {}", url, status)));
        }
        Ok(response.text().await?)
    }

    /// Watch page HTML, accepting the EU consent interstitial once if shown
    async fn fetch_watch_page(&self, client: &Client, video_id: &str) -> Result<String> {
        let url = format!("{}{}", WATCH_URL, video_id);
        let html = self.get_html(client, &url, None).await?;

        if !html.contains("action=\"https://consent.youtube.com/s\"") {
            return Ok(html);
        }

        let value = consent_value_pattern()
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::upstream("Failed to accept the YouTube consent page"))?;

        tracing::debug!(video_id = %video_id, "Accepting YouTube consent page");
        let html = self
            .get_html(client, &url, Some(&format!("CONSENT=YES+{}", value)))
            .await?;

        if html.contains("action=\"https://consent.youtube.com/s\"") {
            return Err(Error::upstream("YouTube consent page could not be bypassed"));
        }
        Ok(html)
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeTranscriptClient {
    async fn list_transcripts(
        &self,
        video_id: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<TranscriptList> {
        let client = self.client(proxy)?;
        let html = self.fetch_watch_page(&client, video_id).await?;
        let api_key = extract_api_key(&html)?;

        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = client
            .post(format!("{}{}", PLAYER_URL, api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!(
                "InnerTube player request returned HTTP {}",
                status
            )));
        }

        let player: PlayerResponse = response.json().await?;
        parse_player_response(video_id, player)
    }

    async fn fetch_track(
        &self,
        track: &TranscriptTrack,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Vec<TranscriptEntry>> {
        let client = self.client(proxy)?;
        let xml = self.get_html(&client, &track.base_url, None).await?;
        parse_timedtext(&xml)
    }
}

fn extract_api_key(html: &str) -> Result<String> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(Error::upstream(
            "YouTube is asking for a captcha; too many requests from this IP",
        ));
    }

    api_key_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::upstream("InnerTube API key not found in the watch page"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer", default)]
    tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    name: Option<TrackName>,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        self.simple_text
            .clone()
            .or_else(|| self.runs.first().map(|run| run.text.clone()))
    }
}

/// Turn a player response into a track list: manual tracks first, then
/// generated ones, each group in the order YouTube reports them
fn parse_player_response(video_id: &str, player: PlayerResponse) -> Result<TranscriptList> {
    if let Some(playability) = &player.playability_status {
        let status = playability.status.as_deref().unwrap_or("OK");
        if status != "OK" {
            let reason = playability.reason.as_deref().unwrap_or("no reason given");
            return Err(Error::upstream(format!(
                "Video {} is not playable ({}): {}",
                video_id, status, reason
            )));
        }
    }

    let caption_tracks = player
        .captions
        .and_then(|c| c.tracklist)
        .map(|t| t.caption_tracks)
        .unwrap_or_default();

    if caption_tracks.is_empty() {
        return Err(Error::upstream(format!(
            "Transcripts are disabled for video {}",
            video_id
        )));
    }

    let (manual, generated): (Vec<_>, Vec<_>) = caption_tracks
        .into_iter()
        .map(|track| TranscriptTrack {
            language: track
                .name
                .as_ref()
                .and_then(TrackName::text)
                .unwrap_or_else(|| track.language_code.clone()),
            is_generated: track.kind.as_deref() == Some("asr"),
            base_url: track.base_url.replace("&fmt=srv3", ""),
            language_code: track.language_code,
        })
        .partition(|track| !track.is_generated);

    Ok(TranscriptList::new(
        video_id,
        manual.into_iter().chain(generated).collect(),
    ))
}

/// Cue under construction
struct OpenCue {
    start: f64,
    duration: f64,
    text: String,
}

/// Parse classic timedtext (`<text start dur>`, seconds) or srv3
/// (`<p t d>`, milliseconds) into entries
fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut open: Option<OpenCue> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(cue) = open_cue(&e)? {
                    open = Some(cue);
                }
            }
            Ok(Event::Empty(e)) => {
                // Self-closing cues carry no text
                open_cue(&e)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(cue) = open.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::upstream(format!("Malformed transcript text: {}", e)))?;
                    cue.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                if matches!(e.name().as_ref(), b"text" | b"p") {
                    if let Some(cue) = open.take() {
                        entries.push(TranscriptEntry {
                            text: clean_cue_text(&cue.text),
                            start: cue.start,
                            duration: cue.duration,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::upstream(format!(
                    "Malformed transcript XML at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn open_cue(e: &BytesStart<'_>) -> Result<Option<OpenCue>> {
    let (start_attr, dur_attr, scale) = match e.name().as_ref() {
        b"text" => (b"start".as_slice(), b"dur".as_slice(), 1.0),
        b"p" => (b"t".as_slice(), b"d".as_slice(), 1000.0),
        _ => return Ok(None),
    };

    Ok(Some(OpenCue {
        start: numeric_attr(e, start_attr)? / scale,
        duration: numeric_attr(e, dur_attr)? / scale,
        text: String::new(),
    }))
}

/// Numeric attribute, `0` when absent or unparseable
fn numeric_attr(e: &BytesStart<'_>, name: &[u8]) -> Result<f64> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| Error::upstream(format!("Malformed transcript attribute: {}", err)))?;

    Ok(attr
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().parse::<f64>().unwrap_or(0.0)))
        .unwrap_or(0.0))
}

/// Cue text arrives HTML-escaped a second time and may carry `<i>`/`<b>`
fn clean_cue_text(raw: &str) -> String {
    let unescaped = quick_xml::escape::unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    markup_pattern().replace_all(&unescaped, "").trim().to_string()
}
