//! Transcript tracks, language negotiation and formatting

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::ProxyEndpoint;

/// Language groups tried in order; within a group codes are tried in order
const PREFERRED_LANGUAGES: &[&[&str]] = &[&["pt", "pt-BR"], &["en"]];

/// One caption track advertised for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTrack {
    /// BCP-47-ish code as YouTube reports it (`en`, `pt-BR`)
    pub language_code: String,
    /// Human-readable language name
    pub language: String,
    /// Auto-generated (ASR) track
    pub is_generated: bool,
    /// Timedtext URL
    pub base_url: String,
}

/// One caption cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    /// Offset in seconds
    pub start: f64,
    /// Length in seconds
    pub duration: f64,
}

/// All tracks of a video in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptList {
    pub video_id: String,
    pub tracks: Vec<TranscriptTrack>,
}

impl TranscriptList {
    pub fn new(video_id: impl Into<String>, tracks: Vec<TranscriptTrack>) -> Self {
        Self {
            video_id: video_id.into(),
            tracks,
        }
    }

    /// First track matching one of `codes`, trying codes in order and
    /// preferring a manual track over a generated one for each code
    pub fn find(&self, codes: &[&str]) -> Option<&TranscriptTrack> {
        codes.iter().find_map(|code| {
            let mut matching = self.tracks.iter().filter(|t| t.language_code == *code);
            let manual = matching.clone().find(|t| !t.is_generated);
            manual.or_else(|| matching.find(|t| t.is_generated))
        })
    }

    /// Portuguese, then English, then whatever comes first
    pub fn negotiate(&self) -> Option<&TranscriptTrack> {
        PREFERRED_LANGUAGES
            .iter()
            .find_map(|codes| self.find(codes))
            .or_else(|| self.tracks.first())
    }
}

/// Lists and downloads caption tracks
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List the caption tracks of a video
    async fn list_transcripts(
        &self,
        video_id: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<TranscriptList>;

    /// Download one track as timed entries
    async fn fetch_track(
        &self,
        track: &TranscriptTrack,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Vec<TranscriptEntry>>;
}

/// `mm:ss` with sub-second precision truncated. Negative and NaN offsets
/// render as `00:00`; minutes are not wrapped past 99.
pub fn format_timestamp(start: f64) -> String {
    let seconds = if start.is_finite() && start > 0.0 {
        start.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One `[mm:ss] text` line per non-blank entry, ordered by start time.
///
/// Ties keep their original order. Line breaks inside a cue become spaces.
pub fn format_transcript(entries: &[TranscriptEntry]) -> String {
    let mut ordered: Vec<&TranscriptEntry> = entries
        .iter()
        .filter(|e| !e.text.trim().is_empty())
        .collect();
    ordered.sort_by(|a, b| sort_key(a.start).total_cmp(&sort_key(b.start)));

    ordered
        .iter()
        .map(|entry| {
            let text = entry.text.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("[{}] {}", format_timestamp(entry.start), text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sort_key(start: f64) -> f64 {
    if start.is_nan() {
        0.0
    } else {
        start.max(0.0)
    }
}
