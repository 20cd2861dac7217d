//! YouTube URL parsing

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Shapes a video URL may take, first match wins:
/// `youtube.com/watch?...v=ID`, `m.youtube.com/...?v=ID`, `youtu.be/ID`,
/// `youtube.com/shorts/ID`, `youtube.com/embed/ID`, `youtube.com/live/ID`
fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?(?:[^#]*&)?v=|m\.youtube\.com/[^#]*[?&]v=|youtu\.be/|youtube\.com/(?:shorts|embed|live)/)([A-Za-z0-9_-]+)",
        )
        .expect("Invalid regex")
    })
}

/// A resolved video: its identifier and the URL reported back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    pub video_id: String,
    pub url: String,
}

impl VideoReference {
    /// Resolve a user-supplied URL. Pure: no network involved.
    pub fn parse(raw: &str) -> Result<Self> {
        let video_id = resolve_video_id(raw)?;
        Ok(Self {
            video_id,
            url: normalize_reference(raw),
        })
    }

    /// Canonical desktop watch page
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Extract the video identifier from any recognized URL shape
pub fn resolve_video_id(raw: &str) -> Result<String> {
    let raw = raw.trim();
    video_id_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidReference(raw.to_string()))
}

/// Trim the input and drop extra query parameters from `youtube.com` URLs.
/// The `v=` parameter survives wherever it sits in the query.
pub fn normalize_reference(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.contains("youtube.com") {
        return raw.to_string();
    }

    let Some((base, query)) = raw.split_once('?') else {
        return raw.to_string();
    };
    let query = query.split('#').next().unwrap_or_default();
    let mut params = query.split('&');

    match query.split('&').find(|p| p.starts_with("v=")) {
        Some(video) => format!("{}?{}", base, video),
        None => match params.next().filter(|p| !p.is_empty()) {
            Some(first) => format!("{}?{}", base, first),
            None => base.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_every_shape() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ"),
            ("youtube.com/watch?feature=share&v=abc_DEF-123", "abc_DEF-123"),
            ("https://youtu.be/dQw4w9WgXcQ?si=xyz", "dQw4w9WgXcQ"),
            ("https://m.youtube.com/watch?v=mobile123&list=PL1", "mobile123"),
            ("https://www.youtube.com/shorts/Sh0rtID", "Sh0rtID"),
            ("https://www.youtube.com/embed/EmB3d?autoplay=1", "EmB3d"),
            ("https://www.youtube.com/live/L1veStream", "L1veStream"),
            ("  https://youtu.be/padded  ", "padded"),
        ];

        for (url, expected) in cases {
            assert_eq!(resolve_video_id(url).unwrap(), expected, "url: {}", url);
        }
    }

    #[test]
    fn test_unrecognized_shapes() {
        for url in [
            "https://vimeo.com/12345",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/channel/UC123",
            "not a url",
            "",
        ] {
            let err = resolve_video_id(url).unwrap_err();
            assert!(matches!(err, Error::InvalidReference(_)), "url: {}", url);
        }
    }

    #[test]
    fn test_normalize_strips_youtube_params_only() {
        assert_eq!(
            normalize_reference("https://www.youtube.com/watch?v=abc&t=10s&list=x"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            normalize_reference("https://youtu.be/abc?si=1&t=2"),
            "https://youtu.be/abc?si=1&t=2"
        );
        assert_eq!(
            normalize_reference("https://www.youtube.com/embed/abc?autoplay=1&mute=1"),
            "https://www.youtube.com/embed/abc?autoplay=1"
        );
    }

    #[test]
    fn test_video_param_after_other_params_is_kept() {
        let reference =
            VideoReference::parse("https://www.youtube.com/watch?feature=share&v=abc123&t=9s").unwrap();
        assert_eq!(reference.video_id, "abc123");
        assert_eq!(reference.url, "https://www.youtube.com/watch?v=abc123");

        assert_eq!(
            normalize_reference("https://m.youtube.com/watch?app=desktop&v=xyz#t=3"),
            "https://m.youtube.com/watch?v=xyz"
        );
    }

    #[test]
    fn test_reference_parse() {
        let reference = VideoReference::parse("https://m.youtube.com/watch?v=xyz&feature=share").unwrap();
        assert_eq!(reference.video_id, "xyz");
        assert_eq!(reference.url, "https://m.youtube.com/watch?v=xyz");
        assert_eq!(reference.watch_url(), "https://www.youtube.com/watch?v=xyz");
    }
}
