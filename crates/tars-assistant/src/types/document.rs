//! Normalized document produced by every source loader

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Which loader a document came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Web page
    Web,
    /// YouTube video transcript
    Video,
    /// PDF document batch
    Document,
    /// Image described by the vision model
    Image,
}

impl SourceType {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Web => "Web Site",
            Self::Video => "YouTube Video",
            Self::Document => "PDF Documents",
            Self::Image => "Image",
        }
    }
}

/// Discriminant of a [`NormalizedDocument`]
///
/// Callers decide success/failure styling from this tag only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "source")]
pub enum SourceKind {
    Web,
    Video,
    Document,
    Image,
    FreeChat,
    /// A parsing or transcript backend is unavailable
    DependencyError,
    /// Loading failed for the given source
    SourceError(SourceType),
}

impl SourceKind {
    /// Successful kind for a source type
    pub fn success(source: SourceType) -> Self {
        match source {
            SourceType::Web => Self::Web,
            SourceType::Video => Self::Video,
            SourceType::Document => Self::Document,
            SourceType::Image => Self::Image,
        }
    }

    /// Whether this kind marks a failed load
    pub fn is_error(&self) -> bool {
        matches!(self, Self::DependencyError | Self::SourceError(_))
    }

    /// Get display name
    pub fn display_name(&self) -> String {
        match self {
            Self::Web => SourceType::Web.display_name().to_string(),
            Self::Video => SourceType::Video.display_name().to_string(),
            Self::Document => SourceType::Document.display_name().to_string(),
            Self::Image => SourceType::Image.display_name().to_string(),
            Self::FreeChat => "Free Chat".to_string(),
            Self::DependencyError => "Dependency Error".to_string(),
            Self::SourceError(source) => format!("{} (error)", source.display_name()),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// The single output contract of every loader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedDocument {
    /// Success or error discriminant
    pub source_kind: SourceKind,
    /// Where the content came from (`None` for uploads and local files)
    pub origin_url: Option<String>,
    /// Human-readable label
    pub title: String,
    /// Grounding text handed to the generation endpoint
    pub body: String,
}

impl NormalizedDocument {
    /// Create a successful document
    pub fn new(
        source: SourceType,
        origin_url: Option<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            source_kind: SourceKind::success(source),
            origin_url,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Document used when the user chats without a source
    pub fn free_chat() -> Self {
        Self {
            source_kind: SourceKind::FreeChat,
            origin_url: None,
            title: "Conversation without additional context".to_string(),
            body: String::new(),
        }
    }

    /// Error-kind document with an explicit diagnostic body
    pub fn source_error(
        source: SourceType,
        origin_url: Option<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            source_kind: SourceKind::SourceError(source),
            origin_url,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Convert a fault into an error-kind document
    ///
    /// Missing backends map to `DependencyError`, everything else to
    /// `SourceError(source)`.
    pub fn failure(
        source: SourceType,
        origin_url: Option<String>,
        title: impl Into<String>,
        err: &Error,
    ) -> Self {
        let source_kind = if err.is_dependency_missing() {
            SourceKind::DependencyError
        } else {
            SourceKind::SourceError(source)
        };

        Self {
            source_kind,
            origin_url,
            title: title.into(),
            body: err.to_string(),
        }
    }

    /// Whether this document records a failed load
    pub fn is_error(&self) -> bool {
        self.source_kind.is_error()
    }
}
