//! Error types for source loading and generation

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Assistant errors
///
/// Loaders never let these escape their public `load` methods; they are folded
/// into an error-kind [`NormalizedDocument`](crate::types::NormalizedDocument)
/// at the boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A parsing or transcript backend is not compiled in
    #[error("Dependency not available: {0}")]
    DependencyMissing(String),

    /// Empty or malformed input (URL, image payload, file list)
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// Video URL did not match any recognized shape
    #[error("Could not extract a video ID from '{0}'")]
    InvalidReference(String),

    /// Network or provider fault
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Generation or vision endpoint error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputInvalid(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error means a backend is missing rather than the input being bad
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::DependencyMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidReference("https://vimeo.com/1".to_string());
        assert!(err.to_string().contains("vimeo.com/1"));

        let err = Error::file_parse("a.pdf", "broken xref");
        assert_eq!(err.to_string(), "Failed to parse file 'a.pdf': broken xref");
    }

    #[test]
    fn test_dependency_missing() {
        assert!(Error::DependencyMissing("pdf".into()).is_dependency_missing());
        assert!(!Error::upstream("timeout").is_dependency_missing());
    }
}
