//! Source ingestion: every loader turns one external source into a
//! [`NormalizedDocument`]

pub mod document;
pub mod html;
pub mod image;
pub mod pdf;
pub mod video;
pub mod web;

pub use document::{BatchReport, DocumentLoader, DocumentParser, SkippedFile};
pub use self::image::{ImageInfo, ImageLoader};
pub use pdf::PdfParser;
pub use video::VideoTranscriptLoader;
pub use web::WebLoader;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TarsConfig;
use crate::error::Result;
use crate::providers::VisionProvider;
use crate::types::NormalizedDocument;

/// What the user asked to load
#[derive(Debug, Clone)]
pub enum SourceRequest {
    /// Page URL, or the configured default
    Web(Option<String>),
    /// Video URL, or the configured default
    Video(Option<String>),
    /// Explicit files, or a scan of the documents folder
    Documents(Option<Vec<PathBuf>>),
    /// Raw image bytes
    Image(Vec<u8>),
    /// No source at all
    FreeChat,
}

impl SourceRequest {
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Web(_) => "web",
            Self::Video(_) => "video",
            Self::Documents(_) => "documents",
            Self::Image(_) => "image",
            Self::FreeChat => "free chat",
        }
    }
}

/// Routes a [`SourceRequest`] to its loader
pub struct Ingestor {
    web: WebLoader,
    video: VideoTranscriptLoader,
    documents: DocumentLoader,
    image: ImageLoader,
}

impl Ingestor {
    pub fn new(
        web: WebLoader,
        video: VideoTranscriptLoader,
        documents: DocumentLoader,
        image: ImageLoader,
    ) -> Self {
        Self {
            web,
            video,
            documents,
            image,
        }
    }

    /// Wire every loader from configuration
    pub fn from_config(config: &TarsConfig, vision: Arc<dyn VisionProvider>) -> Result<Self> {
        let options = config.http_options();

        Ok(Self::new(
            WebLoader::from_config(&config.web, &options)?,
            VideoTranscriptLoader::from_config(&config.video, &options)?,
            DocumentLoader::from_config(&config.documents),
            ImageLoader::new(vision, config.vision.instruction.clone()),
        ))
    }

    /// Load a source. Never fails: errors become error-kind documents.
    pub async fn load(&self, request: SourceRequest) -> NormalizedDocument {
        tracing::info!(source = request.source_name(), "Loading source");

        let document = match request {
            SourceRequest::Web(url) => self.web.load(url.as_deref()).await,
            SourceRequest::Video(url) => self.video.load(url.as_deref()).await,
            SourceRequest::Documents(paths) => self.documents.load(paths).await,
            SourceRequest::Image(bytes) => self.image.load(&bytes).await,
            SourceRequest::FreeChat => NormalizedDocument::free_chat(),
        };

        if document.is_error() {
            tracing::warn!(kind = %document.source_kind, title = %document.title, "Source load failed");
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;
    use crate::providers::vision::MockVisionProvider;
    use crate::types::{SourceKind, SourceType};
    use std::time::Duration;

    fn ingestor(vision: MockVisionProvider, docs_dir: PathBuf) -> Ingestor {
        let fetcher = Arc::new(
            StubFetcher::default().route("https://example.com", "<title>Example</title><p>Hi</p>"),
        );
        let titles = video::VideoTitleResolver::new(fetcher.clone(), "https://noembed.com/embed");

        Ingestor::new(
            WebLoader::new(fetcher, None),
            VideoTranscriptLoader::new(Vec::new(), titles, None),
            DocumentLoader::new(Arc::new(PdfParser::new()), docs_dir, Duration::from_secs(5)),
            ImageLoader::new(Arc::new(vision), "Describe it"),
        )
    }

    #[tokio::test]
    async fn test_dispatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut vision = MockVisionProvider::new();
        vision.expect_describe().times(0);
        let ingestor = ingestor(vision, dir.path().to_path_buf());

        let doc = ingestor.load(SourceRequest::FreeChat).await;
        assert_eq!(doc.source_kind, SourceKind::FreeChat);

        let doc = ingestor.load(SourceRequest::Web(Some("example.com".into()))).await;
        assert_eq!(doc.source_kind, SourceKind::Web);
        assert_eq!(doc.title, "Example");

        let doc = ingestor.load(SourceRequest::Video(Some("https://vimeo.com/1".into()))).await;
        assert_eq!(doc.source_kind, SourceKind::SourceError(SourceType::Video));

        let doc = ingestor.load(SourceRequest::Image(b"GIF89a?".to_vec())).await;
        assert_eq!(doc.source_kind, SourceKind::SourceError(SourceType::Image));

        let doc = ingestor.load(SourceRequest::Documents(None)).await;
        assert!(doc.is_error());
    }

    #[test]
    fn test_source_names() {
        assert_eq!(SourceRequest::Image(Vec::new()).source_name(), "image");
        assert_eq!(SourceRequest::Documents(None).source_name(), "documents");
    }
}
