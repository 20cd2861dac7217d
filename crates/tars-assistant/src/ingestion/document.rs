//! Paginated document batch loader

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

use super::pdf::PdfParser;
use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use crate::types::{NormalizedDocument, SourceType};

/// Extracts page texts from one kind of paginated file.
///
/// Parsing is synchronous; the loader runs it on the blocking pool.
pub trait DocumentParser: Send + Sync {
    /// Lower-case extensions this parser accepts
    fn extensions(&self) -> &[&'static str];

    /// Whether the backend is compiled in
    fn is_available(&self) -> bool;

    /// One string per page, in page order
    fn parse_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// A file left out of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a batch load
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub document: NormalizedDocument,
    /// File names that made it into the document, in input order
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchReport {
    fn failed(document: NormalizedDocument, skipped: Vec<SkippedFile>) -> Self {
        Self {
            document,
            processed: Vec::new(),
            skipped,
        }
    }

    /// Some files were loaded and some were skipped
    pub fn is_partial(&self) -> bool {
        !self.processed.is_empty() && !self.skipped.is_empty()
    }
}

/// Loads a batch of documents into one delimited [`NormalizedDocument`]
pub struct DocumentLoader {
    parser: Arc<dyn DocumentParser>,
    directory: PathBuf,
    timeout: Duration,
}

impl DocumentLoader {
    pub fn new(parser: Arc<dyn DocumentParser>, directory: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            parser,
            directory: directory.into(),
            timeout,
        }
    }

    /// PDF loader over the configured directory
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self::new(
            Arc::new(PdfParser::new()),
            config.directory.clone(),
            Duration::from_secs(config.parse_timeout_secs),
        )
    }

    /// Load `paths`, or every matching file of the documents directory
    pub async fn load(&self, paths: Option<Vec<PathBuf>>) -> NormalizedDocument {
        self.load_batch(paths).await.document
    }

    pub async fn load_batch(&self, paths: Option<Vec<PathBuf>>) -> BatchReport {
        if !self.parser.is_available() {
            let err = Error::DependencyMissing(format!(
                "no parser backend for .{} files is compiled in",
                self.parser.extensions().join("/.")
            ));
            return BatchReport::failed(
                NormalizedDocument::failure(SourceType::Document, None, "Library not installed", &err),
                Vec::new(),
            );
        }

        let paths = match paths {
            Some(paths) if paths.is_empty() => {
                return BatchReport::failed(
                    NormalizedDocument::failure(
                        SourceType::Document,
                        None,
                        "No document provided",
                        &Error::input("No files were provided for processing."),
                    ),
                    Vec::new(),
                );
            }
            Some(paths) => paths,
            None => match self.scan_directory() {
                Ok(paths) => paths,
                Err((title, err)) => {
                    tracing::warn!(directory = %self.directory.display(), error = %err, "Document scan failed");
                    return BatchReport::failed(
                        NormalizedDocument::failure(SourceType::Document, None, title, &err),
                        Vec::new(),
                    );
                }
            },
        };

        let mut sections = Vec::new();
        let mut processed = Vec::new();
        let mut skipped = Vec::new();

        for path in paths {
            let name = display_name(&path);
            match self.parse_file(&path).await {
                Ok(text) => {
                    tracing::info!(file = %name, chars = text.len(), "Document processed");
                    sections.push(format!("--- BEGIN: {} ---\n{}\n--- END: {} ---", name, text, name));
                    processed.push(name);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping document");
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if processed.is_empty() {
            let reasons = skipped
                .iter()
                .map(|s| format!("- {}: {}", s.path.display(), s.reason))
                .collect::<Vec<_>>()
                .join("\n");
            let document = NormalizedDocument::source_error(
                SourceType::Document,
                None,
                "Processing failed",
                format!("None of the provided files could be processed.\n{}", reasons),
            );
            return BatchReport::failed(document, skipped);
        }

        if !skipped.is_empty() {
            tracing::warn!(
                processed = processed.len(),
                skipped = skipped.len(),
                "Document batch partially loaded"
            );
        }

        BatchReport {
            document: NormalizedDocument::new(
                SourceType::Document,
                None,
                format!("Files: {}", processed.join(", ")),
                sections.join("\n\n"),
            ),
            processed,
            skipped,
        }
    }

    /// Parse one file on the blocking pool, bounded by the per-file timeout
    async fn parse_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::input(format!("File not found: {}", path.display())));
        }

        let parser = self.parser.clone();
        let owned = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || parser.parse_pages(&owned));

        let pages = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => return Err(Error::internal(format!("Parser task failed: {}", join))),
            Err(_) => {
                return Err(Error::file_parse(
                    display_name(path),
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        let text = pages.join("\n");
        if text.trim().is_empty() {
            return Err(Error::file_parse(display_name(path), "no extractable text"));
        }
        Ok(text)
    }

    /// Matching files directly inside the documents directory, by name
    fn scan_directory(&self) -> std::result::Result<Vec<PathBuf>, (&'static str, Error)> {
        if !self.directory.is_dir() {
            return Err((
                "Folder not found",
                Error::input(format!("Documents folder not found: {}", self.directory.display())),
            ));
        }

        let extensions = self.parser.extensions();
        let paths: Vec<PathBuf> = WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
                    .unwrap_or(false)
            })
            .collect();

        if paths.is_empty() {
            return Err((
                "No documents found",
                Error::input(format!(
                    "No .{} files found in {}",
                    extensions.join("/."),
                    self.directory.display()
                )),
            ));
        }

        tracing::debug!(directory = %self.directory.display(), files = paths.len(), "Scanned documents folder");
        Ok(paths)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use std::fs;
    use tempfile::TempDir;

    /// Reads files as text, one page per `\f`; fails on files containing `BROKEN`
    struct TextPageParser {
        available: bool,
        delay: Option<Duration>,
    }

    impl TextPageParser {
        fn working() -> Arc<Self> {
            Arc::new(Self {
                available: true,
                delay: None,
            })
        }
    }

    impl DocumentParser for TextPageParser {
        fn extensions(&self) -> &[&'static str] {
            &["pdf"]
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn parse_pages(&self, path: &Path) -> Result<Vec<String>> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            let text = fs::read_to_string(path)?;
            if text.contains("BROKEN") {
                return Err(Error::file_parse(display_name(path), "broken xref table"));
            }
            Ok(text.split('\u{c}').map(String::from).collect())
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_partial_batch_keeps_good_files() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "a.pdf", "alpha page 1\u{c}alpha page 2"),
            write(&dir, "b.pdf", "BROKEN"),
            write(&dir, "c.pdf", "gamma"),
        ];

        let loader = DocumentLoader::new(TextPageParser::working(), dir.path(), Duration::from_secs(5));
        let report = loader.load_batch(Some(paths)).await;

        assert!(report.is_partial());
        assert_eq!(report.processed, vec!["a.pdf", "c.pdf"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("broken xref"));

        let doc = report.document;
        assert_eq!(doc.source_kind, SourceKind::Document);
        assert_eq!(doc.title, "Files: a.pdf, c.pdf");
        assert!(doc.origin_url.is_none());
        assert_eq!(
            doc.body,
            "--- BEGIN: a.pdf ---\nalpha page 1\nalpha page 2\n--- END: a.pdf ---\n\n\
             --- BEGIN: c.pdf ---\ngamma\n--- END: c.pdf ---"
        );
        assert!(!doc.body.contains("b.pdf"));
    }

    #[tokio::test]
    async fn test_all_files_fail() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "x.pdf", "BROKEN"),
            dir.path().join("missing.pdf"),
        ];

        let loader = DocumentLoader::new(TextPageParser::working(), dir.path(), Duration::from_secs(5));
        let report = loader.load_batch(Some(paths)).await;

        assert!(!report.is_partial());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.document.source_kind, SourceKind::SourceError(SourceType::Document));
        assert!(report.document.body.contains("missing.pdf"));
    }

    #[tokio::test]
    async fn test_directory_scan() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.PDF", "bravo");
        write(&dir, "a.pdf", "alpha");
        write(&dir, "notes.txt", "ignored");
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.pdf"), "ignored").unwrap();

        let loader = DocumentLoader::new(TextPageParser::working(), dir.path(), Duration::from_secs(5));
        let report = loader.load_batch(None).await;

        assert_eq!(report.processed, vec!["a.pdf", "b.PDF"]);
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_directory_errors() {
        let dir = TempDir::new().unwrap();
        let missing = DocumentLoader::new(
            TextPageParser::working(),
            dir.path().join("nope"),
            Duration::from_secs(5),
        );
        let doc = missing.load(None).await;
        assert_eq!(doc.source_kind, SourceKind::SourceError(SourceType::Document));
        assert_eq!(doc.title, "Folder not found");

        write(&dir, "readme.md", "no pdfs here");
        let empty = DocumentLoader::new(TextPageParser::working(), dir.path(), Duration::from_secs(5));
        let doc = empty.load(None).await;
        assert_eq!(doc.title, "No documents found");
        assert!(doc.is_error());

        let doc = empty.load(Some(Vec::new())).await;
        assert_eq!(doc.title, "No document provided");
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.pdf", "alpha");
        let parser = Arc::new(TextPageParser {
            available: false,
            delay: None,
        });

        let loader = DocumentLoader::new(parser, dir.path(), Duration::from_secs(5));
        let doc = loader.load(Some(vec![path])).await;
        assert_eq!(doc.source_kind, SourceKind::DependencyError);
    }

    #[tokio::test]
    async fn test_slow_file_times_out() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "slow.pdf", "eventually");
        let parser = Arc::new(TextPageParser {
            available: true,
            delay: Some(Duration::from_millis(500)),
        });

        let loader = DocumentLoader::new(parser, dir.path(), Duration::from_millis(20));
        let report = loader.load_batch(Some(vec![path])).await;
        assert!(report.document.is_error());
        assert!(report.skipped[0].reason.contains("timed out"));
    }
}
