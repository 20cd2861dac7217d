//! tars-assistant: a conversational assistant grounded on one content source at a time
//!
//! Loaders turn a web page, a YouTube transcript, a batch of PDFs or an image
//! into a [`NormalizedDocument`]; the generation layer folds that document into
//! every Anthropic Messages API request. Load failures are values
//! (error-kind documents), never faults crossing the loader boundary.

pub mod config;
pub mod error;
pub mod generation;
pub mod http;
pub mod ingestion;
pub mod providers;
pub mod types;

pub use config::TarsConfig;
pub use error::{Error, Result};
pub use generation::{ChatSession, ConversationOrchestrator};
pub use ingestion::{Ingestor, SourceRequest};
pub use types::{
    document::{NormalizedDocument, SourceKind, SourceType},
    message::{ChatMessage, Role},
};
