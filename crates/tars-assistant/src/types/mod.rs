//! Core data types

pub mod document;
pub mod message;

pub use document::{NormalizedDocument, SourceKind, SourceType};
pub use message::{ChatMessage, Role};
