//! Grounded answer generation over the current document

pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use orchestrator::ConversationOrchestrator;
pub use prompt::PromptBuilder;
pub use session::{ChatSession, SessionInfo};
