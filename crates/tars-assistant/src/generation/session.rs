//! In-memory conversation state

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::orchestrator::ConversationOrchestrator;
use crate::types::{ChatMessage, NormalizedDocument, SourceKind};

/// Snapshot of a session for status output
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub message_count: usize,
    pub source_kind: SourceKind,
}

/// The current document plus the turn history. Nothing outlives the process.
pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    last_interaction: DateTime<Utc>,
    document: NormalizedDocument,
    history: Vec<ChatMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Start a session without a source
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            last_interaction: now,
            document: NormalizedDocument::free_chat(),
            history: Vec::new(),
        }
    }

    /// Replace the current document. The turn history is kept.
    pub fn set_document(&mut self, document: NormalizedDocument) {
        tracing::debug!(session = %self.id, kind = %document.source_kind, "Document replaced");
        self.document = document;
        self.touch();
    }

    /// Drop the history and the current document
    pub fn clear(&mut self) {
        self.history.clear();
        self.document = NormalizedDocument::free_chat();
        self.touch();
    }

    /// Record `question`, generate the reply and record it too. Apologies
    /// are recorded like any other reply.
    pub async fn ask(
        &mut self,
        question: impl Into<String>,
        orchestrator: &ConversationOrchestrator,
    ) -> String {
        self.history.push(ChatMessage::user(question));
        let reply = orchestrator.reply(&self.document, &self.history).await;
        self.history.push(ChatMessage::assistant(reply.clone()));
        self.touch();
        reply
    }

    pub fn document(&self) -> &NormalizedDocument {
        &self.document
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            started_at: self.started_at,
            last_interaction: self.last_interaction,
            message_count: self.history.len(),
            source_kind: self.document.source_kind,
        }
    }

    fn touch(&mut self) {
        self.last_interaction = Utc::now();
    }
}
