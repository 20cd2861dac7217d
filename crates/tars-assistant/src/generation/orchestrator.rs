//! Grounded reply generation

use std::sync::Arc;
use std::time::Instant;

use super::prompt::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{ChatMessage, NormalizedDocument};

/// Folds the current document into each generation request
pub struct ConversationOrchestrator {
    llm: Arc<dyn LlmProvider>,
}

impl ConversationOrchestrator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Answer the last user turn of `history`. Provider faults come back as
    /// an apology carrying the fault detail, never as an error.
    pub async fn reply(&self, document: &NormalizedDocument, history: &[ChatMessage]) -> String {
        let system = PromptBuilder::system_prompt(document);
        let start = Instant::now();

        match self.llm.complete(&system, history).await {
            Ok(text) => {
                tracing::info!(
                    turns = history.len(),
                    context_chars = document.body.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Generated reply"
                );
                text
            }
            Err(e) => {
                tracing::error!(error = %e, turns = history.len(), "Generation failed");
                PromptBuilder::apology(&e.to_string())
            }
        }
    }
}
