//! LLM provider trait for generating replies

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatMessage;

/// Chat completion backend
///
/// Implementations:
/// - `AnthropicClient`: Anthropic Messages API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Reply to `messages` (oldest first, starting with a user turn) under
    /// the given system prompt
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
