//! Provider abstractions for chat generation and image description
//!
//! Both traits are implemented by the Anthropic client; tests substitute
//! mocks.

pub mod anthropic;
pub mod llm;
pub mod vision;

pub use anthropic::AnthropicClient;
pub use llm::LlmProvider;
pub use vision::VisionProvider;
