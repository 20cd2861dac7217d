//! Anthropic Messages API client with retry logic

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use super::llm::LlmProvider;
use super::vision::VisionProvider;
use crate::config::{LlmConfig, VisionConfig};
use crate::error::{Error, Result};
use crate::types::ChatMessage;

const API_VERSION: &str = "2023-06-01";

/// Anthropic API client with automatic retry
pub struct AnthropicClient {
    /// HTTP client
    client: Client,
    /// Chat configuration
    config: LlmConfig,
    /// Image description configuration
    vision: VisionConfig,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicClient {
    /// Create a new client; a missing API key surfaces on the first call
    pub fn new(config: &LlmConfig, vision: &VisionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY is not set; generation requests will fail");
        }

        Ok(Self {
            client,
            config: config.clone(),
            vision: vision.clone(),
        })
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transport faults, rate limits and server errors are retried.
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let url = url.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let response = client
                .post(url)
                .header("x-api-key", api_key)
                .header("anthropic-version", API_VERSION)
                .json(request)
                .send()
                .await
                .map_err(|e| Error::upstream(format!("Anthropic request failed: {}", e)))?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(api_error(status, &body));
            }
            extract_text(&body)
        })
        .await
    }
}

fn is_retryable(err: &Error) -> bool {
    matches!(err, Error::Upstream(_) | Error::Http(_))
}

/// Rate limits and server faults are upstream errors, other statuses are
/// request errors
fn api_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| format!("{}: {}", e.error.kind, e.error.message))
        .unwrap_or_else(|_| body.trim().to_string());
    let message = format!("Anthropic API returned {}: {}", status, detail);

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Error::upstream(message)
    } else {
        Error::llm(message)
    }
}

/// Concatenate the text blocks of a response
fn extract_text(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)?;
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(Error::llm("Anthropic response contained no text"));
    }
    Ok(text)
}

fn chat_request<'a>(
    config: &'a LlmConfig,
    system: &'a str,
    messages: &'a [ChatMessage],
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: Some(system).filter(|s| !s.trim().is_empty()),
        messages: messages
            .iter()
            .map(|m| RequestMessage {
                role: m.role.as_str(),
                content: vec![ContentBlock::Text { text: &m.content }],
            })
            .collect(),
    }
}

fn vision_request<'a>(
    vision: &'a VisionConfig,
    image_base64: &'a str,
    media_type: &'a str,
    instruction: &'a str,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &vision.model,
        max_tokens: vision.max_tokens,
        temperature: vision.temperature,
        system: None,
        messages: vec![RequestMessage {
            role: "user",
            content: vec![
                ContentBlock::Text { text: instruction },
                ContentBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type,
                        data: image_base64,
                    },
                },
            ],
        }],
    }
}

#[async_trait]
impl LlmProvider for AnthropicClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(Error::input("At least one message is required"));
        }
        let request = chat_request(&self.config, system, messages);
        tracing::debug!(model = %self.config.model, turns = messages.len(), "Requesting completion");
        self.send(&request).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl VisionProvider for AnthropicClient {
    async fn describe(
        &self,
        image_base64: &str,
        media_type: &str,
        instruction: &str,
    ) -> Result<String> {
        let request = vision_request(&self.vision, image_base64, media_type, instruction);
        tracing::debug!(model = %self.vision.model, media_type = %media_type, "Requesting image description");
        self.send(&request).await
    }
}
