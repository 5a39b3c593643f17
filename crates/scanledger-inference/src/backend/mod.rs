//! Chat backend implementations.

pub mod local;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;

use crate::Result;

/// A single system/user prompt exchange.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for language-model backends.
///
/// A backend turns one prompt pair into the raw completion text. It does not
/// interpret the text; JSON recovery happens in [`crate::json`]. Timeouts and
/// cancellation are applied by the caller ([`crate::LlmClient`]), so
/// implementations only need to be cancel-safe when their future is dropped.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Run the completion and return the assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Trim a provider body for log output.
pub(crate) fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
