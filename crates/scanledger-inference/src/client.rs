//! Provider-agnostic entry point for JSON-producing prompts.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::local::{LocalBackend, LocalRuntime};
use crate::backend::ollama::{self, OllamaBackend};
use crate::backend::openai::OpenAiBackend;
use crate::backend::{ChatBackend, ChatRequest};
use crate::json::recover_json;
use crate::settings::{LlmSettings, LlmSettingsProvider};
use crate::{InferenceError, Result};

/// Something that turns a prompt pair into JSON text.
///
/// Callers depend on this trait rather than on [`LlmClient`] so they can be
/// tested with canned responses.
#[async_trait]
pub trait JsonGenerator: Send + Sync {
    /// Whether language-model features are switched on.
    fn is_enabled(&self) -> bool;

    /// Run the prompt and return recovered, repaired JSON text.
    async fn generate_json(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String>;
}

/// Language-model client.
///
/// Settings are read from the provider on every call and the backend is
/// resolved from them, so switching providers needs no restart. The local
/// runtime is shared across calls and loads its model once.
pub struct LlmClient {
    settings: Arc<dyn LlmSettingsProvider>,
    http: reqwest::Client,
    local: Option<Arc<LocalRuntime>>,
}

impl LlmClient {
    pub fn new(settings: Arc<dyn LlmSettingsProvider>) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
            local: None,
        }
    }

    /// Attach the in-process runtime used by the `local` provider.
    pub fn with_local_runtime(mut self, runtime: Arc<LocalRuntime>) -> Self {
        self.local = Some(runtime);
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn resolve(&self, settings: &LlmSettings) -> Result<Box<dyn ChatBackend>> {
        let provider = settings.provider_name();
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        match provider.as_str() {
            "" => Err(InferenceError::NotConfigured("no LLM provider selected".to_string())),
            "openai" => {
                let endpoint = endpoint
                    .ok_or_else(|| InferenceError::NotConfigured("openai endpoint is not set".to_string()))?;
                let api_key = settings
                    .api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| InferenceError::NotConfigured("openai API key is not set".to_string()))?;
                Ok(Box::new(OpenAiBackend::new(
                    self.http.clone(),
                    endpoint,
                    api_key,
                    settings.model.clone(),
                )))
            }
            "ollama" => {
                let endpoint = endpoint.unwrap_or(ollama::DEFAULT_ENDPOINT);
                if settings.model.trim().is_empty() {
                    return Err(InferenceError::NotConfigured("ollama model is not set".to_string()));
                }
                Ok(Box::new(OllamaBackend::new(
                    self.http.clone(),
                    endpoint,
                    settings.model.clone(),
                )))
            }
            "local" => {
                let model_path = settings
                    .model_path
                    .clone()
                    .ok_or_else(|| InferenceError::NotConfigured("local model path is not set".to_string()))?;
                let runtime = self
                    .local
                    .clone()
                    .ok_or_else(|| InferenceError::NotConfigured("no local model runtime available".to_string()))?;
                Ok(Box::new(LocalBackend::new(runtime, model_path)))
            }
            other => Err(InferenceError::NotSupported(other.to_string())),
        }
    }

    /// Run one completion and return the raw assistant text.
    pub async fn complete(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String> {
        let settings = self.settings.llm_settings();
        let backend = self.resolve(&settings)?;
        let timeout = settings.timeout();

        let request = ChatRequest {
            system: system.to_string(),
            user: user.to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        if cancel.is_cancelled() {
            return Err(InferenceError::Cancelled);
        }

        debug!("Sending prompt to {} backend ({} chars)", backend.name(), user.len());

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("LLM call cancelled");
                Err(InferenceError::Cancelled)
            }
            result = tokio::time::timeout(timeout, backend.complete(&request)) => match result {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => {
                    warn!("{} backend failed: {}", backend.name(), e);
                    Err(e)
                }
                Err(_) => {
                    warn!("{} backend timed out after {:?}", backend.name(), timeout);
                    Err(InferenceError::Timeout(timeout.as_secs()))
                }
            },
        }
    }
}

#[async_trait]
impl JsonGenerator for LlmClient {
    fn is_enabled(&self) -> bool {
        self.settings.llm_settings().enabled
    }

    async fn generate_json(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String> {
        let text = self.complete(system, user, cancel).await?;
        let json = recover_json(&text);
        debug!("Recovered {} chars of JSON from {} chars of output", json.len(), text.len());
        Ok(json)
    }
}
