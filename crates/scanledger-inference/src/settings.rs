//! Backend settings supplied by the host application.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Lower bound applied to every configured request timeout.
pub const MIN_TIMEOUT_SECS: u64 = 5;

/// Language-model backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Master switch. When false every LLM-dependent operation refuses to run.
    pub enabled: bool,

    /// Provider name: `local`, `openai` or `ollama`.
    pub provider: String,

    /// Base URL of a remote provider (e.g. `https://api.openai.com/v1`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// API key for providers that require one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Remote model id, e.g. `gpt-4o-mini` or `llama3.1`.
    pub model: String,

    /// Path to the model file used by the local runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Request timeout in seconds (clamped to at least [`MIN_TIMEOUT_SECS`]).
    pub timeout_secs: u64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: String::new(),
            endpoint: None,
            api_key: None,
            model: String::new(),
            model_path: None,
            timeout_secs: 60,
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

impl LlmSettings {
    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(MIN_TIMEOUT_SECS))
    }

    /// Provider name, trimmed and lowercased.
    pub fn provider_name(&self) -> String {
        self.provider.trim().to_lowercase()
    }
}

/// Source of LLM settings. Implemented by the host's settings store; read on
/// every call so configuration changes take effect without a restart.
pub trait LlmSettingsProvider: Send + Sync {
    fn llm_settings(&self) -> LlmSettings;
}

impl LlmSettingsProvider for LlmSettings {
    fn llm_settings(&self) -> LlmSettings {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_has_floor() {
        let settings = LlmSettings {
            timeout_secs: 1,
            ..Default::default()
        };
        assert_eq!(settings.timeout(), Duration::from_secs(5));

        let settings = LlmSettings {
            timeout_secs: 90,
            ..Default::default()
        };
        assert_eq!(settings.timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_provider_name_normalized() {
        let settings = LlmSettings {
            provider: "  OpenAI ".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.provider_name(), "openai");
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: LlmSettings =
            serde_json::from_str(r#"{"enabled": true, "provider": "ollama"}"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.timeout_secs, 60);
        assert!(settings.endpoint.is_none());
    }
}
