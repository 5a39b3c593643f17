//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while talking to a language-model backend.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Provider, endpoint, credentials or model are missing from the settings.
    #[error("LLM backend not configured: {0}")]
    NotConfigured(String),

    /// The configured provider name is not recognized.
    #[error("LLM provider not supported: {0}")]
    NotSupported(String),

    /// The backend call failed (network, status, envelope, model runtime).
    #[error("LLM call failed: {0}")]
    Failed(String),

    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    /// The caller cancelled the call.
    #[error("LLM call cancelled")]
    Cancelled,

    /// I/O error when loading local model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        InferenceError::Failed(e.to_string())
    }
}
