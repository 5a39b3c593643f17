//! Language-model access for scanledger.
//!
//! This crate sends a system/user prompt pair to one of several backends
//! and recovers well-formed JSON from whatever the model returns:
//! - `local` runs an in-process model supplied through [`LocalModelLoader`]
//! - `openai` talks to any OpenAI-compatible chat completion endpoint
//! - `ollama` talks to an Ollama server
//!
//! The backend is chosen per call from [`LlmSettings`], so hosts can change
//! providers at runtime.

pub mod backend;
mod client;
mod error;
pub mod json;
mod settings;

pub use backend::local::{LocalModel, LocalModelLoader, LocalRuntime};
pub use backend::{ChatBackend, ChatRequest};
pub use client::{JsonGenerator, LlmClient};
pub use error::InferenceError;
pub use json::recover_json;
pub use settings::{LlmSettings, LlmSettingsProvider, MIN_TIMEOUT_SECS};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
