//! Language-model provider abstraction.
//!
//! The gateway forwards fully rendered prompts to a model server and returns
//! the completion untouched. [`OllamaTextProvider`] is the production backend,
//! [`MockTextProvider`] backs tests.

pub mod mock;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use mock::MockTextProvider;
pub use ollama::OllamaTextProvider;

/// Error type for provider operations.
///
/// The variants follow the transport failure classes handlers map to
/// distinct HTTP statuses.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Could not connect to model server: {0}")]
    Connect(String),

    #[error("Model server timed out")]
    Timeout,

    #[error("Model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode model response: {0}")]
    Decode(String),

    #[error("Model request failed: {0}")]
    Other(String),
}

/// Completion returned by the model server.
///
/// Usage counters are passed through as-is; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Run one blocking (non-streaming) generation.
    ///
    /// `model` overrides the provider's default model.
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<GenerateResponse, ProviderError>;

    /// Model used when no override is given.
    fn default_model(&self) -> &str;

    /// Base URL, used in operator-facing error messages.
    fn endpoint(&self) -> &str;
}
