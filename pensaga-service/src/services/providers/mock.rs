//! Mock text provider for testing.

use super::{GenerateResponse, ProviderError, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// How the mock answers every request.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Echo a fixed completion.
    Respond(String),
    ConnectFailure,
    Timeout,
    Status(u16, String),
}

pub struct MockTextProvider {
    model: String,
    behavior: MockBehavior,
    prompts: Mutex<Vec<(String, Duration)>>,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            model: "mock-model".to_string(),
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(text: &str) -> Self {
        Self::new(MockBehavior::Respond(text.to_string()))
    }

    /// Prompts received so far, with the timeout each was sent with.
    pub fn received(&self) -> Vec<(String, Duration)> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<GenerateResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), timeout));
        }

        match &self.behavior {
            MockBehavior::Respond(text) => Ok(GenerateResponse {
                model: Some(model.unwrap_or(&self.model).to_string()),
                response: text.clone(),
                done: Some(true),
                total_duration: Some(1_000_000),
                load_duration: Some(10_000),
                prompt_eval_count: Some(prompt.len() as u64 / 4),
                eval_count: Some(text.len() as u64 / 4),
            }),
            MockBehavior::ConnectFailure => {
                Err(ProviderError::Connect("connection refused".to_string()))
            }
            MockBehavior::Timeout => Err(ProviderError::Timeout),
            MockBehavior::Status(status, body) => Err(ProviderError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        "mock://model-server"
    }
}
