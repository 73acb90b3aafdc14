//! Ollama text provider.
//!
//! Issues `POST {base}/api/generate` with `{model, prompt, stream: false}` and
//! a bearer token when an API key is configured.

use super::{GenerateResponse, ProviderError, TextProvider};
use crate::config::OllamaConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use service_core::observability::TracedClientExt;
use std::time::Duration;

const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

pub struct OllamaTextProvider {
    client: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model: String,
}

impl OllamaTextProvider {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_connect() {
        ProviderError::Connect(err.to_string())
    } else if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Other(err.to_string())
    }
}

#[async_trait]
impl TextProvider for OllamaTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<GenerateResponse, ProviderError> {
        let model = model.unwrap_or(&self.model);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        tracing::debug!(
            model = %model,
            prompt_len = prompt.len(),
            timeout_secs = timeout.as_secs(),
            "Sending request to model server"
        );

        let mut request = self
            .client
            .traced_post(&self.generate_url())
            .timeout(timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Reading the body is still bounded by the request timeout.
        let generated: GenerateResponse = response.json().await.map_err(classify)?;

        tracing::debug!(
            model = %model,
            eval_count = ?generated.eval_count,
            total_duration = ?generated.total_duration,
            "Model server responded"
        );

        Ok(generated)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_generate_url_without_double_slash() {
        let provider = OllamaTextProvider::new(&OllamaConfig {
            url: "http://ollama:11434/".to_string(),
            ..OllamaConfig::default()
        });
        assert_eq!(provider.generate_url(), "http://ollama:11434/api/generate");
        assert_eq!(provider.endpoint(), "http://ollama:11434");
    }

    #[test]
    fn request_body_disables_streaming() {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3.1",
            prompt: "Bonjour",
            stream: false,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "model": "llama3.1", "prompt": "Bonjour", "stream": false })
        );
    }
}
