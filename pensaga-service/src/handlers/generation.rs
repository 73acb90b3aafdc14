//! Text-generation endpoints under `/ia`.
//!
//! Each handler renders one prompt template, makes a single call to the
//! model server and wraps the completion in the success envelope.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use service_core::error::AppError;
use std::time::Duration;

use crate::dtos::{
    CharactersRequest, EpisodeRequest, FixTextRequest, GenerationMetadata, PitchRequest,
    RephraseRequest, SynopsisRequest,
};
use crate::services::metrics::record_generation;
use crate::services::prompts::{self, PromptTemplate};
use crate::services::providers::{GenerateResponse, ProviderError};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const TIMEOUT_DEFAULT: &str =
    "Timeout lors de la génération. Le serveur IA met trop de temps à répondre.";
const TIMEOUT_EPISODE: &str =
    "Timeout lors de la génération. Les épisodes peuvent prendre jusqu'à 2 minutes.";
const TIMEOUT_FIX: &str = "Timeout lors de la correction.";
const TIMEOUT_REPHRASE: &str = "Timeout lors de la reformulation.";

/// One generation call, with the endpoint's timeout and timeout message.
struct Generation {
    endpoint: &'static str,
    template: PromptTemplate,
    timeout: Duration,
    timeout_message: &'static str,
}

impl Generation {
    fn standard(state: &AppState, endpoint: &'static str, template: PromptTemplate) -> Self {
        Self {
            endpoint,
            template,
            timeout: Duration::from_secs(state.config.ollama.timeout_secs),
            timeout_message: TIMEOUT_DEFAULT,
        }
    }

    fn with_timeout_message(mut self, message: &'static str) -> Self {
        self.timeout_message = message;
        self
    }

    async fn run(
        self,
        state: &AppState,
        values: &[(&str, &str)],
    ) -> Result<GenerateResponse, AppError> {
        let prompt = self.template.render(values).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Erreur lors de la génération: {}", e))
        })?;

        match state
            .text_provider
            .generate(&prompt, None, self.timeout)
            .await
        {
            Ok(response) => {
                record_generation(self.endpoint, "success");
                tracing::info!(
                    endpoint = self.endpoint,
                    eval_count = ?response.eval_count,
                    "Generation completed"
                );
                Ok(response)
            }
            Err(e) => {
                let error = self.map_error(state, e);
                record_generation(self.endpoint, outcome_label(&error));
                Err(error)
            }
        }
    }

    fn map_error(&self, state: &AppState, err: ProviderError) -> AppError {
        match err {
            ProviderError::Timeout => {
                tracing::warn!(
                    endpoint = self.endpoint,
                    timeout_secs = self.timeout.as_secs(),
                    "Model server timed out"
                );
                AppError::GatewayTimeout(self.timeout_message.to_string())
            }
            ProviderError::Connect(detail) => {
                tracing::error!(endpoint = self.endpoint, error = %detail, "Model server unreachable");
                AppError::ServiceUnavailable(format!(
                    "Impossible de se connecter au serveur IA ({}). Vérifiez qu'Ollama est démarré.",
                    state.text_provider.endpoint()
                ))
            }
            ProviderError::Status { status, body } => {
                tracing::warn!(endpoint = self.endpoint, status, "Model server returned an error");
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                AppError::Upstream(status, format!("Erreur du serveur IA: {}", body))
            }
            other => {
                tracing::error!(endpoint = self.endpoint, error = %other, "Generation failed");
                AppError::InternalError(anyhow::anyhow!(
                    "Erreur lors de la génération: {}",
                    other
                ))
            }
        }
    }
}

fn outcome_label(error: &AppError) -> &'static str {
    match error {
        AppError::GatewayTimeout(_) => "timeout",
        AppError::ServiceUnavailable(_) => "unreachable",
        AppError::Upstream(..) => "upstream_error",
        _ => "error",
    }
}

/// `{success, model, <echoed inputs>, <output field>, metadata}`.
fn envelope(
    state: &AppState,
    response: &GenerateResponse,
    output_field: &str,
    echoed: &[(&str, Value)],
) -> Json<Value> {
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(
        "model".to_string(),
        Value::String(state.text_provider.default_model().to_string()),
    );
    for (key, value) in echoed {
        body.insert(key.to_string(), value.clone());
    }
    body.insert(
        output_field.to_string(),
        Value::String(response.response.clone()),
    );
    body.insert(
        "metadata".to_string(),
        json!(GenerationMetadata::from(response)),
    );
    Json(Value::Object(body))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_pitch(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PitchRequest>,
) -> Result<Json<Value>, AppError> {
    let response = Generation::standard(&state, "generate_pitch", prompts::CREATE_PITCH)
        .run(&state, &[("user_request", request.user_request.as_str())])
        .await?;

    Ok(envelope(
        &state,
        &response,
        "pitchs",
        &[("user_request", json!(request.user_request))],
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_synopsis(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SynopsisRequest>,
) -> Result<Json<Value>, AppError> {
    let response = Generation::standard(&state, "generate_synopsis", prompts::CREATE_SYNOPSIS)
        .run(&state, &[("user_request", request.pitch.as_str())])
        .await?;

    Ok(envelope(
        &state,
        &response,
        "synopsis",
        &[("pitch", json!(request.pitch))],
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_characters(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CharactersRequest>,
) -> Result<Json<Value>, AppError> {
    let response =
        Generation::standard(&state, "generate_characters", prompts::CREATE_CHARACTERS)
            .run(
                &state,
                &[("pitch", request.pitch.as_str()), ("synopsis", request.synopsis.as_str())],
            )
            .await?;

    Ok(envelope(&state, &response, "characters", &[]))
}

#[tracing::instrument(skip(state, request))]
pub async fn generate_episode(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EpisodeRequest>,
) -> Result<Json<Value>, AppError> {
    let numero = request.numero.to_string();
    let context = prompts::episode_context(&request.episodes_precedents);

    let generation = Generation {
        endpoint: "generate_episode",
        template: prompts::CREATE_EPISODE,
        timeout: Duration::from_secs(state.config.ollama.episode_timeout_secs),
        timeout_message: TIMEOUT_EPISODE,
    };
    let response = generation
        .run(
            &state,
            &[
                ("numero", numero.as_str()),
                ("pitch", request.pitch.as_str()),
                ("synopsis", request.synopsis.as_str()),
                ("personnages", request.personnages.as_str()),
                ("contexte_episodes", context.as_str()),
            ],
        )
        .await?;

    Ok(envelope(
        &state,
        &response,
        "episode_content",
        &[("episode_number", json!(request.numero))],
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn fix_text(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<FixTextRequest>,
) -> Result<Json<Value>, AppError> {
    let response = Generation::standard(&state, "fix_text", prompts::FIX_TEXT)
        .with_timeout_message(TIMEOUT_FIX)
        .run(&state, &[("text", request.text.as_str())])
        .await?;

    Ok(envelope(
        &state,
        &response,
        "fixed_text",
        &[("original_text", json!(request.text))],
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn rephrase_text(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RephraseRequest>,
) -> Result<Json<Value>, AppError> {
    let response = Generation::standard(&state, "rephrase_text", prompts::REPHRASE_TEXT)
        .with_timeout_message(TIMEOUT_REPHRASE)
        .run(
            &state,
            &[
                ("text_complete", request.text_complete.as_str()),
                ("text_to_reformulate", request.text_to_reformulate.as_str()),
            ],
        )
        .await?;

    Ok(envelope(
        &state,
        &response,
        "rephrased_text",
        &[("original_passage", json!(request.text_to_reformulate))],
    ))
}
