use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::providers::GenerateResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct PitchRequest {
    pub user_request: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SynopsisRequest {
    pub pitch: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CharactersRequest {
    pub pitch: String,
    pub synopsis: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EpisodeRequest {
    pub pitch: String,
    pub synopsis: String,
    pub personnages: String,
    #[serde(default = "first_episode")]
    #[validate(range(min = 1, message = "Le numéro d'épisode commence à 1"))]
    pub numero: u32,
    /// Full text of the episodes written so far, oldest first.
    #[serde(default)]
    pub episodes_precedents: Vec<String>,
}

fn first_episode() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct FixTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RephraseRequest {
    pub text_complete: String,
    pub text_to_reformulate: String,
}

/// Usage counters echoed from the model server. Absent values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationMetadata {
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
}

impl From<&GenerateResponse> for GenerationMetadata {
    fn from(response: &GenerateResponse) -> Self {
        Self {
            total_duration: response.total_duration,
            load_duration: response.load_duration,
            prompt_eval_count: response.prompt_eval_count,
            eval_count: response.eval_count,
        }
    }
}
