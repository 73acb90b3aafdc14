use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EPISODE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_REDIRECT_URL: &str = "http://localhost:5173";

/// Store credentials without which the service cannot reach the account table.
pub const REQUIRED_VARS: [&str; 2] = ["SUPABASE_URL", "SUPABASE_KEY"];

#[derive(Debug, Clone, Deserialize)]
pub struct PensagaConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub supabase: SupabaseConfig,
    pub ollama: OllamaConfig,
    pub stripe: StripeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub key: Option<Secret<String>>,
    /// Service-role key; bypasses row-level security for account mutations.
    pub service_key: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub timeout_secs: u64,
    /// Long-form episodes get their own, larger budget.
    pub episode_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: Option<Secret<String>>,
    pub webhook_secret: Option<Secret<String>>,
    pub api_base_url: String,
    pub default_redirect_url: String,
}

impl PensagaConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(PensagaConfig {
            common,
            supabase: SupabaseConfig {
                url: optional_env("SUPABASE_URL"),
                key: optional_env("SUPABASE_KEY").map(Secret::new),
                service_key: optional_env("SUPABASE_SERVICE_KEY").map(Secret::new),
            },
            ollama: OllamaConfig {
                url: optional_env("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                api_key: optional_env("OLLAMA_API_KEY").map(Secret::new),
                model: optional_env("OLLAMA_MODEL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                timeout_secs: parsed_env("OLLAMA_TIMEOUT_SECS", DEFAULT_GENERATION_TIMEOUT_SECS)?,
                episode_timeout_secs: parsed_env(
                    "OLLAMA_EPISODE_TIMEOUT_SECS",
                    DEFAULT_EPISODE_TIMEOUT_SECS,
                )?,
            },
            stripe: StripeConfig {
                secret_key: optional_env("STRIPE_SECRET_KEY").map(Secret::new),
                webhook_secret: optional_env("STRIPE_WEBHOOK_SECRET").map(Secret::new),
                api_base_url: optional_env("STRIPE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
                default_redirect_url: optional_env("CHECKOUT_DEFAULT_REDIRECT_URL")
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            },
        })
    }

    /// Names of required variables that are missing.
    ///
    /// The caller only logs these; startup continues so that the generation
    /// endpoints stay usable without a store.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.supabase.url.as_deref().is_none_or(str::is_empty) {
            missing.push(REQUIRED_VARS[0]);
        }
        if self
            .supabase
            .key
            .as_ref()
            .is_none_or(|k| k.expose_secret().is_empty())
        {
            missing.push(REQUIRED_VARS[1]);
        }
        missing
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            api_key: None,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            episode_timeout_secs: DEFAULT_EPISODE_TIMEOUT_SECS,
        }
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            api_base_url: DEFAULT_STRIPE_API_BASE.to_string(),
            default_redirect_url: DEFAULT_REDIRECT_URL.to_string(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env(key: &str, default: u64) -> Result<u64, AppError> {
    match optional_env(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} must be an integer: {}", key, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_store(url: Option<&str>, key: Option<&str>) -> PensagaConfig {
        PensagaConfig {
            common: core_config::Config::default(),
            supabase: SupabaseConfig {
                url: url.map(str::to_string),
                key: key.map(|k| Secret::new(k.to_string())),
                service_key: None,
            },
            ollama: OllamaConfig::default(),
            stripe: StripeConfig::default(),
        }
    }

    #[test]
    fn validate_reports_missing_store_credentials() {
        let config = config_with_store(None, None);
        assert_eq!(config.validate(), vec!["SUPABASE_URL", "SUPABASE_KEY"]);

        let config = config_with_store(Some("https://x.supabase.co"), Some(""));
        assert_eq!(config.validate(), vec!["SUPABASE_KEY"]);
    }

    #[test]
    fn validate_passes_with_store_credentials() {
        let config = config_with_store(Some("https://x.supabase.co"), Some("anon"));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn generation_defaults() {
        let ollama = OllamaConfig::default();
        assert_eq!(ollama.timeout_secs, 60);
        assert_eq!(ollama.episode_timeout_secs, 120);
        assert_eq!(ollama.url, "http://localhost:11434");
    }
}
