use pensaga_service::config::PensagaConfig;
use pensaga_service::startup::Application;
use secrecy::ExposeSecret;
use service_core::observability::init_tracing;

const SERVICE_NAME: &str = "pensaga-service";

/// First characters of a secret, enough to tell keys apart in logs.
fn key_prefix(secret: &str) -> String {
    format!("{}...", secret.chars().take(8).collect::<String>())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = PensagaConfig::load()?;

    init_tracing(
        SERVICE_NAME,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    let missing = config.validate();
    if !missing.is_empty() {
        tracing::error!(
            missing = ?missing,
            "Variables d'environnement manquantes; les routes dépendant de Supabase sont désactivées"
        );
    }

    if let Some(key) = &config.stripe.secret_key {
        tracing::info!(
            key_prefix = %key_prefix(key.expose_secret()),
            "Stripe configured"
        );
    }

    tracing::info!(
        host = %config.common.host,
        port = config.common.port,
        debug = config.common.debug,
        ollama_url = %config.ollama.url,
        model = %config.ollama.model,
        "Starting {}",
        SERVICE_NAME
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
