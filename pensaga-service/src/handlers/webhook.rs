//! Stripe webhook receiver.
//!
//! The raw body is verified against `Stripe-Signature` before it is parsed.
//! `checkout.session.completed` runs the same idempotent fulfillment as the
//! redirect verification, so whichever arrives second is a no-op.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use service_core::error::AppError;
use service_core::utils::signature::{
    DEFAULT_TOLERANCE_SECS, SignatureError, verify_timestamped_signature,
};

use crate::services::fulfillment::{FulfillmentOutcome, fulfill_session};
use crate::services::payments::PaymentSession;
use crate::startup::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: Value,
}

fn signature_error(err: SignatureError) -> AppError {
    match err {
        SignatureError::MalformedHeader | SignatureError::MissingSignature => {
            AppError::BadRequest(anyhow::anyhow!("En-tête Stripe-Signature invalide"))
        }
        SignatureError::TimestampOutOfTolerance | SignatureError::Mismatch => {
            AppError::Unauthorized(anyhow::anyhow!("Signature du webhook invalide"))
        }
        SignatureError::InvalidSecret => {
            AppError::ConfigError(anyhow::anyhow!("Secret du webhook Stripe invalide"))
        }
    }
}

#[tracing::instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Webhook Stripe non configuré".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("En-tête Stripe-Signature manquant")))?;

    verify_timestamped_signature(
        secret.expose_secret(),
        &body,
        signature,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook delivery");
        signature_error(e)
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Événement invalide: {}", e)))?;

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
        return Ok(Json(json!({ "received": true })));
    }

    let session: PaymentSession = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Session invalide: {}", e)))?;

    let store = state.accounts.clone().ok_or_else(|| {
        AppError::ServiceUnavailable("Supabase n'est pas configuré".to_string())
    })?;

    let outcome = fulfill_session(&session, store.as_ref()).await;
    tracing::info!(
        event_id = ?event.id,
        session_id = %session.id,
        outcome = outcome.label(),
        "Webhook processed"
    );

    // A non-2xx makes Stripe redeliver; the claim was released so the retry applies.
    if let FulfillmentOutcome::AccountUpdateFailed { reason, .. } = outcome {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Erreur lors de la mise à jour du compte: {}",
            reason
        )));
    }

    Ok(Json(json!({ "received": true })))
}
