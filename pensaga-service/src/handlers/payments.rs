use axum::{
    Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dtos::{
    CancelSubscriptionRequest, CancelSubscriptionResponse, CheckoutSessionResponse,
    CreateCheckoutRequest, CreateSubscriptionRequest, VerifySessionResponse,
};
use crate::models::AccountUpdate;
use crate::services::fulfillment::{
    TYPE_SUBSCRIPTION, TYPE_TOKEN_PACK, fulfill_session, fulfill_without_store,
};
use crate::services::payments::{
    CheckoutMode, CheckoutParams, LineItemPrice, PaymentError, PaymentProvider, success_redirect,
    to_minor_units, validate_object_id,
};
use crate::services::{AccountStore, FulfillmentOutcome};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const NOT_CONFIGURED_CREATE: &str = "Stripe n'est pas configuré sur le serveur";
const NOT_CONFIGURED: &str = "Stripe n'est pas configuré";
const STORE_NOT_CONFIGURED: &str = "Supabase n'est pas configuré";

fn payment_provider(
    state: &AppState,
    message: &'static str,
) -> Result<Arc<dyn PaymentProvider>, AppError> {
    state
        .payments
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable(message.to_string()))
}

fn account_store(state: &AppState) -> Result<Arc<dyn AccountStore>, AppError> {
    state
        .accounts
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable(STORE_NOT_CONFIGURED.to_string()))
}

/// Route layer for the checkout routes: 503 before the body is extracted.
pub async fn require_checkout_provider(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    payment_provider(&state, NOT_CONFIGURED_CREATE)?;
    Ok(next.run(request).await)
}

/// Same gate for verification and cancellation.
pub async fn require_payment_provider(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    payment_provider(&state, NOT_CONFIGURED)?;
    Ok(next.run(request).await)
}

fn provider_error(err: PaymentError) -> AppError {
    match err {
        PaymentError::InvalidId(id) => {
            AppError::BadRequest(anyhow::anyhow!("Identifiant Stripe invalide: {}", id))
        }
        PaymentError::Api { message, .. } => AppError::InternalError(anyhow::anyhow!(message)),
        other => AppError::InternalError(anyhow::Error::new(other)),
    }
}

fn redirect_urls(state: &AppState, success: Option<&str>, cancel: Option<&str>) -> (String, String) {
    let default = state.config.stripe.default_redirect_url.as_str();
    (
        success_redirect(success.unwrap_or(default)),
        cancel.unwrap_or(default).to_string(),
    )
}

/// One-time checkout for a token pack.
#[tracing::instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCheckoutRequest>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let provider = payment_provider(&state, NOT_CONFIGURED_CREATE)?;

    let (success_url, cancel_url) = redirect_urls(
        &state,
        request.success_url.as_deref(),
        request.cancel_url.as_deref(),
    );

    let metadata = BTreeMap::from([
        ("user_id".to_string(), request.user_id.clone()),
        (
            "pack_id".to_string(),
            request.pack_id.clone().unwrap_or_default(),
        ),
        ("token_amount".to_string(), request.token_amount.to_string()),
        ("type".to_string(), TYPE_TOKEN_PACK.to_string()),
    ]);

    let params = CheckoutParams {
        mode: CheckoutMode::Payment,
        price: LineItemPrice::AdHoc {
            product_name: request.product_name.clone(),
            unit_amount: to_minor_units(request.amount),
            monthly: false,
        },
        success_url,
        cancel_url,
        metadata,
    };

    let session = provider
        .create_checkout_session(&params)
        .await
        .map_err(provider_error)?;

    tracing::info!(
        session_id = %session.id,
        token_amount = request.token_amount,
        "Checkout session created"
    );

    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Recurring checkout, either on an existing price or an inline monthly one.
#[tracing::instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn create_subscription_session(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSubscriptionRequest>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let provider = payment_provider(&state, NOT_CONFIGURED_CREATE)?;

    let (success_url, cancel_url) = redirect_urls(
        &state,
        request.success_url.as_deref(),
        request.cancel_url.as_deref(),
    );

    let price = match request.price_id.as_deref().filter(|id| !id.is_empty()) {
        Some(price_id) => LineItemPrice::Existing(price_id.to_string()),
        None => LineItemPrice::AdHoc {
            product_name: request.product_name().to_string(),
            unit_amount: to_minor_units(request.amount()),
            monthly: true,
        },
    };

    let metadata = BTreeMap::from([
        ("user_id".to_string(), request.user_id.clone()),
        (
            "subscription_id".to_string(),
            request.subscription_id.clone().unwrap_or_default(),
        ),
        ("type".to_string(), TYPE_SUBSCRIPTION.to_string()),
    ]);

    let session = provider
        .create_checkout_session(&CheckoutParams {
            mode: CheckoutMode::Subscription,
            price,
            success_url,
            cancel_url,
            metadata,
        })
        .await
        .map_err(provider_error)?;

    tracing::info!(session_id = %session.id, "Subscription session created");

    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Re-read a session after the checkout redirect and fulfill it if paid.
///
/// Always 200 once the session is found, with or without an account store;
/// the account side is reported in `fulfillment`.
#[tracing::instrument(skip(state))]
pub async fn verify_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<VerifySessionResponse>, AppError> {
    let provider = payment_provider(&state, NOT_CONFIGURED)?;

    let session = provider
        .retrieve_session(&session_id)
        .await
        .map_err(provider_error)?;

    let fulfillment = match &state.accounts {
        Some(store) => fulfill_session(&session, store.as_ref()).await,
        None => fulfill_without_store(&session),
    };
    if let FulfillmentOutcome::AccountUpdateFailed { reason, .. } = &fulfillment {
        tracing::error!(
            session_id = %session.id,
            reason = %reason,
            "Verified payment needs reconciliation"
        );
    }

    Ok(Json(VerifySessionResponse {
        paid: session.is_paid(),
        session_id: session.id,
        status: session.payment_status,
        metadata: session.metadata,
        subscription: session.subscription,
        fulfillment,
    }))
}

/// Cancel on the provider (immediately, else at period end), then revoke locally.
///
/// The local revocation happens even when both provider calls fail.
#[tracing::instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CancelSubscriptionRequest>,
) -> Result<Json<CancelSubscriptionResponse>, AppError> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("user_id est requis")));
    }
    let provider = payment_provider(&state, NOT_CONFIGURED)?;
    let store = account_store(&state)?;

    let account = store
        .get_account(&request.user_id)
        .await
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Utilisateur introuvable")))?;

    let subscription_id = request
        .stripe_subscription_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .or_else(|| account.subscription_ref())
        .map(str::to_string)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Aucun abonnement actif trouvé")))?;
    validate_object_id(&subscription_id).map_err(provider_error)?;

    if let Err(e) = provider.cancel_subscription(&subscription_id).await {
        tracing::warn!(
            subscription_id = %subscription_id,
            error = %e,
            "Immediate cancellation failed, trying cancel at period end"
        );
        if let Err(e) = provider.cancel_at_period_end(&subscription_id).await {
            tracing::warn!(
                subscription_id = %subscription_id,
                error = %e,
                "Cancel at period end failed, revoking locally anyway"
            );
        }
    }

    store
        .update_account(&request.user_id, &AccountUpdate::revoke_subscription(&account))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Could not revoke subscription on account");
            AppError::InternalError(anyhow::anyhow!(
                "Erreur lors de la mise à jour du compte: {}",
                e
            ))
        })?;

    tracing::info!(subscription_id = %subscription_id, "Subscription cancelled");
    Ok(Json(CancelSubscriptionResponse { success: true }))
}
