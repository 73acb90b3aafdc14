//! Applying the account mutation implied by a paid checkout session.
//!
//! Both the redirect verification and the webhook go through
//! [`fulfill_session`]. The session id is claimed in the processed-session
//! table before anything is written, so a session is applied at most once.
//! A failed write releases the claim and the next verification retries.

use serde::Serialize;

use crate::models::AccountUpdate;
use crate::services::accounts::AccountStore;
use crate::services::metrics::record_fulfillment;
use crate::services::payments::PaymentSession;

pub const TYPE_SUBSCRIPTION: &str = "subscription";
pub const TYPE_TOKEN_PACK: &str = "token_pack";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FulfillmentOutcome {
    NotPaid,
    Skipped {
        reason: String,
    },
    AlreadyProcessed,
    SubscriptionActivated,
    TokensCredited {
        amount: u64,
        new_balance: u64,
    },
    /// Payment is confirmed but the account does not reflect it yet.
    AccountUpdateFailed {
        reason: String,
        requires_reconciliation: bool,
    },
}

impl FulfillmentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FulfillmentOutcome::NotPaid => "not_paid",
            FulfillmentOutcome::Skipped { .. } => "skipped",
            FulfillmentOutcome::AlreadyProcessed => "already_processed",
            FulfillmentOutcome::SubscriptionActivated => "subscription_activated",
            FulfillmentOutcome::TokensCredited { .. } => "tokens_credited",
            FulfillmentOutcome::AccountUpdateFailed { .. } => "account_update_failed",
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        FulfillmentOutcome::Skipped {
            reason: reason.into(),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        FulfillmentOutcome::AccountUpdateFailed {
            reason: reason.into(),
            requires_reconciliation: true,
        }
    }
}

/// The mutation a paid session asks for, decided from its metadata alone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Purchase<'a> {
    Subscription { user_id: &'a str },
    Tokens { user_id: &'a str, amount: u64 },
}

fn purchase_of(session: &PaymentSession) -> Result<Purchase<'_>, FulfillmentOutcome> {
    if session.metadata.is_empty() {
        return Err(FulfillmentOutcome::skipped("session has no metadata"));
    }

    let user_id = session
        .metadata
        .get("user_id")
        .map(String::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| FulfillmentOutcome::skipped("metadata has no user_id"))?;

    match session.metadata.get("type").map(String::as_str) {
        Some(TYPE_SUBSCRIPTION) => Ok(Purchase::Subscription { user_id }),
        Some(TYPE_TOKEN_PACK) => {
            let raw = session
                .metadata
                .get("token_amount")
                .map(String::as_str)
                .unwrap_or("0");
            let amount: u64 = raw.trim().parse().map_err(|_| {
                FulfillmentOutcome::skipped(format!("invalid token_amount: {}", raw))
            })?;
            if amount == 0 {
                return Err(FulfillmentOutcome::skipped("token_amount is zero"));
            }
            Ok(Purchase::Tokens { user_id, amount })
        }
        Some(other) => Err(FulfillmentOutcome::skipped(format!(
            "unknown purchase type: {}",
            other
        ))),
        None => Err(FulfillmentOutcome::skipped("metadata has no type")),
    }
}

async fn apply(
    purchase: &Purchase<'_>,
    session: &PaymentSession,
    store: &dyn AccountStore,
) -> Result<FulfillmentOutcome, String> {
    let user_id = match purchase {
        Purchase::Subscription { user_id } | Purchase::Tokens { user_id, .. } => *user_id,
    };

    let account = store
        .get_account(user_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("account {} not found", user_id))?;

    match purchase {
        Purchase::Subscription { .. } => {
            let update =
                AccountUpdate::activate_subscription(&account, session.subscription.as_deref());
            store
                .update_account(user_id, &update)
                .await
                .map_err(|e| e.to_string())?;
            Ok(FulfillmentOutcome::SubscriptionActivated)
        }
        Purchase::Tokens { amount, .. } => {
            let new_balance = account
                .token
                .checked_add(*amount)
                .ok_or_else(|| "token balance overflow".to_string())?;
            store
                .update_account(user_id, &AccountUpdate::set_balance(new_balance))
                .await
                .map_err(|e| e.to_string())?;
            Ok(FulfillmentOutcome::TokensCredited {
                amount: *amount,
                new_balance,
            })
        }
    }
}

/// Apply a session's purchase to its account, at most once per session id.
#[tracing::instrument(skip(session, store), fields(session_id = %session.id))]
pub async fn fulfill_session(
    session: &PaymentSession,
    store: &dyn AccountStore,
) -> FulfillmentOutcome {
    let outcome = fulfill(session, store).await;
    record_fulfillment(outcome.label());
    outcome
}

/// Outcome for a session that cannot be applied because no account store is
/// configured. A paid session is reported for reconciliation.
pub fn fulfill_without_store(session: &PaymentSession) -> FulfillmentOutcome {
    let outcome = if session.is_paid() {
        tracing::error!(
            session_id = %session.id,
            requires_reconciliation = true,
            "Payment confirmed but no account store is configured"
        );
        FulfillmentOutcome::failed("account store not configured")
    } else {
        FulfillmentOutcome::NotPaid
    };
    record_fulfillment(outcome.label());
    outcome
}

async fn fulfill(session: &PaymentSession, store: &dyn AccountStore) -> FulfillmentOutcome {
    if !session.is_paid() {
        return FulfillmentOutcome::NotPaid;
    }

    let purchase = match purchase_of(session) {
        Ok(purchase) => purchase,
        Err(skipped) => {
            tracing::warn!(outcome = ?skipped, "Paid session not fulfilled");
            return skipped;
        }
    };

    match store.claim_session(&session.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Session already processed");
            return FulfillmentOutcome::AlreadyProcessed;
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not claim session");
            return FulfillmentOutcome::failed(format!("could not claim session: {}", e));
        }
    }

    match apply(&purchase, session, store).await {
        Ok(outcome) => {
            tracing::info!(outcome = outcome.label(), "Session fulfilled");
            outcome
        }
        Err(reason) => {
            if let Err(e) = store.release_session(&session.id).await {
                tracing::error!(error = %e, "Could not release session claim");
            }
            tracing::error!(
                reason = %reason,
                requires_reconciliation = true,
                "Payment confirmed but account update failed"
            );
            FulfillmentOutcome::failed(reason)
        }
    }
}
