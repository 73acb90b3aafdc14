//! Payment provider abstraction.
//!
//! Covers hosted checkout sessions (one-time and recurring) and subscription
//! cancellation. [`StripeClient`] is the production backend,
//! [`MockPaymentProvider`] backs tests.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub use mock::MockPaymentProvider;
pub use stripe::StripeClient;

/// Currency for every checkout line item.
pub const CURRENCY: &str = "eur";

/// Placeholder the provider replaces with the real session id on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider not configured")]
    NotConfigured,

    #[error("Payment provider request failed: {0}")]
    Request(String),

    #[error("Payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payment provider response: {0}")]
    Decode(String),

    #[error("Invalid provider object id: {0:?}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// What the single line item is priced with.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemPrice {
    /// A price object that already exists on the provider.
    Existing(String),
    /// Inline price data. `unit_amount` is in cents.
    AdHoc {
        product_name: String,
        unit_amount: u64,
        monthly: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutParams {
    pub mode: CheckoutMode,
    pub price: LineItemPrice,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// A freshly created hosted checkout page.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    NoPaymentRequired,
    #[serde(other)]
    Other,
}

/// A checkout session as read back from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "metadata_or_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PaymentSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, PaymentError>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError>;

    /// Let a subscription run until the end of the paid period.
    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), PaymentError>;
}

/// Euros to cents, rounded to the nearest cent. Negative input clamps to 0.
pub fn to_minor_units(amount: f64) -> u64 {
    let cents = (amount * 100.0).round();
    if cents.is_sign_negative() || !cents.is_finite() {
        0
    } else {
        cents as u64
    }
}

/// Append the session-id placeholder to a redirect URL.
///
/// The frontend reads `session_id` from the query string, so the base is
/// expected to carry no query of its own.
pub fn success_redirect(base: &str) -> String {
    format!("{}?session_id={}", base, SESSION_ID_PLACEHOLDER)
}

/// Provider object ids (`cs_test_...`, `sub_...`) are ASCII alphanumerics and
/// underscores. Anything else is refused before it reaches a request path.
pub fn validate_object_id(id: &str) -> Result<(), PaymentError> {
    let valid = !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidId(id.to_string()))
    }
}

fn metadata_or_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<HashMap<String, String>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
