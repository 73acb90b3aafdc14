use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::services::fulfillment::FulfillmentOutcome;
use crate::services::payments::PaymentStatus;

const DEFAULT_SUBSCRIPTION_NAME: &str = "Abonnement Premium";
const DEFAULT_SUBSCRIPTION_AMOUNT: f64 = 9.99;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCheckoutRequest {
    #[validate(length(min = 1, message = "user_id est requis"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "product_name est requis"))]
    pub product_name: String,
    /// Price in euros.
    #[validate(range(exclusive_min = 0.0, message = "Le montant doit être positif"))]
    pub amount: f64,
    #[serde(default)]
    pub token_amount: u64,
    #[serde(default)]
    pub pack_id: Option<String>,
    #[validate(url)]
    pub success_url: Option<String>,
    #[validate(url)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, message = "user_id est requis"))]
    pub user_id: String,
    /// Existing provider price; when absent a monthly price is built inline.
    pub price_id: Option<String>,
    /// App-side plan id, carried in the session metadata.
    pub subscription_id: Option<String>,
    pub product_name: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Le montant doit être positif"))]
    pub amount: Option<f64>,
    #[validate(url)]
    pub success_url: Option<String>,
    #[validate(url)]
    pub cancel_url: Option<String>,
}

impl CreateSubscriptionRequest {
    pub fn product_name(&self) -> &str {
        self.product_name
            .as_deref()
            .unwrap_or(DEFAULT_SUBSCRIPTION_NAME)
    }

    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(DEFAULT_SUBSCRIPTION_AMOUNT)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelSubscriptionRequest {
    #[serde(default)]
    pub user_id: String,
    pub stripe_subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifySessionResponse {
    pub session_id: String,
    pub status: PaymentStatus,
    pub paid: bool,
    pub metadata: HashMap<String, String>,
    pub subscription: Option<String>,
    pub fulfillment: FulfillmentOutcome,
}

#[derive(Debug, Serialize)]
pub struct CancelSubscriptionResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscription_defaults() {
        let request: CreateSubscriptionRequest =
            serde_json::from_value(json!({ "user_id": "u1" })).unwrap();

        assert_eq!(request.product_name(), "Abonnement Premium");
        assert_eq!(request.amount(), 9.99);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn checkout_rejects_non_positive_amount() {
        let request: CreateCheckoutRequest = serde_json::from_value(json!({
            "user_id": "u1",
            "product_name": "Pack",
            "amount": 0.0
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn session_id_is_camel_cased() {
        let body = serde_json::to_value(CheckoutSessionResponse {
            session_id: "cs_1".to_string(),
            url: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "sessionId": "cs_1", "url": null }));
    }
}
