//! Stripe REST client.
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
//! keys for nested fields (`line_items[0][price_data][currency]=eur`).

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use service_core::observability::{TracedClientExt, TracedRequest};

use super::{
    CURRENCY, CheckoutParams, CheckoutSession, LineItemPrice, PaymentError, PaymentProvider,
    PaymentSession, validate_object_id,
};
use crate::config::StripeConfig;

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base_url: String,
    secret_key: Secret<String>,
}

impl StripeClient {
    /// Returns `None` when no secret key is configured.
    pub fn from_config(config: &StripeConfig) -> Option<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())?;

        Some(Self {
            client: Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// `{base}/{segments...}`, each segment percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, PaymentError> {
        let invalid_base =
            || PaymentError::Request(format!("invalid Stripe API base: {}", self.api_base_url));
        let mut url = Url::parse(&self.api_base_url).map_err(|_| invalid_base())?;
        url.path_segments_mut()
            .map_err(|_| invalid_base())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, collection: &[&str], id: &str) -> Result<Url, PaymentError> {
        validate_object_id(id)?;
        let mut segments = collection.to_vec();
        segments.push(id);
        self.url(&segments)
    }

    fn authorize(&self, request: TracedRequest) -> TracedRequest {
        request.bearer_auth(self.secret_key.expose_secret())
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, PaymentError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|e| e.error.message.or(e.error.kind))
                .unwrap_or(body);
            tracing::warn!(status = %status, message = %message, "Stripe request rejected");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

fn request_error(err: reqwest::Error) -> PaymentError {
    PaymentError::Request(err.to_string())
}

/// Flatten checkout parameters into Stripe's bracketed form fields.
pub fn checkout_form(params: &CheckoutParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), params.mode.as_str().to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];

    match &params.price {
        LineItemPrice::Existing(price_id) => {
            form.push(("line_items[0][price]".to_string(), price_id.clone()));
        }
        LineItemPrice::AdHoc {
            product_name,
            unit_amount,
            monthly,
        } => {
            let prefix = "line_items[0][price_data]";
            form.push((format!("{}[currency]", prefix), CURRENCY.to_string()));
            form.push((
                format!("{}[product_data][name]", prefix),
                product_name.clone(),
            ));
            form.push((format!("{}[unit_amount]", prefix), unit_amount.to_string()));
            if *monthly {
                form.push((format!("{}[recurring][interval]", prefix), "month".to_string()));
            }
        }
    }

    form.push(("success_url".to_string(), params.success_url.clone()));
    form.push(("cancel_url".to_string(), params.cancel_url.clone()));
    for (key, value) in &params.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(params);
        let url = self.url(&["checkout", "sessions"])?;
        let response = self
            .authorize(self.client.traced_post(url.as_str()))
            .form(&form)
            .send()
            .await
            .map_err(request_error)?;

        let session: CheckoutSession = Self::parse(response).await?;
        tracing::info!(
            session_id = %session.id,
            mode = params.mode.as_str(),
            "Stripe checkout session created"
        );
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, PaymentError> {
        let url = self.object_url(&["checkout", "sessions"], session_id)?;
        let response = self
            .authorize(self.client.traced_get(url.as_str()))
            .send()
            .await
            .map_err(request_error)?;

        Self::parse(response).await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let url = self.object_url(&["subscriptions"], subscription_id)?;
        let response = self
            .authorize(self.client.traced_delete(url.as_str()))
            .send()
            .await
            .map_err(request_error)?;

        let _: serde_json::Value = Self::parse(response).await?;
        Ok(())
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let url = self.object_url(&["subscriptions"], subscription_id)?;
        let response = self
            .authorize(self.client.traced_post(url.as_str()))
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await
            .map_err(request_error)?;

        let _: serde_json::Value = Self::parse(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payments::CheckoutMode;
    use std::collections::BTreeMap;

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn client(base: &str) -> StripeClient {
        StripeClient::from_config(&StripeConfig {
            secret_key: Some(Secret::new("sk_test_abc".to_string())),
            api_base_url: base.to_string(),
            ..StripeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn object_urls_stay_under_their_collection() {
        let stripe = client("https://api.stripe.com/v1/");

        assert_eq!(
            stripe.object_url(&["subscriptions"], "sub_123").unwrap().as_str(),
            "https://api.stripe.com/v1/subscriptions/sub_123"
        );
        assert_eq!(
            stripe.url(&["checkout", "sessions"]).unwrap().as_str(),
            "https://api.stripe.com/v1/checkout/sessions"
        );
        assert!(matches!(
            stripe.object_url(&["subscriptions"], "x/../../customers/cus_1"),
            Err(PaymentError::InvalidId(_))
        ));
    }

    #[test]
    fn one_time_payment_form() {
        let mut metadata = BTreeMap::new();
        metadata.insert("user_id".to_string(), "u1".to_string());
        metadata.insert("type".to_string(), "token_pack".to_string());

        let form = checkout_form(&CheckoutParams {
            mode: CheckoutMode::Payment,
            price: LineItemPrice::AdHoc {
                product_name: "Pack".to_string(),
                unit_amount: 999,
                monthly: false,
            },
            success_url: "http://app?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "http://app".to_string(),
            metadata,
        });

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "payment_method_types[0]"), Some("card"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("999"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][name]"),
            Some("Pack")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("1"));
        assert_eq!(value(&form, "line_items[0][price_data][recurring][interval]"), None);
        assert_eq!(value(&form, "metadata[user_id]"), Some("u1"));
        assert_eq!(value(&form, "metadata[type]"), Some("token_pack"));
    }

    #[test]
    fn subscription_forms() {
        let base = CheckoutParams {
            mode: CheckoutMode::Subscription,
            price: LineItemPrice::Existing("price_123".to_string()),
            success_url: "s".to_string(),
            cancel_url: "c".to_string(),
            metadata: BTreeMap::new(),
        };

        let form = checkout_form(&base);
        assert_eq!(value(&form, "mode"), Some("subscription"));
        assert_eq!(value(&form, "line_items[0][price]"), Some("price_123"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), None);

        let form = checkout_form(&CheckoutParams {
            price: LineItemPrice::AdHoc {
                product_name: "Abonnement Premium".to_string(),
                unit_amount: 999,
                monthly: true,
            },
            ..base
        });
        assert_eq!(
            value(&form, "line_items[0][price_data][recurring][interval]"),
            Some("month")
        );
        assert_eq!(value(&form, "line_items[0][price]"), None);
    }

    #[test]
    fn client_requires_secret_key() {
        assert!(StripeClient::from_config(&StripeConfig::default()).is_none());

        let client = StripeClient::from_config(&StripeConfig {
            secret_key: Some(Secret::new("sk_test_123".to_string())),
            api_base_url: "http://stripe.local/v1/".to_string(),
            ..StripeConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.url(&["checkout", "sessions"]).unwrap().as_str(),
            "http://stripe.local/v1/checkout/sessions"
        );
    }
}
