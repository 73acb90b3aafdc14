#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use pensaga_service::config::{OllamaConfig, PensagaConfig, StripeConfig, SupabaseConfig};
use pensaga_service::models::Account;
use pensaga_service::services::providers::mock::MockBehavior;
use pensaga_service::services::{
    AccountStore, InMemoryAccountStore, MockPaymentProvider, MockTextProvider, PaymentProvider,
};
use pensaga_service::startup::{AppState, build_router};
use secrecy::Secret;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_USER_ID: &str = "user-123";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn test_config() -> PensagaConfig {
    PensagaConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        },
        supabase: SupabaseConfig {
            url: Some("http://supabase.test".to_string()),
            key: Some(Secret::new("anon-key".to_string())),
            service_key: None,
        },
        ollama: OllamaConfig::default(),
        stripe: StripeConfig {
            secret_key: Some(Secret::new("sk_test_123".to_string())),
            webhook_secret: Some(Secret::new(TEST_WEBHOOK_SECRET.to_string())),
            ..StripeConfig::default()
        },
    }
}

pub fn account(id: &str, token: u64) -> Account {
    Account {
        id: id.to_string(),
        has_subscription: false,
        token,
        preferences: Map::new(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub accounts: Arc<InMemoryAccountStore>,
    pub payments: Arc<MockPaymentProvider>,
    pub text: Arc<MockTextProvider>,
}

pub struct TestAppBuilder {
    behavior: MockBehavior,
    accounts: Vec<Account>,
    with_store: bool,
    with_payments: bool,
    config: PensagaConfig,
}

impl TestAppBuilder {
    pub fn text_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn without_store(mut self) -> Self {
        self.with_store = false;
        self
    }

    pub fn without_payments(mut self) -> Self {
        self.with_payments = false;
        self.config.stripe.secret_key = None;
        self
    }

    pub fn without_webhook_secret(mut self) -> Self {
        self.config.stripe.webhook_secret = None;
        self
    }

    pub fn build(self) -> TestApp {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts(self.accounts));
        let payments = Arc::new(MockPaymentProvider::new());
        let text = Arc::new(MockTextProvider::new(self.behavior));

        let state = AppState {
            config: Arc::new(self.config),
            text_provider: text.clone(),
            accounts: if self.with_store {
                Some(accounts.clone() as Arc<dyn AccountStore>)
            } else {
                None
            },
            payments: if self.with_payments {
                Some(payments.clone() as Arc<dyn PaymentProvider>)
            } else {
                None
            },
        };

        TestApp {
            router: build_router(state.clone()),
            state,
            accounts,
            payments,
            text,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            behavior: MockBehavior::Respond("Texte généré".to_string()),
            accounts: Vec::new(),
            with_store: true,
            with_payments: true,
            config: test_config(),
        }
    }

    pub fn spawn() -> Self {
        Self::builder().build()
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::POST, uri, body).await
    }
}
