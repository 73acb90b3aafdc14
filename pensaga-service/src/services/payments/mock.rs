//! In-memory payment provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{
    CheckoutParams, CheckoutSession, PaymentError, PaymentProvider, PaymentSession,
    validate_object_id,
};

#[derive(Default)]
pub struct MockPaymentProvider {
    sessions: Mutex<HashMap<String, PaymentSession>>,
    created: Mutex<Vec<CheckoutParams>>,
    cancellations: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    fail_create: AtomicBool,
    fail_cancel: AtomicBool,
    fail_cancel_at_period_end: AtomicBool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session that `retrieve_session` will return.
    pub async fn insert_session(&self, session: PaymentSession) {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cancel_at_period_end(&self, fail: bool) {
        self.fail_cancel_at_period_end.store(fail, Ordering::SeqCst);
    }

    /// Parameters of every checkout session created so far.
    pub async fn created(&self) -> Vec<CheckoutParams> {
        self.created.lock().await.clone()
    }

    /// Cancellation calls in order, as `"<kind>:<subscription id>"`.
    pub async fn cancellations(&self) -> Vec<String> {
        self.cancellations.lock().await.clone()
    }
}

fn rejected(message: &str) -> PaymentError {
    PaymentError::Api {
        status: 400,
        message: message.to_string(),
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(rejected("Invalid API Key provided"));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{}", n);
        self.created.lock().await.push(params.clone());

        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{}", id)),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, PaymentError> {
        validate_object_id(session_id)?;
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| rejected(&format!("No such checkout.session: '{}'", session_id)))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        validate_object_id(subscription_id)?;
        self.cancellations
            .lock()
            .await
            .push(format!("cancel:{}", subscription_id));
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(rejected("No such subscription"));
        }
        Ok(())
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), PaymentError> {
        validate_object_id(subscription_id)?;
        self.cancellations
            .lock()
            .await
            .push(format!("cancel_at_period_end:{}", subscription_id));
        if self.fail_cancel_at_period_end.load(Ordering::SeqCst) {
            return Err(rejected("No such subscription"));
        }
        Ok(())
    }
}
