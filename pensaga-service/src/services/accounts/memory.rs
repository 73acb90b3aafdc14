//! In-memory account store for tests and local development.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{AccountStore, StoreError};
use crate::models::{Account, AccountUpdate};

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
    processed: Mutex<HashSet<String>>,
    fail_updates: AtomicBool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts.into_iter().map(|a| (a.id.clone(), a)).collect()),
            ..Default::default()
        }
    }

    /// Make every subsequent `update_account` fail.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub async fn account(&self, user_id: &str) -> Option<Account> {
        self.accounts.lock().await.get(user_id).cloned()
    }

    pub async fn is_processed(&self, session_id: &str) -> bool {
        self.processed.lock().await.contains(session_id)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_account(&self, user_id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.lock().await.get(user_id).cloned())
    }

    async fn update_account(
        &self,
        user_id: &str,
        update: &AccountUpdate,
    ) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Request("simulated write failure".to_string()));
        }

        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;

        if let Some(flag) = update.has_subscription {
            account.has_subscription = flag;
        }
        if let Some(token) = update.token {
            account.token = token;
        }
        if let Some(preferences) = &update.preferences {
            account.preferences = preferences.clone();
        }
        Ok(())
    }

    async fn claim_session(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.processed.lock().await.insert(session_id.to_string()))
    }

    async fn release_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.processed.lock().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let store = InMemoryAccountStore::new();

        assert!(store.claim_session("cs_1").await.unwrap());
        assert!(!store.claim_session("cs_1").await.unwrap());

        store.release_session("cs_1").await.unwrap();
        assert!(store.claim_session("cs_1").await.unwrap());
    }

    #[tokio::test]
    async fn update_of_unknown_account_fails() {
        let store = InMemoryAccountStore::new();
        let err = store
            .update_account("ghost", &AccountUpdate::set_balance(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
