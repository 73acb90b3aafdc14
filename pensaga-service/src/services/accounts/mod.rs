//! Account store abstraction.
//!
//! The account table lives in a hosted relational store. Handlers only see
//! [`AccountStore`], so tests can swap in [`InMemoryAccountStore`].

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Account, AccountUpdate};

pub use memory::InMemoryAccountStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account by user id. `Ok(None)` when no row matches.
    async fn get_account(&self, user_id: &str) -> Result<Option<Account>, StoreError>;

    /// Apply a partial update to an existing account.
    async fn update_account(&self, user_id: &str, update: &AccountUpdate)
    -> Result<(), StoreError>;

    /// Atomically record `session_id` as processed.
    ///
    /// Returns `true` when this call inserted the marker and `false` when the
    /// session had already been claimed.
    async fn claim_session(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Drop a claim so that a failed fulfillment can be retried.
    async fn release_session(&self, session_id: &str) -> Result<(), StoreError>;
}
