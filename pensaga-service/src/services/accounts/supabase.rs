//! Supabase (PostgREST) account store.
//!
//! Talks to `{SUPABASE_URL}/rest/v1` with `apikey` + bearer headers. The
//! service-role key is preferred when configured since account mutations
//! must bypass row-level security; otherwise the standard key is used.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;
use service_core::observability::{TracedClientExt, TracedRequest};

use super::{AccountStore, StoreError};
use crate::config::SupabaseConfig;
use crate::models::{Account, AccountUpdate};

const ACCOUNTS_TABLE: &str = "user_extend";
const PROCESSED_SESSIONS_TABLE: &str = "processed_sessions";
const ACCOUNT_COLUMNS: &str = "id,has_subscription,token,preferences";

#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    key: Secret<String>,
}

impl SupabaseStore {
    /// Build the store client. Fails when URL or key is missing.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                StoreError::NotConfigured("Les configurations Supabase ne sont pas définies".into())
            })?;

        let key = config
            .service_key
            .clone()
            .or_else(|| config.key.clone())
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| {
                StoreError::NotConfigured("Les configurations Supabase ne sont pas définies".into())
            })?;

        Ok(Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorize(&self, request: TracedRequest) -> TracedRequest {
        let key = self.key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn request_error(err: reqwest::Error) -> StoreError {
    StoreError::Request(err.to_string())
}

#[async_trait]
impl AccountStore for SupabaseStore {
    async fn get_account(&self, user_id: &str) -> Result<Option<Account>, StoreError> {
        let id_filter = format!("eq.{}", user_id);
        let response = self
            .authorize(self.client.traced_get(&self.table_url(ACCOUNTS_TABLE)))
            .query(&[("id", id_filter.as_str()), ("select", ACCOUNT_COLUMNS)])
            .send()
            .await
            .map_err(request_error)?;

        let rows: Vec<Account> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn update_account(
        &self,
        user_id: &str,
        update: &AccountUpdate,
    ) -> Result<(), StoreError> {
        let id_filter = format!("eq.{}", user_id);
        let response = self
            .authorize(self.client.traced_patch(&self.table_url(ACCOUNTS_TABLE)))
            .query(&[("id", id_filter.as_str()), ("select", "id")])
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .await
            .map_err(request_error)?;

        let rows: Vec<serde_json::Value> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        // PATCH matching no row still answers 200 with an empty list.
        if rows.is_empty() {
            return Err(StoreError::NotFound(user_id.to_string()));
        }

        tracing::debug!(user_id = %user_id, "Account updated");
        Ok(())
    }

    async fn claim_session(&self, session_id: &str) -> Result<bool, StoreError> {
        let response = self
            .authorize(
                self.client
                    .traced_post(&self.table_url(PROCESSED_SESSIONS_TABLE)),
            )
            .header("Prefer", "return=minimal")
            .json(&json!({ "session_id": session_id }))
            .send()
            .await
            .map_err(request_error)?;

        // Primary key violation.
        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }

        Self::check(response).await?;
        Ok(true)
    }

    async fn release_session(&self, session_id: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{}", session_id);
        let response = self
            .authorize(
                self.client
                    .traced_delete(&self.table_url(PROCESSED_SESSIONS_TABLE)),
            )
            .query(&[("session_id", filter.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, key: Option<&str>, service_key: Option<&str>) -> SupabaseConfig {
        SupabaseConfig {
            url: url.map(str::to_string),
            key: key.map(|k| Secret::new(k.to_string())),
            service_key: service_key.map(|k| Secret::new(k.to_string())),
        }
    }

    #[test]
    fn construction_requires_url_and_key() {
        assert!(SupabaseStore::new(&config(None, Some("anon"), None)).is_err());
        assert!(SupabaseStore::new(&config(Some("https://x.supabase.co"), None, None)).is_err());
        assert!(SupabaseStore::new(&config(Some("https://x.supabase.co"), Some("anon"), None)).is_ok());
    }

    #[test]
    fn service_key_takes_precedence() {
        let store = SupabaseStore::new(&config(
            Some("https://x.supabase.co/"),
            Some("anon"),
            Some("service"),
        ))
        .unwrap();

        assert_eq!(store.key.expose_secret(), "service");
        assert_eq!(
            store.table_url(ACCOUNTS_TABLE),
            "https://x.supabase.co/rest/v1/user_extend"
        );
    }
}
