use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preferences key holding the payment provider's subscription id.
pub const SUBSCRIPTION_REF_KEY: &str = "stripe_subscription_id";

/// A row of the `user_extend` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub has_subscription: bool,
    /// Token balance. Unsigned: the balance can never go negative.
    #[serde(default)]
    pub token: u64,
    #[serde(default, deserialize_with = "preferences_or_empty")]
    pub preferences: Map<String, Value>,
}

impl Account {
    pub fn subscription_ref(&self) -> Option<&str> {
        self.preferences
            .get(SUBSCRIPTION_REF_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Partial update written with a single PATCH.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_subscription: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Map<String, Value>>,
}

impl AccountUpdate {
    /// Grant the subscription: flag and reference are written together.
    pub fn activate_subscription(account: &Account, subscription_ref: Option<&str>) -> Self {
        let mut preferences = account.preferences.clone();
        if let Some(reference) = subscription_ref {
            preferences.insert(
                SUBSCRIPTION_REF_KEY.to_string(),
                Value::String(reference.to_string()),
            );
        }
        Self {
            has_subscription: Some(true),
            preferences: Some(preferences),
            ..Default::default()
        }
    }

    /// Revoke the subscription and drop the stored reference.
    pub fn revoke_subscription(account: &Account) -> Self {
        let mut preferences = account.preferences.clone();
        preferences.remove(SUBSCRIPTION_REF_KEY);
        Self {
            has_subscription: Some(false),
            preferences: Some(preferences),
            ..Default::default()
        }
    }

    pub fn set_balance(token: u64) -> Self {
        Self {
            token: Some(token),
            ..Default::default()
        }
    }
}

// The column is nullable; a SQL NULL becomes an empty map.
fn preferences_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Map<String, Value>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_preferences_deserialize_as_empty() {
        let account: Account = serde_json::from_value(json!({
            "id": "u1",
            "has_subscription": false,
            "token": 5,
            "preferences": null
        }))
        .unwrap();

        assert!(account.preferences.is_empty());
        assert_eq!(account.token, 5);
    }

    #[test]
    fn negative_balance_is_rejected() {
        let result: Result<Account, _> = serde_json::from_value(json!({
            "id": "u1",
            "token": -3
        }));
        assert!(result.is_err());
    }

    #[test]
    fn activation_keeps_existing_preferences() {
        let account: Account = serde_json::from_value(json!({
            "id": "u1",
            "preferences": { "theme": "dark" }
        }))
        .unwrap();

        let update = AccountUpdate::activate_subscription(&account, Some("sub_123"));
        let prefs = update.preferences.unwrap();

        assert_eq!(update.has_subscription, Some(true));
        assert_eq!(prefs["theme"], "dark");
        assert_eq!(prefs[SUBSCRIPTION_REF_KEY], "sub_123");
    }

    #[test]
    fn revocation_removes_reference() {
        let account: Account = serde_json::from_value(json!({
            "id": "u1",
            "has_subscription": true,
            "preferences": { "stripe_subscription_id": "sub_123", "theme": "dark" }
        }))
        .unwrap();
        assert_eq!(account.subscription_ref(), Some("sub_123"));

        let update = AccountUpdate::revoke_subscription(&account);
        let prefs = update.preferences.unwrap();

        assert_eq!(update.has_subscription, Some(false));
        assert!(!prefs.contains_key(SUBSCRIPTION_REF_KEY));
        assert_eq!(prefs["theme"], "dark");
    }

    #[test]
    fn update_serializes_only_set_fields() {
        let body = serde_json::to_value(AccountUpdate::set_balance(150)).unwrap();
        assert_eq!(body, json!({ "token": 150 }));
    }
}
