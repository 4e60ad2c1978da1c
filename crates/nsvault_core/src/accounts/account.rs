//! Account records and their listing views.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// One stored account.
///
/// Fields missing from older records deserialize with their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique login name.
    pub username: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_hash: String,
    /// Whether this is the administrator account.
    #[serde(default)]
    pub is_admin: bool,
    /// Disabled accounts cannot authenticate or be found by API key.
    #[serde(default)]
    pub disabled: bool,
    /// Creation time in Unix milliseconds.
    #[serde(default)]
    pub created_at: u64,
    /// Last login time in Unix milliseconds.
    #[serde(default)]
    pub last_login: Option<u64>,
    /// Last API call time in Unix milliseconds.
    #[serde(default)]
    pub last_call: Option<u64>,
    /// API key, unique within the account list.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Account {
    /// Creates an enabled account stamped with the current time.
    pub fn new(username: impl Into<String>, password: &str, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            password_hash: hash_password(password),
            is_admin,
            disabled: false,
            created_at: now_millis(),
            last_login: None,
            last_call: None,
            api_key: None,
        }
    }

    /// Returns true if `password` hashes to the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }

    /// Returns the view of this account without secrets.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            username: self.username.clone(),
            is_admin: self.is_admin,
            disabled: self.disabled,
            last_login: self.last_login,
            last_call: self.last_call,
        }
    }
}

/// An account without its password hash or API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Login name.
    pub username: String,
    /// Whether this is the administrator account.
    pub is_admin: bool,
    /// Whether the account is disabled.
    pub disabled: bool,
    /// Last login time in Unix milliseconds.
    pub last_login: Option<u64>,
    /// Last API call time in Unix milliseconds.
    pub last_call: Option<u64>,
}

/// An entry returned by account listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccountView {
    /// The complete record, secrets included.
    Full(Account),
    /// The sanitized record.
    Summary(AccountSummary),
}

impl AccountView {
    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            AccountView::Full(account) => &account.username,
            AccountView::Summary(summary) => &summary.username,
        }
    }

    /// Returns whether this is the administrator account.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        match self {
            AccountView::Full(account) => account.is_admin,
            AccountView::Summary(summary) => summary.is_admin,
        }
    }

    /// Returns whether the account is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        match self {
            AccountView::Full(account) => account.disabled,
            AccountView::Summary(summary) => summary.disabled,
        }
    }
}

/// Hashes a password as lowercase hex SHA-256 of its UTF-8 bytes.
#[must_use]
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Current time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_hash_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_password(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let hash = hash_password("s3cret");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn legacy_record_gets_defaults() {
        let account: Account = serde_json::from_value(json!({
            "username": "alice",
            "password_hash": hash_password("pw"),
            "is_admin": false
        }))
        .unwrap();

        assert!(!account.disabled);
        assert_eq!(account.created_at, 0);
        assert_eq!(account.last_login, None);
        assert_eq!(account.api_key, None);
        assert!(account.verify_password("pw"));
        assert!(!account.verify_password("PW"));
    }

    #[test]
    fn summary_serialization_has_no_secrets() {
        let mut account = Account::new("bob", "pw", false);
        account.api_key = Some("key".into());

        let full = serde_json::to_value(AccountView::Full(account.clone())).unwrap();
        assert!(full.get("password_hash").is_some());
        assert_eq!(full["api_key"], json!("key"));

        let summary = serde_json::to_value(AccountView::Summary(account.summary())).unwrap();
        assert!(summary.get("password_hash").is_none());
        assert!(summary.get("api_key").is_none());
        assert_eq!(summary["username"], json!("bob"));
    }
}
