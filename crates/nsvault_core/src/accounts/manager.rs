//! The account manager.

use super::account::{hash_password, now_millis, Account, AccountView};
use super::api_key::{ensure_unique, KeySource, RandomKeySource};
use super::identity::AdminIdentitySource;
use crate::adapter::StorageAdapter;
use crate::error::{CoreError, CoreResult};
use crate::namespace::Namespace;
use crate::registry::NamespaceRegistry;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration key holding the account list.
pub const ACCOUNTS_CONFIG_KEY: &str = "accounts";

/// Tunables for account management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSettings {
    /// Whether accounts are issued API keys.
    pub api_keys_enabled: bool,
    /// How many candidate keys to draw before giving up.
    pub max_key_attempts: u32,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            api_keys_enabled: true,
            max_key_attempts: 20,
        }
    }
}

impl AccountSettings {
    /// Enables or disables API-key issuance.
    #[must_use]
    pub fn api_keys_enabled(mut self, enabled: bool) -> Self {
        self.api_keys_enabled = enabled;
        self
    }

    /// Sets the number of draws allowed per key.
    #[must_use]
    pub fn max_key_attempts(mut self, attempts: u32) -> Self {
        self.max_key_attempts = attempts;
        self
    }
}

/// Why an authentication attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The account exists but is disabled.
    Disabled,
    /// The password does not match.
    PasswordMismatch,
    /// The username is empty, so there is nothing to check or sign up.
    EmptyUsername,
}

/// Result of [`AccountManager::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credentials were accepted.
    Success {
        /// True if the account was created by this call.
        created: bool,
    },
    /// The credentials were refused.
    Failure(AuthFailure),
}

impl AuthOutcome {
    /// Returns true for [`AuthOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }
}

/// Manages the account list stored in the accounts namespace.
///
/// Every operation first re-derives the administrator from the configured
/// [`AdminIdentitySource`] ("self-heal") and runs under the adapter's write
/// lock, so a load, mutation and store never interleave with another
/// operation on the same adapter.
pub struct AccountManager {
    adapter: Arc<StorageAdapter>,
    admin: Arc<dyn AdminIdentitySource>,
    keys: Arc<dyn KeySource>,
    settings: AccountSettings,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("namespace", self.adapter.namespace())
            .field("settings", &self.settings)
            .finish()
    }
}

impl AccountManager {
    /// Creates a manager over an initialized adapter.
    pub fn new(adapter: Arc<StorageAdapter>, admin: Arc<dyn AdminIdentitySource>) -> Self {
        Self {
            adapter,
            admin,
            keys: Arc::new(RandomKeySource),
            settings: AccountSettings::default(),
        }
    }

    /// Creates a manager over the registry's accounts namespace.
    pub async fn open(
        registry: &NamespaceRegistry,
        admin: Arc<dyn AdminIdentitySource>,
    ) -> CoreResult<Self> {
        let adapter = registry.get_or_create(Namespace::accounts()).await?;
        Ok(Self::new(adapter, admin))
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: AccountSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the API-key source.
    #[must_use]
    pub fn with_key_source(mut self, keys: Arc<dyn KeySource>) -> Self {
        self.keys = keys;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &AccountSettings {
        &self.settings
    }

    /// Returns the adapter the accounts are stored through.
    #[must_use]
    pub fn adapter(&self) -> &Arc<StorageAdapter> {
        &self.adapter
    }

    async fn load(&self) -> CoreResult<Vec<Account>> {
        match self.adapter.get_config(ACCOUNTS_CONFIG_KEY).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn save(&self, accounts: &[Account]) -> CoreResult<()> {
        self.adapter
            .set_config(ACCOUNTS_CONFIG_KEY, serde_json::to_value(accounts)?)
            .await?;
        Ok(())
    }

    fn assign_key(&self, account: &mut Account, seen: &mut HashSet<String>) -> CoreResult<bool> {
        if !self.settings.api_keys_enabled {
            return Ok(false);
        }
        ensure_unique(account, seen, self.keys.as_ref(), self.settings.max_key_attempts)
    }

    /// Keys held by every account except the one at `skip`.
    fn keys_except(accounts: &[Account], skip: Option<usize>) -> HashSet<String> {
        accounts
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .filter_map(|(_, account)| account.api_key.clone())
            .filter(|key| !key.is_empty())
            .collect()
    }

    /// Loads the list and brings it back in line with the configured admin.
    /// Callers hold the write lock.
    async fn heal(&self) -> CoreResult<Vec<Account>> {
        let mut accounts = self.load().await?;
        let identity = self.admin.admin_identity().await?;

        if accounts.is_empty() {
            let mut admin = Account::new(identity.username.as_str(), &identity.password, true);
            self.assign_key(&mut admin, &mut HashSet::new())?;
            accounts.push(admin);
            self.save(&accounts).await?;
            info!(username = %identity.username, "created default admin account");
            return Ok(accounts);
        }

        let original = accounts.clone();
        let flagged = accounts.iter().position(|a| a.is_admin);
        let named = accounts.iter().position(|a| a.username == identity.username);
        let admin_index = match (flagged, named) {
            (Some(_), Some(named)) => named,
            (Some(flagged), None) => flagged,
            (None, Some(named)) => named,
            (None, None) => {
                accounts.push(Account::new(identity.username.as_str(), &identity.password, true));
                accounts.len() - 1
            }
        };

        let password_hash = hash_password(&identity.password);
        for (i, account) in accounts.iter_mut().enumerate() {
            if i == admin_index {
                account.username.clone_from(&identity.username);
                account.password_hash.clone_from(&password_hash);
                account.is_admin = true;
                account.disabled = false;
            } else if account.is_admin {
                debug!(username = %account.username, "clearing stale admin flag");
                account.is_admin = false;
            }
        }

        let mut seen = HashSet::new();
        for account in &mut accounts {
            if self.assign_key(account, &mut seen)? {
                debug!(username = %account.username, "issued API key");
            }
        }

        if accounts != original {
            self.save(&accounts).await?;
            info!(username = %identity.username, "repaired admin account");
        }
        Ok(accounts)
    }

    /// Makes sure exactly one admin exists and matches the configured
    /// identity, and that every account holds a unique API key.
    ///
    /// Returns the resulting list. Persists only when something changed.
    pub async fn ensure_default_account(&self) -> CoreResult<Vec<Account>> {
        let _guard = self.adapter.write_lock().await;
        self.heal().await
    }

    /// Lists accounts, with secrets only if `include_sensitive`.
    pub async fn list_accounts(&self, include_sensitive: bool) -> CoreResult<Vec<AccountView>> {
        let _guard = self.adapter.write_lock().await;
        let accounts = self.heal().await?;
        Ok(accounts
            .into_iter()
            .map(|account| {
                if include_sensitive {
                    AccountView::Full(account)
                } else {
                    AccountView::Summary(account.summary())
                }
            })
            .collect())
    }

    /// Creates or overwrites an account and returns the stored record.
    ///
    /// An existing account keeps its creation time, timestamps and API key
    /// (unless the key collides with another account's).
    pub async fn upsert_account(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
        disabled: bool,
    ) -> CoreResult<Account> {
        let _guard = self.adapter.write_lock().await;
        let mut accounts = self.heal().await?;

        let index = match accounts.iter().position(|a| a.username == username) {
            Some(index) => {
                let account = &mut accounts[index];
                account.password_hash = hash_password(password);
                account.is_admin = is_admin;
                account.disabled = disabled;
                index
            }
            None => {
                let mut account = Account::new(username, password, is_admin);
                account.disabled = disabled;
                accounts.push(account);
                info!(username, is_admin, "account created");
                accounts.len() - 1
            }
        };

        let mut seen = Self::keys_except(&accounts, Some(index));
        self.assign_key(&mut accounts[index], &mut seen)?;

        self.save(&accounts).await?;
        Ok(accounts[index].clone())
    }

    /// Removes an account. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LastAccount`] if no account would remain; the
    /// stored list is left untouched.
    pub async fn remove_account(&self, username: &str) -> CoreResult<bool> {
        let _guard = self.adapter.write_lock().await;
        let accounts = self.heal().await?;
        let before = accounts.len();

        let remaining: Vec<Account> = accounts
            .into_iter()
            .filter(|a| a.username != username)
            .collect();
        if remaining.is_empty() {
            return Err(CoreError::LastAccount);
        }

        let removed = remaining.len() != before;
        self.save(&remaining).await?;
        if removed {
            info!(username, "account removed");
        }
        Ok(removed)
    }

    /// Checks credentials, signing up unknown users on first use.
    ///
    /// An empty username is refused without touching storage. A disabled
    /// account is refused before its password is checked. Success does not
    /// stamp `last_login`; see [`update_last_login`](Self::update_last_login).
    pub async fn authenticate(&self, username: &str, password: &str) -> CoreResult<AuthOutcome> {
        if username.is_empty() {
            debug!("authentication refused for empty username");
            return Ok(AuthOutcome::Failure(AuthFailure::EmptyUsername));
        }

        let _guard = self.adapter.write_lock().await;
        let mut accounts = self.heal().await?;

        let Some(index) = accounts.iter().position(|a| a.username == username) else {
            let mut account = Account::new(username, password, false);
            let mut seen = Self::keys_except(&accounts, None);
            self.assign_key(&mut account, &mut seen)?;
            accounts.push(account);
            self.save(&accounts).await?;
            info!(username, "account created on first login");
            return Ok(AuthOutcome::Success { created: true });
        };

        let account = &accounts[index];
        let outcome = if account.disabled {
            AuthOutcome::Failure(AuthFailure::Disabled)
        } else if !account.verify_password(password) {
            AuthOutcome::Failure(AuthFailure::PasswordMismatch)
        } else {
            AuthOutcome::Success { created: false }
        };
        debug!(username, success = outcome.is_success(), "authentication checked");
        Ok(outcome)
    }

    async fn find<T>(
        &self,
        select: impl Fn(&Account) -> bool,
        map: impl FnOnce(Account) -> T,
    ) -> CoreResult<Option<T>> {
        let _guard = self.adapter.write_lock().await;
        let accounts = self.heal().await?;
        Ok(accounts.into_iter().find(|a| select(a)).map(map))
    }

    /// Returns whether `username` is the admin. Unknown users are not.
    pub async fn is_admin(&self, username: &str) -> CoreResult<bool> {
        Ok(self
            .find(|a| a.username == username, |a| a.is_admin)
            .await?
            .unwrap_or(false))
    }

    /// Returns whether `username` is disabled. Unknown users are not.
    pub async fn is_disabled(&self, username: &str) -> CoreResult<bool> {
        Ok(self
            .find(|a| a.username == username, |a| a.disabled)
            .await?
            .unwrap_or(false))
    }

    /// Returns the full record for `username`.
    pub async fn get_account(&self, username: &str) -> CoreResult<Option<Account>> {
        self.find(|a| a.username == username, |a| a).await
    }

    /// Returns the enabled account holding `api_key`.
    pub async fn get_account_by_api_key(&self, api_key: &str) -> CoreResult<Option<Account>> {
        if api_key.is_empty() {
            return Ok(None);
        }
        self.find(
            |a| !a.disabled && a.api_key.as_deref() == Some(api_key),
            |a| a,
        )
        .await
    }

    /// Returns the API key of `username`.
    pub async fn get_account_api_key(&self, username: &str) -> CoreResult<Option<String>> {
        Ok(self
            .find(|a| a.username == username, |a| a.api_key)
            .await?
            .flatten())
    }

    /// Sets the disabled flag. Returns whether the account exists.
    ///
    /// The list is written back either way.
    pub async fn set_disabled(&self, username: &str, disabled: bool) -> CoreResult<bool> {
        let _guard = self.adapter.write_lock().await;
        let mut accounts = self.heal().await?;

        let found = match accounts.iter_mut().find(|a| a.username == username) {
            Some(account) => {
                account.disabled = disabled;
                true
            }
            None => false,
        };
        self.save(&accounts).await?;
        if found {
            info!(username, disabled, "account disabled flag set");
        }
        Ok(found)
    }

    /// Stamps the current time as `username`'s last login.
    pub async fn update_last_login(&self, username: &str) -> CoreResult<()> {
        self.stamp(username, |account, now| account.last_login = Some(now))
            .await
    }

    /// Stamps the current time as `username`'s last API call.
    pub async fn update_last_call(&self, username: &str) -> CoreResult<()> {
        self.stamp(username, |account, now| account.last_call = Some(now))
            .await
    }

    async fn stamp(&self, username: &str, apply: impl FnOnce(&mut Account, u64)) -> CoreResult<()> {
        if username.is_empty() {
            return Ok(());
        }
        let _guard = self.adapter.write_lock().await;
        let mut accounts = self.heal().await?;
        if let Some(account) = accounts.iter_mut().find(|a| a.username == username) {
            apply(account, now_millis());
        }
        self.save(&accounts).await
    }

    /// Replaces `username`'s API key and returns the new one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ApiKeysDisabled`] when key issuance is off and
    /// [`CoreError::AccountNotFound`] for unknown users.
    pub async fn refresh_api_key(&self, username: &str) -> CoreResult<String> {
        if !self.settings.api_keys_enabled {
            return Err(CoreError::ApiKeysDisabled);
        }
        let _guard = self.adapter.write_lock().await;
        let mut accounts = self.heal().await?;

        let index = accounts
            .iter()
            .position(|a| a.username == username)
            .ok_or_else(|| CoreError::account_not_found(username))?;

        let mut seen = Self::keys_except(&accounts, None);
        let account = &mut accounts[index];
        account.api_key = None;
        ensure_unique(
            account,
            &mut seen,
            self.keys.as_ref(),
            self.settings.max_key_attempts,
        )?;
        let key = account.api_key.clone().unwrap_or_default();

        self.save(&accounts).await?;
        info!(username, "API key refreshed");
        Ok(key)
    }
}
