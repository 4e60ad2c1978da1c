//! Account management on top of the `accounts` namespace.
//!
//! Accounts are stored as one JSON array under the configuration key
//! [`ACCOUNTS_CONFIG_KEY`]. Every operation reloads the list, re-applies the
//! configured admin identity, mutates in memory and writes the list back.

mod account;
mod api_key;
mod identity;
mod manager;

pub use account::{hash_password, now_millis, Account, AccountSummary, AccountView};
pub use api_key::{ensure_unique, KeySource, RandomKeySource, API_KEY_LENGTH};
pub use identity::{
    AdminIdentity, AdminIdentitySource, EnvAdminIdentity, StaticAdminIdentity,
    ADMIN_PASSWORD_VAR, ADMIN_USERNAME_VAR,
};
pub use manager::{
    AccountManager, AccountSettings, AuthFailure, AuthOutcome, ACCOUNTS_CONFIG_KEY,
};
