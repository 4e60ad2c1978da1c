//! # nsvault Core
//!
//! Namespace-scoped storage and account management for nsvault.
//!
//! This crate provides:
//! - [`StorageAdapter`]: binds one namespace to one backend, chosen by
//!   priority (Redis, Postgres, MongoDB, then the file fallback)
//! - [`NamespaceRegistry`]: at most one adapter per namespace, created atomically
//! - [`StorageContext`]: request-scoped choice of the active namespace
//! - [`AccountManager`]: self-healing admin account, unique API keys and
//!   sign-up-on-first-use authentication
//!
//! # Backend selection
//!
//! Selection walks a [`BackendCatalog`] of [`BackendFactory`] entries. Remote
//! variants are placeholders until a real factory is registered for their
//! [`BackendKind`](nsvault_storage::BackendKind); the file backend always
//! terminates the walk.
//!
//! ```rust,ignore
//! use nsvault_core::{AccountManager, EnvAdminIdentity, NamespaceRegistry};
//! use std::sync::Arc;
//!
//! let registry = NamespaceRegistry::global();
//! let accounts = AccountManager::open(&registry, Arc::new(EnvAdminIdentity)).await?;
//! let outcome = accounts.authenticate("alice", "secret").await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod accounts;
mod adapter;
mod config;
mod context;
mod error;
mod factory;
mod namespace;
mod registry;

pub use accounts::{
    ensure_unique, hash_password, now_millis, Account, AccountManager, AccountSettings,
    AccountSummary, AccountView, AdminIdentity, AdminIdentitySource, AuthFailure, AuthOutcome,
    EnvAdminIdentity, KeySource, RandomKeySource, StaticAdminIdentity, ACCOUNTS_CONFIG_KEY,
    ADMIN_PASSWORD_VAR, ADMIN_USERNAME_VAR, API_KEY_LENGTH,
};
pub use adapter::{BackendInfo, StorageAdapter};
pub use config::{StorageConfig, DATA_DIR_VAR, MONGODB_URI_VAR, POSTGRES_DSN_VAR, REDIS_URI_VAR};
pub use context::StorageContext;
pub use error::{CoreError, CoreResult};
pub use factory::{
    BackendCatalog, BackendFactory, FileFactory, MemoryFactory, UnlinkedFactory, Unavailable,
};
pub use namespace::{Namespace, ACCOUNTS_NAMESPACE, DEFAULT_NAMESPACE_KEY};
pub use registry::NamespaceRegistry;
