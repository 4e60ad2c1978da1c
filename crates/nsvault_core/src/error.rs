//! Error types for nsvault core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in nsvault core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] nsvault_storage::StorageError),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A storage adapter was used before `initialize()` completed.
    #[error("storage adapter for namespace {namespace} not initialized")]
    NotInitialized {
        /// Namespace key of the adapter.
        namespace: String,
    },

    /// Every backend variant, including the file fallback, failed.
    #[error("no storage backend available for namespace {namespace}: {reason}")]
    NoBackendAvailable {
        /// Namespace key of the adapter.
        namespace: String,
        /// Why the last variant failed.
        reason: String,
    },

    /// No account with this username exists.
    #[error("account not found: {username}")]
    AccountNotFound {
        /// The username that was looked up.
        username: String,
    },

    /// Removing the account would leave the store empty.
    #[error("at least one account must remain")]
    LastAccount,

    /// API-key generation could not find an unused key.
    #[error("API key space exhausted after {attempts} attempts")]
    KeySpaceExhausted {
        /// Number of draws made.
        attempts: u32,
    },

    /// API-key issuance is switched off.
    #[error("API key issuance is disabled")]
    ApiKeysDisabled,

    /// The external admin identity could not be resolved.
    #[error("admin identity unavailable: {message}")]
    AdminIdentity {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-initialized error.
    pub fn not_initialized(namespace: impl Into<String>) -> Self {
        Self::NotInitialized {
            namespace: namespace.into(),
        }
    }

    /// Creates an account-not-found error.
    pub fn account_not_found(username: impl Into<String>) -> Self {
        Self::AccountNotFound {
            username: username.into(),
        }
    }

    /// Creates an admin identity error.
    pub fn admin_identity(message: impl Into<String>) -> Self {
        Self::AdminIdentity {
            message: message.into(),
        }
    }

    /// Returns true for errors that signal a bug or a broken environment
    /// rather than a condition the caller can act on.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CoreError::NotInitialized { .. }
                | CoreError::NoBackendAvailable { .. }
                | CoreError::KeySpaceExhausted { .. }
                | CoreError::Storage(_)
                | CoreError::Serialization(_)
                | CoreError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(CoreError::KeySpaceExhausted { attempts: 20 }.is_internal());
        assert!(CoreError::not_initialized("accounts").is_internal());
        assert!(!CoreError::LastAccount.is_internal());
        assert!(!CoreError::account_not_found("bob").is_internal());
    }

    #[test]
    fn error_display() {
        let msg = CoreError::KeySpaceExhausted { attempts: 20 }.to_string();
        assert!(msg.contains("20"));
        let msg = CoreError::account_not_found("bob").to_string();
        assert!(msg.contains("bob"));
    }
}
