//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Lookups of missing keys are not errors: they return an empty or absent
/// value. These variants cover genuine failures of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored or supplied document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A credential name is not usable as a storage key.
    #[error("invalid credential name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The stored data does not have the expected shape.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A document handed to the backend is not a JSON object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The backend was used after `close()`.
    #[error("storage is closed")]
    Closed,

    /// Failure reported by an external backend implementation.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}

/// Suffix of the file variant's in-flight temporary files.
///
/// Names ending with it are reserved so listings agree across variants.
pub const TEMP_SUFFIX: &str = ".nsvault-tmp";

/// Checks that a credential name can be used as a key by every variant.
///
/// Names become file names in the file variant, so separators and parent
/// references are rejected everywhere to keep variants interchangeable.
pub fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_name(name, "name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(StorageError::invalid_name(name, "name contains a path separator"));
    }
    if name == "." || name == ".." {
        return Err(StorageError::invalid_name(name, "name is a directory reference"));
    }
    if name.contains('\0') {
        return Err(StorageError::invalid_name(name, "name contains a NUL byte"));
    }
    if name.ends_with(TEMP_SUFFIX) {
        return Err(StorageError::invalid_name(
            name,
            "name ends with the reserved temporary suffix",
        ));
    }
    Ok(())
}
