//! Storage backend trait definition.

use crate::error::StorageResult;
use crate::kind::BackendKind;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A JSON object: the shape of credential data, credential state and
/// usage statistics.
pub type Record = Map<String, Value>;

/// The capability contract every storage variant implements.
///
/// A backend holds four independent spaces for one namespace:
///
/// - **credentials**: named JSON documents
/// - **credential state**: a mutable JSON object per credential name
/// - **configuration**: arbitrary JSON values under string keys
/// - **usage statistics**: counters per credential name
///
/// # Invariants
///
/// - Reading a missing key returns an empty or absent value, never an error
/// - `store_*`, `update_*`, `set_*` and `delete_*` return `true` on success;
///   `delete_*` returns `false` when nothing was there
/// - `update_*` merges the given fields into the stored object (shallow)
/// - `delete_credential` also drops the credential's state and statistics
/// - Two variants given the same sequence of calls return the same results
///
/// # Implementors
///
/// - [`super::FileBackend`] - JSON files under a per-namespace directory
/// - [`super::InMemoryBackend`] - For testing and ephemeral use
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns which variant this is.
    fn kind(&self) -> BackendKind;

    /// Prepares the backend for use (create directories, open connections).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be made ready. Callers treat
    /// this as "variant unavailable".
    async fn initialize(&self) -> StorageResult<()>;

    /// Releases resources held by the backend.
    ///
    /// Closing an already closed backend is a no-op.
    async fn close(&self) -> StorageResult<()>;

    /// Stores a credential document, replacing any previous one.
    async fn store_credential(&self, name: &str, data: Record) -> StorageResult<bool>;

    /// Returns a credential document, if present.
    async fn get_credential(&self, name: &str) -> StorageResult<Option<Record>>;

    /// Lists the names of all stored credentials in ascending order.
    async fn list_credentials(&self) -> StorageResult<Vec<String>>;

    /// Deletes a credential together with its state and statistics.
    async fn delete_credential(&self, name: &str) -> StorageResult<bool>;

    /// Merges `updates` into the state of a credential.
    async fn update_credential_state(&self, name: &str, updates: Record) -> StorageResult<bool>;

    /// Returns the state of a credential (empty if none was recorded).
    async fn get_credential_state(&self, name: &str) -> StorageResult<Record>;

    /// Returns the state of every credential that has one.
    async fn get_all_credential_states(&self) -> StorageResult<BTreeMap<String, Record>>;

    /// Sets a configuration value.
    async fn set_config(&self, key: &str, value: Value) -> StorageResult<bool>;

    /// Returns a configuration value, if present.
    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Returns all configuration values.
    async fn get_all_config(&self) -> StorageResult<Map<String, Value>>;

    /// Deletes a configuration value.
    async fn delete_config(&self, key: &str) -> StorageResult<bool>;

    /// Merges `updates` into the usage statistics of a credential.
    async fn update_usage_stats(&self, name: &str, updates: Record) -> StorageResult<bool>;

    /// Returns the usage statistics of a credential (empty if none).
    async fn get_usage_stats(&self, name: &str) -> StorageResult<Record>;

    /// Returns the usage statistics of every credential that has them.
    async fn get_all_usage_stats(&self) -> StorageResult<BTreeMap<String, Record>>;

    /// Describes where the backend keeps its data (paths, endpoints).
    ///
    /// Informational only; never contains secrets.
    fn details(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Returns the backend's own export/import implementation, if it has one.
    fn credential_transfer(&self) -> Option<&dyn CredentialTransfer> {
        None
    }
}

/// Native single-credential export/import offered by some backends.
///
/// Backends without one get a generic implementation from the layer above,
/// built on `get_credential`/`store_credential`.
#[async_trait]
pub trait CredentialTransfer: Send + Sync {
    /// Writes credential `name` to `output` as a JSON document.
    ///
    /// Returns `false` if the credential does not exist.
    async fn export_credential(&self, name: &str, output: &Path) -> StorageResult<bool>;

    /// Reads a JSON document from `input` and stores it as credential `name`.
    async fn import_credential(&self, input: &Path, name: &str) -> StorageResult<bool>;
}

/// Shallow-merges `updates` into `target`, overwriting existing fields.
pub fn merge_record(target: &mut Record, updates: Record) {
    for (key, value) in updates {
        target.insert(key, value);
    }
}
