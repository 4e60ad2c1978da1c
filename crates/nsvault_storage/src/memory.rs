//! In-memory storage backend for testing.

use crate::backend::{merge_record, Record, StorageBackend};
use crate::error::{validate_name, StorageError, StorageResult};
use crate::kind::BackendKind;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Spaces {
    credentials: BTreeMap<String, Record>,
    states: BTreeMap<String, Record>,
    config: Map<String, Value>,
    usage: BTreeMap<String, Record>,
}

/// An in-memory storage backend.
///
/// This backend keeps all data in process memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral deployments that don't need persistence
///
/// It offers no native credential transfer, so export/import goes through
/// the generic path of the layer above.
///
/// # Example
///
/// ```rust
/// use nsvault_storage::{InMemoryBackend, StorageBackend};
/// use serde_json::json;
///
/// # tokio_test_block(async {
/// let backend = InMemoryBackend::new();
/// backend.initialize().await.unwrap();
/// backend.set_config("theme", json!("dark")).await.unwrap();
/// assert_eq!(backend.get_config("theme").await.unwrap(), Some(json!("dark")));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    spaces: RwLock<Spaces>,
    closed: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            spaces: RwLock::new(Spaces::default()),
            closed: AtomicBool::new(false),
        }
    }
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all data from the backend.
    pub fn clear(&self) {
        *self.spaces.write() = Spaces::default();
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn initialize(&self) -> StorageResult<()> {
        self.closed.store(false, Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn store_credential(&self, name: &str, data: Record) -> StorageResult<bool> {
        self.check_open()?;
        validate_name(name)?;
        self.spaces.write().credentials.insert(name.to_string(), data);
        Ok(true)
    }

    async fn get_credential(&self, name: &str) -> StorageResult<Option<Record>> {
        self.check_open()?;
        Ok(self.spaces.read().credentials.get(name).cloned())
    }

    async fn list_credentials(&self) -> StorageResult<Vec<String>> {
        self.check_open()?;
        Ok(self.spaces.read().credentials.keys().cloned().collect())
    }

    async fn delete_credential(&self, name: &str) -> StorageResult<bool> {
        self.check_open()?;
        let mut spaces = self.spaces.write();
        let existed = spaces.credentials.remove(name).is_some();
        spaces.states.remove(name);
        spaces.usage.remove(name);
        Ok(existed)
    }

    async fn update_credential_state(&self, name: &str, updates: Record) -> StorageResult<bool> {
        self.check_open()?;
        validate_name(name)?;
        let mut spaces = self.spaces.write();
        merge_record(spaces.states.entry(name.to_string()).or_default(), updates);
        Ok(true)
    }

    async fn get_credential_state(&self, name: &str) -> StorageResult<Record> {
        self.check_open()?;
        Ok(self.spaces.read().states.get(name).cloned().unwrap_or_default())
    }

    async fn get_all_credential_states(&self) -> StorageResult<BTreeMap<String, Record>> {
        self.check_open()?;
        Ok(self.spaces.read().states.clone())
    }

    async fn set_config(&self, key: &str, value: Value) -> StorageResult<bool> {
        self.check_open()?;
        self.spaces.write().config.insert(key.to_string(), value);
        Ok(true)
    }

    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>> {
        self.check_open()?;
        Ok(self.spaces.read().config.get(key).cloned())
    }

    async fn get_all_config(&self) -> StorageResult<Map<String, Value>> {
        self.check_open()?;
        Ok(self.spaces.read().config.clone())
    }

    async fn delete_config(&self, key: &str) -> StorageResult<bool> {
        self.check_open()?;
        Ok(self.spaces.write().config.remove(key).is_some())
    }

    async fn update_usage_stats(&self, name: &str, updates: Record) -> StorageResult<bool> {
        self.check_open()?;
        validate_name(name)?;
        let mut spaces = self.spaces.write();
        merge_record(spaces.usage.entry(name.to_string()).or_default(), updates);
        Ok(true)
    }

    async fn get_usage_stats(&self, name: &str) -> StorageResult<Record> {
        self.check_open()?;
        Ok(self.spaces.read().usage.get(name).cloned().unwrap_or_default())
    }

    async fn get_all_usage_stats(&self) -> StorageResult<BTreeMap<String, Record>> {
        self.check_open()?;
        Ok(self.spaces.read().usage.clone())
    }
}
