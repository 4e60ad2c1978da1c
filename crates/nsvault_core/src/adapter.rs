//! The storage adapter: one lazily selected backend per namespace.

use crate::config::StorageConfig;
use crate::error::{CoreError, CoreResult};
use crate::factory::{BackendCatalog, Unavailable};
use crate::namespace::Namespace;
use nsvault_storage::{BackendKind, Record, StorageBackend, StorageError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Descriptive information about the backend an adapter is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    /// Namespace key of the adapter.
    pub namespace: String,
    /// The selected variant.
    pub kind: BackendKind,
    /// Whether the adapter is initialized (always true when info is available).
    pub initialized: bool,
    /// Backend-specific details such as directories.
    pub details: BTreeMap<String, String>,
}

/// Binds one namespace to exactly one storage backend.
///
/// The backend is chosen on first [`initialize`](Self::initialize) by walking
/// the [`BackendCatalog`] in priority order and keeping the first variant
/// that both builds and initializes. Every capability method afterwards is a
/// passthrough to that backend.
///
/// Adapters are created by [`crate::NamespaceRegistry`] only, which keeps
/// at most one per namespace.
pub struct StorageAdapter {
    namespace: Namespace,
    config: Arc<StorageConfig>,
    catalog: Arc<BackendCatalog>,
    backend: RwLock<Option<Arc<dyn StorageBackend>>>,
    init_lock: Mutex<()>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("namespace", &self.namespace)
            .field("backend", &self.backend_kind())
            .finish()
    }
}

impl StorageAdapter {
    pub(crate) fn new(
        namespace: Namespace,
        config: Arc<StorageConfig>,
        catalog: Arc<BackendCatalog>,
    ) -> Self {
        Self {
            namespace,
            config,
            catalog,
            backend: RwLock::new(None),
            init_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the namespace this adapter serves.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Selects and opens the backend.
    ///
    /// Idempotent: concurrent first callers wait for the one selection in
    /// progress; later callers return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoBackendAvailable`] only if every variant,
    /// including the file fallback, is unavailable.
    pub async fn initialize(&self) -> CoreResult<()> {
        let _guard = self.init_lock.lock().await;
        if self.backend.read().is_some() {
            return Ok(());
        }

        let backend = self.select_backend().await?;
        info!(
            namespace = %self.namespace,
            backend = %backend.kind(),
            "storage backend selected"
        );
        *self.backend.write() = Some(backend);
        Ok(())
    }

    async fn select_backend(&self) -> CoreResult<Arc<dyn StorageBackend>> {
        let mut last_failure = String::from("no backend factories registered");

        for factory in self.catalog.factories() {
            let kind = factory.kind();
            let backend = match factory.build(&self.config, &self.namespace) {
                Ok(backend) => backend,
                Err(Unavailable::NotConfigured) => {
                    debug!(namespace = %self.namespace, backend = %kind, "storage backend not configured");
                    continue;
                }
                Err(reason) => {
                    warn!(
                        namespace = %self.namespace,
                        backend = %kind,
                        %reason,
                        "storage backend unavailable, falling back to next"
                    );
                    last_failure = format!("{kind}: {reason}");
                    continue;
                }
            };

            match backend.initialize().await {
                Ok(()) => return Ok(Arc::from(backend)),
                Err(e) => {
                    warn!(
                        namespace = %self.namespace,
                        backend = %kind,
                        error = %e,
                        "failed to initialize storage backend, falling back to next"
                    );
                    last_failure = format!("{kind}: {e}");
                }
            }
        }

        Err(CoreError::NoBackendAvailable {
            namespace: self.namespace.key().to_string(),
            reason: last_failure,
        })
    }

    /// Returns true once a backend is bound.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.read().is_some()
    }

    /// Closes the bound backend and returns to the uninitialized state.
    ///
    /// Closing an adapter that is not initialized is a no-op.
    pub async fn close(&self) -> CoreResult<()> {
        let _guard = self.init_lock.lock().await;
        let backend = self.backend.write().take();
        if let Some(backend) = backend {
            backend.close().await?;
            info!(namespace = %self.namespace, backend = %backend.kind(), "storage backend closed");
        }
        Ok(())
    }

    /// Returns the bound variant, or `None` before initialization.
    #[must_use]
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.read().as_ref().map(|backend| backend.kind())
    }

    /// Describes the bound backend.
    pub fn backend_info(&self) -> CoreResult<BackendInfo> {
        let backend = self.backend()?;
        Ok(BackendInfo {
            namespace: self.namespace.key().to_string(),
            kind: backend.kind(),
            initialized: true,
            details: backend.details(),
        })
    }

    /// Serializes load-modify-store cycles on this namespace.
    ///
    /// The registry keeps one adapter per namespace, so holding this guard
    /// excludes every other writer in the process that follows the same rule.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    fn backend(&self) -> CoreResult<Arc<dyn StorageBackend>> {
        self.backend
            .read()
            .clone()
            .ok_or_else(|| CoreError::not_initialized(self.namespace.key()))
    }

    // ============ Credentials ============

    /// Stores a credential document.
    pub async fn store_credential(&self, name: &str, data: Record) -> CoreResult<bool> {
        Ok(self.backend()?.store_credential(name, data).await?)
    }

    /// Returns a credential document, if present.
    pub async fn get_credential(&self, name: &str) -> CoreResult<Option<Record>> {
        Ok(self.backend()?.get_credential(name).await?)
    }

    /// Lists credential names.
    pub async fn list_credentials(&self) -> CoreResult<Vec<String>> {
        Ok(self.backend()?.list_credentials().await?)
    }

    /// Deletes a credential.
    pub async fn delete_credential(&self, name: &str) -> CoreResult<bool> {
        Ok(self.backend()?.delete_credential(name).await?)
    }

    // ============ Credential state ============

    /// Merges updates into a credential's state.
    pub async fn update_credential_state(&self, name: &str, updates: Record) -> CoreResult<bool> {
        Ok(self.backend()?.update_credential_state(name, updates).await?)
    }

    /// Returns a credential's state.
    pub async fn get_credential_state(&self, name: &str) -> CoreResult<Record> {
        Ok(self.backend()?.get_credential_state(name).await?)
    }

    /// Returns every credential's state.
    pub async fn get_all_credential_states(&self) -> CoreResult<BTreeMap<String, Record>> {
        Ok(self.backend()?.get_all_credential_states().await?)
    }

    // ============ Configuration ============

    /// Sets a configuration value.
    pub async fn set_config(&self, key: &str, value: Value) -> CoreResult<bool> {
        Ok(self.backend()?.set_config(key, value).await?)
    }

    /// Returns a configuration value, if present.
    pub async fn get_config(&self, key: &str) -> CoreResult<Option<Value>> {
        Ok(self.backend()?.get_config(key).await?)
    }

    /// Returns a configuration value, or `default` if absent.
    pub async fn get_config_or(&self, key: &str, default: Value) -> CoreResult<Value> {
        Ok(self.get_config(key).await?.unwrap_or(default))
    }

    /// Returns all configuration values.
    pub async fn get_all_config(&self) -> CoreResult<Map<String, Value>> {
        Ok(self.backend()?.get_all_config().await?)
    }

    /// Deletes a configuration value.
    pub async fn delete_config(&self, key: &str) -> CoreResult<bool> {
        Ok(self.backend()?.delete_config(key).await?)
    }

    // ============ Usage statistics ============

    /// Merges updates into a credential's usage statistics.
    pub async fn update_usage_stats(&self, name: &str, updates: Record) -> CoreResult<bool> {
        Ok(self.backend()?.update_usage_stats(name, updates).await?)
    }

    /// Returns a credential's usage statistics.
    pub async fn get_usage_stats(&self, name: &str) -> CoreResult<Record> {
        Ok(self.backend()?.get_usage_stats(name).await?)
    }

    /// Returns every credential's usage statistics.
    pub async fn get_all_usage_stats(&self) -> CoreResult<BTreeMap<String, Record>> {
        Ok(self.backend()?.get_all_usage_stats().await?)
    }

    // ============ Export / import ============

    /// Writes one credential to a JSON document.
    ///
    /// Uses the backend's native transfer when it has one, otherwise reads
    /// the credential and writes it pretty-printed. `output` defaults to
    /// `<name>.json` in the working directory.
    ///
    /// Returns `false` if the credential does not exist.
    pub async fn export_credential(&self, name: &str, output: Option<&Path>) -> CoreResult<bool> {
        let backend = self.backend()?;
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(format!("{name}.json")));

        if let Some(transfer) = backend.credential_transfer() {
            return Ok(transfer.export_credential(name, &output).await?);
        }

        let Some(data) = backend.get_credential(name).await? else {
            return Ok(false);
        };
        let document = serde_json::to_string_pretty(&Value::Object(data))?;
        tokio::fs::write(&output, document).await?;
        debug!(namespace = %self.namespace, credential = name, "credential exported");
        Ok(true)
    }

    /// Reads a JSON document and stores it as a credential.
    ///
    /// `name` defaults to the document's file name.
    pub async fn import_credential(&self, input: &Path, name: Option<&str>) -> CoreResult<bool> {
        let backend = self.backend()?;
        let name = match name {
            Some(name) => name.to_string(),
            None => input
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    StorageError::invalid_name(input.display().to_string(), "path has no file name")
                })?,
        };

        if let Some(transfer) = backend.credential_transfer() {
            return Ok(transfer.import_credential(input, &name).await?);
        }

        let content = tokio::fs::read(input).await?;
        match serde_json::from_slice::<Value>(&content)? {
            Value::Object(data) => Ok(backend.store_credential(&name, data).await?),
            _ => Err(StorageError::InvalidDocument(format!(
                "{} does not contain a JSON object",
                input.display()
            ))
            .into()),
        }
    }
}
