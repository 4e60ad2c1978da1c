//! Process-wide map from namespace to its storage adapter.

use crate::adapter::StorageAdapter;
use crate::config::StorageConfig;
use crate::error::{CoreError, CoreResult};
use crate::factory::BackendCatalog;
use crate::namespace::Namespace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::debug;

type AdapterCell = Arc<OnceCell<Arc<StorageAdapter>>>;

/// Keeps at most one initialized [`StorageAdapter`] per namespace.
///
/// Creation is atomic per namespace: the map holds one `OnceCell` per key and
/// concurrent callers for the same new namespace all await the single
/// construction in flight. The map lock itself is never held across an
/// `.await`.
#[derive(Debug)]
pub struct NamespaceRegistry {
    config: Arc<StorageConfig>,
    catalog: Arc<BackendCatalog>,
    adapters: Mutex<HashMap<Namespace, AdapterCell>>,
}

impl NamespaceRegistry {
    /// Creates a registry selecting backends from `catalog`.
    #[must_use]
    pub fn new(config: StorageConfig, catalog: BackendCatalog) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry with the default catalog.
    #[must_use]
    pub fn with_config(config: StorageConfig) -> Self {
        Self::new(config, BackendCatalog::default())
    }

    /// Creates a registry whose namespaces all live in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StorageConfig::default(), BackendCatalog::in_memory())
    }

    /// Returns the process-wide registry, configured from the environment
    /// on first use.
    pub fn global() -> Arc<NamespaceRegistry> {
        static GLOBAL: OnceLock<Arc<NamespaceRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Self::with_config(StorageConfig::from_env())))
            .clone()
    }

    /// Returns the configuration adapters are built with.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the initialized adapter for `namespace`, creating it if needed.
    ///
    /// A failed initialization leaves nothing registered, so the next call
    /// retries from scratch. An adapter whose namespace was closed while it
    /// was being built is closed and never returned.
    pub async fn get_or_create(
        &self,
        namespace: impl Into<Namespace>,
    ) -> CoreResult<Arc<StorageAdapter>> {
        let namespace = namespace.into();
        loop {
            let cell = {
                let mut adapters = self.adapters.lock();
                Arc::clone(adapters.entry(namespace.clone()).or_default())
            };

            let adapter = cell
                .get_or_try_init(|| async {
                    debug!(namespace = %namespace, "creating storage adapter");
                    let adapter = Arc::new(StorageAdapter::new(
                        namespace.clone(),
                        Arc::clone(&self.config),
                        Arc::clone(&self.catalog),
                    ));
                    adapter.initialize().await?;
                    Ok::<_, CoreError>(adapter)
                })
                .await?;
            let adapter = Arc::clone(adapter);

            let registered = self
                .adapters
                .lock()
                .get(&namespace)
                .is_some_and(|current| Arc::ptr_eq(current, &cell));
            if registered {
                return Ok(adapter);
            }

            debug!(namespace = %namespace, "namespace closed during creation, retrying");
            adapter.close().await?;
        }
    }

    /// Evicts and closes the adapter for `namespace`, if any.
    ///
    /// A construction in flight is awaited and its adapter closed. The next
    /// [`get_or_create`](Self::get_or_create) builds a fresh one.
    pub async fn close(&self, namespace: &Namespace) -> CoreResult<()> {
        let cell = self.adapters.lock().remove(namespace);
        if let Some(cell) = cell {
            if let Some(adapter) = settled(&cell).await {
                adapter.close().await?;
            }
        }
        Ok(())
    }

    /// Evicts and closes every adapter.
    ///
    /// All adapters are closed even if some fail; the first error is returned.
    pub async fn close_all(&self) -> CoreResult<()> {
        let cells: Vec<AdapterCell> = self.adapters.lock().drain().map(|(_, cell)| cell).collect();

        let mut first_error = None;
        for cell in &cells {
            let Some(adapter) = settled(cell).await else {
                continue;
            };
            if let Err(e) = adapter.close().await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the keys of the currently registered namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .adapters
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(namespace, _)| namespace.key().to_string())
            .collect();
        keys.sort();
        keys
    }
}

/// Waits for any construction in flight and returns its adapter.
///
/// An empty cell stays empty: the fallback initializer always fails.
async fn settled(cell: &AdapterCell) -> Option<Arc<StorageAdapter>> {
    cell.get_or_try_init(|| async { Err::<Arc<StorageAdapter>, ()>(()) })
        .await
        .ok()
        .cloned()
}
