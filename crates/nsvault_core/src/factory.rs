//! Backend factories and the priority-ordered catalog the adapter walks.
//!
//! Selecting a backend is a walk over an ordered table of factories. Each
//! factory either builds a backend for the namespace or answers with a typed
//! [`Unavailable`] outcome, and the adapter moves on to the next entry.

use crate::config::StorageConfig;
use crate::namespace::Namespace;
use nsvault_storage::{BackendKind, FileBackend, InMemoryBackend, StorageBackend};
use std::fmt;
use std::sync::Arc;

/// Why a factory could not supply a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The variant has no connection settings.
    NotConfigured,
    /// The variant is configured but no implementation is linked into this build.
    NotLinked,
    /// Construction failed.
    Failed(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NotConfigured => f.write_str("not configured"),
            Unavailable::NotLinked => f.write_str("no implementation linked into this build"),
            Unavailable::Failed(reason) => write!(f, "construction failed: {reason}"),
        }
    }
}

/// Constructs backends of one variant.
///
/// `build` only constructs; the adapter calls [`StorageBackend::initialize`]
/// afterwards and treats a failure there the same as [`Unavailable::Failed`].
pub trait BackendFactory: Send + Sync {
    /// The variant this factory produces.
    fn kind(&self) -> BackendKind;

    /// Builds an uninitialized backend for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns the reason the variant cannot be used right now.
    fn build(
        &self,
        config: &StorageConfig,
        namespace: &Namespace,
    ) -> Result<Box<dyn StorageBackend>, Unavailable>;
}

/// Factory for [`FileBackend`], rooted at [`StorageConfig::data_dir`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFactory;

impl BackendFactory for FileFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn build(
        &self,
        config: &StorageConfig,
        namespace: &Namespace,
    ) -> Result<Box<dyn StorageBackend>, Unavailable> {
        Ok(Box::new(FileBackend::for_namespace(
            &config.data_dir,
            namespace.key(),
        )))
    }
}

/// Factory for [`InMemoryBackend`]; every build yields a fresh, empty store.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryFactory;

impl BackendFactory for MemoryFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn build(
        &self,
        _config: &StorageConfig,
        _namespace: &Namespace,
    ) -> Result<Box<dyn StorageBackend>, Unavailable> {
        Ok(Box::new(InMemoryBackend::new()))
    }
}

/// Placeholder for a remote variant whose client is not part of this build.
///
/// Reports [`Unavailable::NotConfigured`] without a connection string and
/// [`Unavailable::NotLinked`] with one. Registering a real factory for the
/// same kind replaces it.
#[derive(Debug, Clone, Copy)]
pub struct UnlinkedFactory {
    kind: BackendKind,
}

impl UnlinkedFactory {
    /// Creates a placeholder for `kind`.
    #[must_use]
    pub const fn new(kind: BackendKind) -> Self {
        Self { kind }
    }
}

impl BackendFactory for UnlinkedFactory {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn build(
        &self,
        config: &StorageConfig,
        _namespace: &Namespace,
    ) -> Result<Box<dyn StorageBackend>, Unavailable> {
        match config.connection_string(self.kind) {
            Some(_) => Err(Unavailable::NotLinked),
            None => Err(Unavailable::NotConfigured),
        }
    }
}

/// The ordered table of factories an adapter tries.
///
/// The default catalog follows [`BackendKind::PRIORITY`]: Redis, Postgres,
/// MongoDB (all placeholders until a real factory is registered), then the
/// file backend as the terminal fallback.
#[derive(Clone)]
pub struct BackendCatalog {
    factories: Vec<Arc<dyn BackendFactory>>,
}

impl Default for BackendCatalog {
    fn default() -> Self {
        let mut factories: Vec<Arc<dyn BackendFactory>> = BackendKind::PRIORITY
            .iter()
            .filter(|kind| kind.is_remote())
            .map(|&kind| Arc::new(UnlinkedFactory::new(kind)) as Arc<dyn BackendFactory>)
            .collect();
        factories.push(Arc::new(FileFactory));
        Self { factories }
    }
}

impl fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.factories.iter().map(|factory| factory.kind()))
            .finish()
    }
}

impl BackendCatalog {
    /// Creates the default catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog that always selects the in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_factories(vec![Arc::new(MemoryFactory)])
    }

    /// Creates a catalog from an explicit ordered list.
    #[must_use]
    pub fn from_factories(factories: Vec<Arc<dyn BackendFactory>>) -> Self {
        Self { factories }
    }

    /// Registers a factory.
    ///
    /// A factory of a kind already present takes over that slot, keeping the
    /// priority order. A new kind is inserted ahead of the file fallback.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        let kind = factory.kind();
        if let Some(slot) = self.factories.iter_mut().find(|f| f.kind() == kind) {
            *slot = factory;
        } else {
            let at = self
                .factories
                .iter()
                .position(|f| f.kind() == BackendKind::File)
                .unwrap_or(self.factories.len());
            self.factories.insert(at, factory);
        }
        self
    }

    /// Returns the factories in the order they are tried.
    #[must_use]
    pub fn factories(&self) -> &[Arc<dyn BackendFactory>] {
        &self.factories
    }

    /// Returns the kinds in the order they are tried.
    #[must_use]
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.factories.iter().map(|f| f.kind()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_order() {
        assert_eq!(
            BackendCatalog::default().kinds(),
            vec![
                BackendKind::Redis,
                BackendKind::Postgres,
                BackendKind::MongoDb,
                BackendKind::File
            ]
        );
    }

    #[test]
    fn unlinked_factory_outcomes() {
        let factory = UnlinkedFactory::new(BackendKind::Redis);
        let ns = Namespace::Default;

        let err = factory.build(&StorageConfig::default(), &ns).err();
        assert_eq!(err, Some(Unavailable::NotConfigured));

        let config = StorageConfig::default().redis_uri("redis://localhost:6379");
        let err = factory.build(&config, &ns).err();
        assert_eq!(err, Some(Unavailable::NotLinked));
    }

    #[test]
    fn registering_replaces_slot() {
        let catalog = BackendCatalog::default().with_factory(Arc::new(MemoryFactory));
        assert_eq!(
            catalog.kinds(),
            vec![
                BackendKind::Redis,
                BackendKind::Postgres,
                BackendKind::MongoDb,
                BackendKind::Memory,
                BackendKind::File
            ]
        );

        let catalog = BackendCatalog::default().with_factory(Arc::new(FileFactory));
        assert_eq!(catalog.factories().len(), 4);
    }

    #[test]
    fn file_factory_uses_namespace_dir() {
        let config = StorageConfig::default().data_dir("/srv/nsvault");
        let backend = FileFactory
            .build(&config, &Namespace::named("tenant"))
            .unwrap();
        assert_eq!(backend.kind(), BackendKind::File);
        assert!(backend.details()["config_file"].contains("tenant"));
    }
}
