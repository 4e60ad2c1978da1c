//! Request-scoped namespace selection.

use crate::adapter::StorageAdapter;
use crate::error::CoreResult;
use crate::namespace::Namespace;
use crate::registry::NamespaceRegistry;
use std::sync::Arc;

/// Carries the namespace a unit of work operates in.
///
/// A context is a plain value: deriving one with [`with_active`](Self::with_active)
/// never affects other contexts sharing the same registry, so concurrent
/// requests for different tenants cannot observe each other's selection.
///
/// # Example
///
/// ```
/// use nsvault_core::{Namespace, NamespaceRegistry, StorageContext};
/// use std::sync::Arc;
///
/// let base = StorageContext::new(Arc::new(NamespaceRegistry::in_memory()));
/// let tenant = base.with_active("tenant-a");
///
/// assert_eq!(base.resolve(None), Namespace::Default);
/// assert_eq!(tenant.resolve(None), Namespace::named("tenant-a"));
/// assert_eq!(tenant.resolve(Some("other".into())), Namespace::named("other"));
/// ```
#[derive(Debug, Clone)]
pub struct StorageContext {
    registry: Arc<NamespaceRegistry>,
    active: Option<Namespace>,
}

impl StorageContext {
    /// Creates a context with no active namespace.
    #[must_use]
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            registry,
            active: None,
        }
    }

    /// Creates a context over the process-wide registry.
    #[must_use]
    pub fn global() -> Self {
        Self::new(NamespaceRegistry::global())
    }

    /// Returns a copy of this context with `namespace` active.
    #[must_use]
    pub fn with_active(&self, namespace: impl Into<Namespace>) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            active: Some(namespace.into()),
        }
    }

    /// Returns a copy of this context with no active namespace.
    #[must_use]
    pub fn without_active(&self) -> Self {
        Self::new(Arc::clone(&self.registry))
    }

    /// Returns the active namespace, if one is set.
    #[must_use]
    pub fn active(&self) -> Option<&Namespace> {
        self.active.as_ref()
    }

    /// Returns the registry this context resolves against.
    #[must_use]
    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    /// Picks the explicit namespace, else the active one, else the default.
    #[must_use]
    pub fn resolve(&self, explicit: Option<Namespace>) -> Namespace {
        explicit
            .or_else(|| self.active.clone())
            .unwrap_or_default()
    }

    /// Returns the initialized adapter for the resolved namespace.
    pub async fn adapter(&self, explicit: Option<Namespace>) -> CoreResult<Arc<StorageAdapter>> {
        self.registry.get_or_create(self.resolve(explicit)).await
    }
}
