//! Namespace identifiers.

use std::fmt;

/// Storage key used for the default namespace.
pub const DEFAULT_NAMESPACE_KEY: &str = "__default__";

/// Name of the namespace reserved for account records.
pub const ACCOUNTS_NAMESPACE: &str = "accounts";

/// A logical storage partition.
///
/// One namespace maps to one storage adapter and one backend instance, so
/// credentials, state, configuration and statistics never leak between
/// namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    /// The shared namespace used when nothing more specific is requested.
    #[default]
    Default,
    /// A named tenant partition.
    Named(String),
}

impl Namespace {
    /// Creates a named namespace.
    ///
    /// An empty name, or the default key itself, yields [`Namespace::Default`].
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() || name == DEFAULT_NAMESPACE_KEY {
            Namespace::Default
        } else {
            Namespace::Named(name)
        }
    }

    /// The namespace holding account records.
    #[must_use]
    pub fn accounts() -> Self {
        Namespace::Named(ACCOUNTS_NAMESPACE.to_string())
    }

    /// Returns the key under which this namespace is registered and stored.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Namespace::Default => DEFAULT_NAMESPACE_KEY,
            Namespace::Named(name) => name,
        }
    }

    /// Returns true for the default namespace.
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Namespace::Default)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Namespace::named(name)
    }
}

impl From<String> for Namespace {
    fn from(name: String) -> Self {
        Namespace::named(name)
    }
}

impl From<Option<&str>> for Namespace {
    fn from(name: Option<&str>) -> Self {
        name.map(Namespace::named).unwrap_or_default()
    }
}
