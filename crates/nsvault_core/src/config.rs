//! Storage configuration.

use nsvault_storage::BackendKind;
use std::path::PathBuf;

/// Environment variable holding the Redis connection string.
pub const REDIS_URI_VAR: &str = "REDIS_URI";
/// Environment variable holding the Postgres connection string.
pub const POSTGRES_DSN_VAR: &str = "POSTGRES_DSN";
/// Environment variable holding the MongoDB connection string.
pub const MONGODB_URI_VAR: &str = "MONGODB_URI";
/// Environment variable holding the root directory of the file backend.
pub const DATA_DIR_VAR: &str = "NSVAULT_DATA_DIR";

/// Configuration consulted when a storage adapter picks its backend.
///
/// A connection string that is absent or empty means the corresponding
/// variant is not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Redis connection string.
    pub redis_uri: Option<String>,
    /// Postgres connection string.
    pub postgres_dsn: Option<String>,
    /// MongoDB connection string.
    pub mongodb_uri: Option<String>,
    /// Root directory for the file backend; each namespace gets a subdirectory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_uri: None,
            postgres_dsn: None,
            mongodb_uri: None,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with no remote backends configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self {
            redis_uri: non_empty(REDIS_URI_VAR),
            postgres_dsn: non_empty(POSTGRES_DSN_VAR),
            mongodb_uri: non_empty(MONGODB_URI_VAR),
            ..Self::default()
        };
        if let Some(dir) = non_empty(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    /// Returns the connection string configured for a remote variant.
    ///
    /// Always `None` for the file and memory variants.
    #[must_use]
    pub fn connection_string(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::Redis => self.redis_uri.as_deref(),
            BackendKind::Postgres => self.postgres_dsn.as_deref(),
            BackendKind::MongoDb => self.mongodb_uri.as_deref(),
            BackendKind::File | BackendKind::Memory => None,
        }
    }

    /// Sets the Redis connection string.
    #[must_use]
    pub fn redis_uri(mut self, uri: impl Into<String>) -> Self {
        self.redis_uri = Some(uri.into());
        self
    }

    /// Sets the Postgres connection string.
    #[must_use]
    pub fn postgres_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.postgres_dsn = Some(dsn.into());
        self
    }

    /// Sets the MongoDB connection string.
    #[must_use]
    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    /// Sets the file backend root directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = StorageConfig::default();
        assert!(config.redis_uri.is_none());
        assert!(config.postgres_dsn.is_none());
        assert!(config.mongodb_uri.is_none());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn lookup_ignores_empty_values() {
        let vars: HashMap<&str, &str> = [
            (REDIS_URI_VAR, ""),
            (POSTGRES_DSN_VAR, "postgres://localhost/db"),
            (DATA_DIR_VAR, "/var/lib/nsvault"),
        ]
        .into_iter()
        .collect();

        let config = StorageConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert!(config.redis_uri.is_none());
        assert_eq!(config.postgres_dsn.as_deref(), Some("postgres://localhost/db"));
        assert!(config.mongodb_uri.is_none());
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/nsvault"));
    }

    #[test]
    fn builder_pattern() {
        let config = StorageConfig::new()
            .redis_uri("redis://localhost")
            .data_dir("/tmp/x");
        assert_eq!(config.redis_uri.as_deref(), Some("redis://localhost"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(
            config.connection_string(BackendKind::Redis),
            Some("redis://localhost")
        );
        assert!(config.connection_string(BackendKind::Postgres).is_none());
        assert!(config.connection_string(BackendKind::File).is_none());
    }
}
