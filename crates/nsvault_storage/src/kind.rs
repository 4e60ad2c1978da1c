//! Identification of storage backend variants.

use std::fmt;
use std::str::FromStr;

/// The storage technology a backend is built on.
///
/// Purely descriptive: callers above the backend layer must never branch on
/// it for behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// Redis key/value store.
    Redis,
    /// PostgreSQL database.
    Postgres,
    /// MongoDB document store.
    MongoDb,
    /// JSON files on the local file system.
    File,
    /// Process memory, lost on exit.
    Memory,
}

impl BackendKind {
    /// The selection order used when several variants are configured.
    pub const PRIORITY: [BackendKind; 4] = [
        BackendKind::Redis,
        BackendKind::Postgres,
        BackendKind::MongoDb,
        BackendKind::File,
    ];

    /// Returns the lowercase name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Postgres => "postgres",
            BackendKind::MongoDb => "mongodb",
            BackendKind::File => "file",
            BackendKind::Memory => "memory",
        }
    }

    /// Returns true if this variant talks to a network service.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(
            self,
            BackendKind::Redis | BackendKind::Postgres | BackendKind::MongoDb
        )
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            "file" => Ok(BackendKind::File),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend kind: {other}")),
        }
    }
}
