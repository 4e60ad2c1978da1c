//! # nsvault Storage
//!
//! Storage backend contract and built-in variants for nsvault.
//!
//! Every storage technology (file, Redis, Postgres, MongoDB, ...) implements
//! the same asynchronous [`StorageBackend`] capability set, so the layers
//! above can swap one for another without observable differences.
//!
//! ## Design Principles
//!
//! - One backend instance serves exactly one namespace
//! - Missing keys read as empty/absent values, never as errors
//! - Values are JSON; backends do not interpret them
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - JSON files, one directory per namespace
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//!
//! Network-backed variants live outside this crate and plug in by
//! implementing [`StorageBackend`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod kind;
mod memory;

pub use backend::{merge_record, CredentialTransfer, Record, StorageBackend};
pub use error::{validate_name, StorageError, StorageResult, TEMP_SUFFIX};
pub use file::FileBackend;
pub use kind::BackendKind;
pub use memory::InMemoryBackend;
