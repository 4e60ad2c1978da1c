//! CLI command implementations.

pub mod accounts;
pub mod backend;
pub mod credentials;
