//! Sources of the configured administrator identity.

use crate::error::CoreResult;
use async_trait::async_trait;

/// Environment variable naming the administrator.
pub const ADMIN_USERNAME_VAR: &str = "NSVAULT_ADMIN_USERNAME";
/// Environment variable holding the administrator password.
pub const ADMIN_PASSWORD_VAR: &str = "NSVAULT_ADMIN_PASSWORD";

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "pwd";

/// The administrator's configured credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    /// Administrator login name.
    pub username: String,
    /// Administrator password in plain text.
    pub password: String,
}

impl AdminIdentity {
    /// Creates an identity.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for AdminIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminIdentity")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves the administrator identity.
///
/// Consulted on every self-heal, so a changed configuration takes effect on
/// the next account operation.
#[async_trait]
pub trait AdminIdentitySource: Send + Sync {
    /// Returns the current administrator identity.
    async fn admin_identity(&self) -> CoreResult<AdminIdentity>;
}

/// A fixed identity.
#[derive(Debug, Clone)]
pub struct StaticAdminIdentity(AdminIdentity);

impl StaticAdminIdentity {
    /// Creates a source that always returns these credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(AdminIdentity::new(username, password))
    }
}

#[async_trait]
impl AdminIdentitySource for StaticAdminIdentity {
    async fn admin_identity(&self) -> CoreResult<AdminIdentity> {
        Ok(self.0.clone())
    }
}

/// Reads the identity from the process environment on every call.
///
/// Unset or empty variables fall back to `admin` / `pwd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAdminIdentity;

impl EnvAdminIdentity {
    fn resolve<F>(lookup: F) -> AdminIdentity
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        AdminIdentity {
            username: read(ADMIN_USERNAME_VAR, DEFAULT_ADMIN_USERNAME),
            password: read(ADMIN_PASSWORD_VAR, DEFAULT_ADMIN_PASSWORD),
        }
    }
}

#[async_trait]
impl AdminIdentitySource for EnvAdminIdentity {
    async fn admin_identity(&self) -> CoreResult<AdminIdentity> {
        Ok(Self::resolve(|name| std::env::var(name).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_defaults() {
        let identity = EnvAdminIdentity::resolve(|_| None);
        assert_eq!(identity, AdminIdentity::new("admin", "pwd"));

        let identity = EnvAdminIdentity::resolve(|name| match name {
            ADMIN_USERNAME_VAR => Some("root".into()),
            _ => Some(String::new()),
        });
        assert_eq!(identity, AdminIdentity::new("root", "pwd"));
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", AdminIdentity::new("admin", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
