//! Session identity
//!
//! One [`IdentityStore`] exists per session/connection. It is mutated exactly
//! once, during authentication, and read on every call thereafter. Sessions
//! must not share a store: the identity belongs to one caller.

use std::collections::HashSet;
use std::fmt;

use crate::objects::Host;

/// Who is calling, and what they have proven
///
/// Either a system user (OS account; `user_groups` is meaningful) or a
/// managed host (fleet machine presenting its host key; `host` is set).
/// Exactly one of the two shapes applies after authentication.
#[derive(Clone, Default)]
pub struct IdentityStore {
    pub username: String,
    password: String,
    pub authenticated: bool,
    pub user_groups: HashSet<String>,
    pub host: Option<Host>,
    pub is_admin: bool,
    pub is_read_only: bool,
}

impl IdentityStore {
    /// Fresh, unauthenticated identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the presented credentials. Resets all proven state.
    pub(crate) fn present_credentials(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = password.to_string();
        self.authenticated = false;
        self.user_groups.clear();
        self.host = None;
        self.is_admin = false;
        self.is_read_only = false;
    }

    /// The presented secret. Never log this.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// True for managed-host identities
    pub fn is_host(&self) -> bool {
        self.host.is_some()
    }

    /// Is the identity in the given system group?
    pub fn in_group(&self, group: &str) -> bool {
        self.user_groups.iter().any(|g| g == group)
    }
}

// The password must never leak through Debug output or logs.
impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore")
            .field("username", &self.username)
            .field("password", &"***")
            .field("authenticated", &self.authenticated)
            .field("user_groups", &self.user_groups)
            .field("host", &self.host.as_ref().map(|h| &h.id))
            .field("is_admin", &self.is_admin)
            .field("is_read_only", &self.is_read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unauthenticated() {
        let identity = IdentityStore::new();
        assert!(!identity.authenticated);
        assert!(!identity.is_admin);
        assert!(!identity.is_host());
        assert!(identity.user_groups.is_empty());
    }

    #[test]
    fn test_presenting_credentials_resets_proven_state() {
        let mut identity = IdentityStore::new();
        identity.present_credentials("alice", "secret");
        identity.authenticated = true;
        identity.is_admin = true;
        identity.user_groups.insert("fleetadmin".to_string());

        identity.present_credentials("bob", "other");
        assert_eq!(identity.username, "bob");
        assert!(!identity.authenticated);
        assert!(!identity.is_admin);
        assert!(identity.user_groups.is_empty());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut identity = IdentityStore::new();
        identity.present_credentials("alice", "hunter2");
        let debug = format!("{identity:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("alice"));
    }
}
