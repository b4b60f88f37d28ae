//! Authentication strategies
//!
//! Two strategies, selected by the shape of the presented username:
//!
//! - **Managed host**: the username is an FQDN; the caller proves possession
//!   of the host key stored on its managed-entity record. Depot and config
//!   servers are implicitly administrators.
//! - **System user**: the credential check is delegated to a pluggable
//!   OS-identity module (PAM, LDAP, or the in-tree [`StaticAuthModule`]),
//!   which also supplies group memberships and the admin/read-only flags.
//!
//! Exactly one strategy runs per authentication. Failures surface as opaque
//! [`Error::Authentication`]; the underlying reason is logged server-side
//! only. The one deliberate exception is [`Error::MissingData`] for an
//! unknown host, so operators can tell "unknown host" from "wrong key".

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::identity::IdentityStore;
use crate::backend::Backend;
use crate::error::Error;

/// Pluggable OS-identity module
///
/// Implement this trait to plug a system authentication source (PAM, LDAP,
/// ...) into the proxy. All methods take the plain username; the module owns
/// any name normalization it needs.
pub trait SystemAuthModule: Send + Sync {
    /// Check the credentials, erroring on any mismatch
    fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<()>;

    /// The user's real group memberships
    fn group_names(&self, username: &str) -> anyhow::Result<HashSet<String>>;

    /// Is this user an administrator?
    fn is_user_admin(&self, username: &str) -> anyhow::Result<bool>;

    /// Is this user read-only? `forced_groups`, when supplied by the host
    /// process, overrides the user's real memberships for this check.
    fn is_user_read_only(
        &self,
        username: &str,
        forced_groups: Option<&[String]>,
    ) -> anyhow::Result<bool>;

    /// Name of the administrator group, used for the implicit default ACL
    fn admin_group_name(&self) -> String;
}

/// Declarative user table implementing [`SystemAuthModule`]
///
/// For development and tests; production deployments use a PAM or LDAP
/// module.
pub struct StaticAuthModule {
    users: Vec<StaticUser>,
    admin_group: String,
    read_only_group: String,
}

/// One user of a [`StaticAuthModule`]
#[derive(Debug, Clone)]
pub struct StaticUser {
    pub username: String,
    pub password: String,
    pub groups: Vec<String>,
}

impl StaticUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl StaticAuthModule {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            admin_group: "fleetadmin".to_string(),
            read_only_group: "fleetreadonly".to_string(),
        }
    }

    pub fn with_user(mut self, user: StaticUser) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = group.into();
        self
    }

    pub fn with_read_only_group(mut self, group: impl Into<String>) -> Self {
        self.read_only_group = group.into();
        self
    }

    fn user(&self, username: &str) -> anyhow::Result<&StaticUser> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .ok_or_else(|| anyhow::anyhow!("unknown user '{username}'"))
    }
}

impl Default for StaticAuthModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemAuthModule for StaticAuthModule {
    fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<()> {
        let user = self.user(username)?;
        if !secrets_match(&user.password, password) {
            anyhow::bail!("wrong password for '{username}'");
        }
        Ok(())
    }

    fn group_names(&self, username: &str) -> anyhow::Result<HashSet<String>> {
        Ok(self.user(username)?.groups.iter().cloned().collect())
    }

    fn is_user_admin(&self, username: &str) -> anyhow::Result<bool> {
        Ok(self.user(username)?.groups.iter().any(|g| g == &self.admin_group))
    }

    fn is_user_read_only(
        &self,
        username: &str,
        forced_groups: Option<&[String]>,
    ) -> anyhow::Result<bool> {
        match forced_groups {
            Some(groups) => Ok(groups.iter().any(|g| g == &self.read_only_group)),
            None => Ok(self.user(username)?.groups.iter().any(|g| g == &self.read_only_group)),
        }
    }

    fn admin_group_name(&self) -> String {
        self.admin_group.clone()
    }
}

/// Shared-secret comparison by SHA-256 digest, so the comparison cost does
/// not depend on where the secrets first differ
fn secrets_match(stored: &str, presented: &str) -> bool {
    Sha256::digest(stored.as_bytes()) == Sha256::digest(presented.as_bytes())
}

/// Does the username look like a fully qualified domain name?
/// At least two dot-separated, non-empty labels.
fn is_fqdn_shaped(username: &str) -> bool {
    let labels: Vec<&str> = username.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Run the matching authentication strategy and record the outcome on the
/// identity store
pub(crate) fn authenticate_identity(
    identity: &mut IdentityStore,
    backend: &dyn Backend,
    auth_module: Option<&dyn SystemAuthModule>,
    username: &str,
    password: &str,
    forced_groups: Option<Vec<String>>,
) -> crate::Result<()> {
    identity.present_credentials(username, password);

    let result = if is_fqdn_shaped(username) {
        authenticate_host(identity, backend)
    } else {
        authenticate_system_user(identity, auth_module, forced_groups)
    };

    // Opaque failure towards the caller; MissingData stays distinguishable.
    result.map_err(|err| match err {
        Error::Authentication(_) | Error::MissingData(_) => err,
        other => {
            log::error!("authentication of '{username}' failed: {other}");
            Error::Authentication(format!("authentication of '{username}' failed"))
        }
    })
}

fn authenticate_host(identity: &mut IdentityStore, backend: &dyn Backend) -> crate::Result<()> {
    let host_id = identity.username.to_lowercase();
    identity.username = host_id.clone();

    let mut hosts = backend.hosts_by_id(&host_id)?;
    if hosts.is_empty() {
        return Err(Error::MissingData(format!("host '{host_id}' not found")));
    }
    let host = hosts.swap_remove(0);
    let Some(host_key) = host.opsi_host_key.as_deref() else {
        return Err(Error::MissingData(format!("host '{host_id}' has no host key")));
    };

    if !secrets_match(host_key, identity.password()) {
        log::warn!("wrong host key presented for '{host_id}'");
        return Err(Error::Authentication(format!(
            "authentication of host '{host_id}' failed"
        )));
    }

    identity.authenticated = true;
    // Depot and config servers are implicitly administrators.
    identity.is_admin = host.is_depot();
    identity.is_read_only = false;
    identity.host = Some(host);
    log::info!("host '{host_id}' authenticated");
    Ok(())
}

fn authenticate_system_user(
    identity: &mut IdentityStore,
    auth_module: Option<&dyn SystemAuthModule>,
    forced_groups: Option<Vec<String>>,
) -> crate::Result<()> {
    let username = identity.username.clone();
    let Some(module) = auth_module else {
        return Err(Error::Authentication(format!(
            "authentication of '{username}' failed: no system authentication module configured"
        )));
    };

    module.authenticate(&username, identity.password()).map_err(|e| {
        log::warn!("system authentication of '{username}' failed: {e}");
        Error::Authentication(format!("authentication of '{username}' failed"))
    })?;

    identity.authenticated = true;
    identity.user_groups = match &forced_groups {
        // Forced groups come from the host process, not the network caller.
        Some(groups) => groups.iter().cloned().collect(),
        None => module
            .group_names(&username)
            .map_err(|e| Error::Authentication(format!("group lookup for '{username}': {e}")))?,
    };
    identity.is_admin = module
        .is_user_admin(&username)
        .map_err(|e| Error::Authentication(format!("admin lookup for '{username}': {e}")))?;
    identity.is_read_only = module
        .is_user_read_only(&username, forced_groups.as_deref())
        .map_err(|e| Error::Authentication(format!("read-only lookup for '{username}': {e}")))?;

    log::info!(
        "user '{username}' authenticated ({} groups, admin: {}, read-only: {})",
        identity.user_groups.len(),
        identity.is_admin,
        identity.is_read_only
    );
    Ok(())
}

/// Reject empty credentials before any strategy runs
pub(crate) fn check_credentials_present(username: &str, password: &str) -> crate::Result<()> {
    if username.is_empty() {
        return Err(Error::Authentication("no username specified".to_string()));
    }
    if password.is_empty() {
        return Err(Error::Authentication("no password specified".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::objects::Host;

    fn module() -> StaticAuthModule {
        StaticAuthModule::new()
            .with_user(StaticUser::new("alice", "secret", ["fleetadmin"]))
            .with_user(StaticUser::new("bob", "other", ["staff", "fleetreadonly"]))
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_host(Host::depotserver("depot1.example.org").with_key("abc"))
            .with_host(Host::client("pc1.example.org").with_key("clientkey"))
    }

    #[test]
    fn test_fqdn_shape() {
        assert!(is_fqdn_shaped("pc1.example.org"));
        assert!(is_fqdn_shaped("host.domain"));
        assert!(!is_fqdn_shaped("alice"));
        assert!(!is_fqdn_shaped("trailing."));
        assert!(!is_fqdn_shaped(".leading"));
    }

    #[test]
    fn test_host_authentication_success_and_admin_flag() {
        let backend = backend();
        let mut identity = IdentityStore::new();
        authenticate_identity(&mut identity, &backend, None, "Depot1.Example.ORG", "abc", None)
            .unwrap();

        assert!(identity.authenticated);
        assert!(identity.is_admin);
        assert!(!identity.is_read_only);
        assert_eq!(identity.username, "depot1.example.org");
        assert!(identity.is_host());
    }

    #[test]
    fn test_client_host_is_not_admin() {
        let backend = backend();
        let mut identity = IdentityStore::new();
        authenticate_identity(
            &mut identity,
            &backend,
            None,
            "pc1.example.org",
            "clientkey",
            None,
        )
        .unwrap();
        assert!(identity.authenticated);
        assert!(!identity.is_admin);
    }

    #[test]
    fn test_host_wrong_key() {
        let backend = backend();
        let mut identity = IdentityStore::new();
        let err = authenticate_identity(
            &mut identity,
            &backend,
            None,
            "depot1.example.org",
            "xyz",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert!(!identity.authenticated);
    }

    #[test]
    fn test_unknown_host_is_missing_data() {
        let backend = backend();
        let mut identity = IdentityStore::new();
        let err = authenticate_identity(
            &mut identity,
            &backend,
            None,
            "ghost.example.org",
            "abc",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingData(_)));
    }

    #[test]
    fn test_system_user_authentication() {
        let backend = backend();
        let module = module();
        let mut identity = IdentityStore::new();
        authenticate_identity(&mut identity, &backend, Some(&module), "alice", "secret", None)
            .unwrap();

        assert!(identity.authenticated);
        assert!(identity.is_admin);
        assert!(!identity.is_read_only);
        assert!(identity.in_group("fleetadmin"));
        assert!(!identity.is_host());
    }

    #[test]
    fn test_read_only_from_real_groups() {
        let backend = backend();
        let module = module();
        let mut identity = IdentityStore::new();
        authenticate_identity(&mut identity, &backend, Some(&module), "bob", "other", None)
            .unwrap();
        assert!(identity.is_read_only);
        assert!(!identity.is_admin);
    }

    #[test]
    fn test_forced_groups_override_memberships() {
        let backend = backend();
        let module = module();
        let mut identity = IdentityStore::new();
        authenticate_identity(
            &mut identity,
            &backend,
            Some(&module),
            "bob",
            "other",
            Some(vec!["staff".to_string()]),
        )
        .unwrap();

        // forced groups replace the real memberships and feed the
        // read-only check
        assert!(identity.in_group("staff"));
        assert!(!identity.in_group("fleetreadonly"));
        assert!(!identity.is_read_only);
    }

    #[test]
    fn test_system_user_without_module_fails_opaquely() {
        let backend = backend();
        let mut identity = IdentityStore::new();
        let err =
            authenticate_identity(&mut identity, &backend, None, "alice", "secret", None)
                .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_wrong_system_password_is_opaque() {
        let backend = backend();
        let module = module();
        let mut identity = IdentityStore::new();
        let err = authenticate_identity(
            &mut identity,
            &backend,
            Some(&module),
            "alice",
            "wrong",
            None,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::Authentication(_)));
        // the caller must not learn what exactly went wrong
        assert!(!message.contains("password"));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(check_credentials_present("", "secret").is_err());
        assert!(check_credentials_present("alice", "").is_err());
        assert!(check_credentials_present("alice", "secret").is_ok());
    }
}
