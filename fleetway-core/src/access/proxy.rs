//! The authorization proxy
//!
//! [`AccessControlledBackend`] wraps any [`Backend`] and routes every call
//! through classification, decision and filtering before delegating:
//!
//! ```text
//! caller -> proxy -> registry lookup
//!             passthrough: call backend directly
//!             protected:   decide -> filter params -> call backend -> filter result
//! ```
//!
//! The proxy implements [`Backend`] itself, so callers cannot tell it apart
//! from the raw backend - except that calls may now be denied or trimmed.

use std::sync::Arc;

use serde_json::Value;

use super::auth::{authenticate_identity, check_credentials_present, SystemAuthModule};
use super::decision::{AccessDecisionEngine, Decision};
use super::filter::ObjectFilter;
use super::identity::IdentityStore;
use super::registry::MethodRegistry;
use crate::acl::{self, AclEntry, AclRule};
use crate::backend::{Backend, MethodCall};
use crate::config::AccessControlConfig;
use crate::error::Error;
use crate::objects::Host;

/// Administrator group granted everything when no ACL is configured and no
/// auth module supplies its own group name
const DEFAULT_ADMIN_GROUP: &str = "fleetadmin";

/// Access-controlled view of a wrapped backend
///
/// One instance per caller/session: the identity it carries must not be
/// shared across unrelated requests. The ACL table and method registry are
/// immutable after construction and may be shared freely.
pub struct AccessControlledBackend {
    backend: Box<dyn Backend>,
    auth_module: Option<Arc<dyn SystemAuthModule>>,
    registry: MethodRegistry,
    engine: AccessDecisionEngine,
    identity: IdentityStore,
    config: AccessControlConfig,
}

impl std::fmt::Debug for AccessControlledBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControlledBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccessControlledBackend {
    /// Wrap `backend`, loading the ACL table from the configured source.
    ///
    /// With no ACL source configured, a secure-by-default table applies: a
    /// single rule matching every method, restricted to the administrator
    /// group.
    pub fn new(
        backend: Box<dyn Backend>,
        config: AccessControlConfig,
        auth_module: Option<Arc<dyn SystemAuthModule>>,
    ) -> crate::Result<Self> {
        config.validate().map_err(|e| Error::Configuration(e.to_string()))?;
        let rules = match &config.acl_file {
            Some(path) => acl::load_acl_file(path)?,
            None => {
                let admin_group = auth_module
                    .as_ref()
                    .map(|m| m.admin_group_name())
                    .unwrap_or_else(|| DEFAULT_ADMIN_GROUP.to_string());
                log::info!(
                    "no ACL source configured, restricting all methods to group '{admin_group}'"
                );
                Arc::new(vec![AclRule::new(".*", vec![AclEntry::group(admin_group)])?])
            }
        };
        Self::with_rules_arc(backend, config, auth_module, rules)
    }

    /// Wrap `backend` with an explicit in-memory rule list
    pub fn with_rules(
        backend: Box<dyn Backend>,
        config: AccessControlConfig,
        auth_module: Option<Arc<dyn SystemAuthModule>>,
        rules: Vec<AclRule>,
    ) -> crate::Result<Self> {
        Self::with_rules_arc(backend, config, auth_module, Arc::new(rules))
    }

    fn with_rules_arc(
        backend: Box<dyn Backend>,
        config: AccessControlConfig,
        auth_module: Option<Arc<dyn SystemAuthModule>>,
        rules: Arc<Vec<AclRule>>,
    ) -> crate::Result<Self> {
        if backend.is_access_control_layer() {
            return Err(Error::Configuration(
                "refusing to stack one access control layer on another".to_string(),
            ));
        }
        Ok(Self {
            backend,
            auth_module,
            registry: MethodRegistry::new(),
            engine: AccessDecisionEngine::new(rules),
            identity: IdentityStore::new(),
            config,
        })
    }

    /// Authenticate this session.
    ///
    /// `forced_groups` may only be supplied by the host process (never taken
    /// from the network caller); it overrides the authenticated user's real
    /// group memberships.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        forced_groups: Option<Vec<String>>,
    ) -> crate::Result<()> {
        check_credentials_present(username, password)?;
        authenticate_identity(
            &mut self.identity,
            self.backend.as_ref(),
            self.auth_module.as_deref(),
            username,
            password,
            forced_groups,
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.authenticated
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin
    }

    pub fn is_read_only(&self) -> bool {
        self.identity.is_read_only
    }

    /// The session identity (read-only view)
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Route one call through access control and delegate it
    pub fn execute(&self, call: &MethodCall) -> crate::Result<Value> {
        if !self.registry.is_protected(&call.method) {
            log::debug!("passing through unprotected method '{}'", call.method);
            return self.backend.call(call);
        }

        match self.engine.decide(&call.method, &self.identity) {
            Decision::Denied => {
                log::warn!(
                    "denied method '{}' for '{}'",
                    call.method,
                    self.identity.username
                );
                Err(Error::PermissionDenied(format!(
                    "access to method '{}' denied for '{}'",
                    call.method, self.identity.username
                )))
            }
            Decision::Granted => {
                self.ensure_writable(&call.method)?;
                self.backend.call(call)
            }
            Decision::PartiallyGranted(entries) => {
                self.ensure_writable(&call.method)?;
                let filter = ObjectFilter::new(
                    &self.identity,
                    &entries,
                    self.config.truncate_policy,
                    &call.method,
                );
                let params = filter.filter_params(&call.params)?;
                let result = self
                    .backend
                    .call(&MethodCall { method: call.method.clone(), params })?;
                Ok(filter.filter_result(result))
            }
        }
    }

    /// Read-only identities may call protected reads only
    fn ensure_writable(&self, method: &str) -> crate::Result<()> {
        if self.identity.is_read_only && !MethodRegistry::is_read_method(method) {
            return Err(Error::PermissionDenied(format!(
                "access to method '{method}' denied for read-only user '{}'",
                self.identity.username
            )));
        }
        Ok(())
    }
}

impl Backend for AccessControlledBackend {
    fn call(&self, call: &MethodCall) -> crate::Result<Value> {
        self.execute(call)
    }

    fn method_names(&self) -> Vec<String> {
        self.backend.method_names()
    }

    fn hosts_by_id(&self, id: &str) -> crate::Result<Vec<Host>> {
        self.backend.hosts_by_id(id)
    }

    fn is_access_control_layer(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{StaticAuthModule, StaticUser};
    use crate::acl::AclEntryType;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn backend() -> Box<dyn Backend> {
        Box::new(
            MemoryBackend::new()
                .with_host(Host::configserver("server.example.org").with_key("serverkey"))
                .with_host(Host::client("pc1.example.org").with_key("key1"))
                .with_host(Host::client("pc2.example.org").with_key("key2")),
        )
    }

    fn module() -> Arc<StaticAuthModule> {
        Arc::new(
            StaticAuthModule::new()
                .with_user(StaticUser::new("alice", "secret", ["fleetadmin"]))
                .with_user(StaticUser::new("bob", "pass", ["staff"]))
                .with_user(StaticUser::new("carol", "pass", ["staff", "fleetreadonly"])),
        )
    }

    fn proxy_with_rules(rules: Vec<AclRule>) -> AccessControlledBackend {
        AccessControlledBackend::with_rules(
            backend(),
            AccessControlConfig::default(),
            Some(module()),
            rules,
        )
        .unwrap()
    }

    #[test]
    fn test_passthrough_needs_no_rule() {
        // empty table: every protected method is denied, introspection is not
        let proxy = proxy_with_rules(vec![]);
        let info = proxy.execute(&MethodCall::new("backend_info")).unwrap();
        assert_eq!(info["backend"], "memory");

        let err = proxy.execute(&MethodCall::new("host_getObjects")).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_denied_error_names_method_and_caller() {
        let mut proxy = proxy_with_rules(vec![AclRule::new(
            ".*",
            vec![AclEntry::group("fleetadmin")],
        )
        .unwrap()]);
        proxy.authenticate("bob", "pass", None).unwrap();

        let err = proxy.execute(&MethodCall::new("host_getObjects")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("host_getObjects"));
        assert!(message.contains("bob"));
    }

    #[test]
    fn test_default_table_restricts_to_admin_group() {
        let mut proxy = AccessControlledBackend::new(
            backend(),
            AccessControlConfig::default(),
            Some(module()),
        )
        .unwrap();

        proxy.authenticate("bob", "pass", None).unwrap();
        assert!(proxy.execute(&MethodCall::new("host_getObjects")).is_err());

        proxy.authenticate("alice", "secret", None).unwrap();
        let hosts = proxy.execute(&MethodCall::new("host_getObjects")).unwrap();
        assert_eq!(hosts.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_stacking_proxies_is_a_configuration_error() {
        let inner = AccessControlledBackend::new(
            backend(),
            AccessControlConfig::default(),
            Some(module()),
        )
        .unwrap();

        let err = AccessControlledBackend::new(
            Box::new(inner),
            AccessControlConfig::default(),
            Some(module()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_partial_grant_filters_results() {
        let mut proxy = proxy_with_rules(vec![
            AclRule::new("^host_", vec![AclEntry::owner()]).unwrap(),
        ]);
        proxy.authenticate("pc1.example.org", "key1", None).unwrap();

        let result = proxy.execute(&MethodCall::new("host_getObjects")).unwrap();
        let hosts = result.as_array().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0]["id"], "pc1.example.org");
    }

    #[test]
    fn test_partial_grant_filters_params_fail_closed() {
        let mut proxy = proxy_with_rules(vec![
            AclRule::new("^host_", vec![AclEntry::owner()]).unwrap(),
        ]);
        proxy.authenticate("pc1.example.org", "key1", None).unwrap();

        // writing someone else's record: every parameter is filtered away
        let foreign = Host::client("pc2.example.org").with_description("hijack");
        let err = proxy
            .execute(
                &MethodCall::new("host_insertObject")
                    .with_param("host", serde_json::to_value(&foreign).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_read_only_user_can_read_but_not_write() {
        let mut proxy =
            proxy_with_rules(vec![AclRule::new(".*", vec![AclEntry::all()]).unwrap()]);
        proxy.authenticate("carol", "pass", None).unwrap();
        assert!(proxy.is_read_only());

        assert!(proxy.execute(&MethodCall::new("host_getObjects")).is_ok());

        let host = Host::client("pc9.example.org");
        let err = proxy
            .execute(
                &MethodCall::new("host_insertObject")
                    .with_param("host", serde_json::to_value(&host).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_backend_errors_propagate_unchanged() {
        let mut proxy =
            proxy_with_rules(vec![AclRule::new(".*", vec![AclEntry::all()]).unwrap()]);
        proxy.authenticate("alice", "secret", None).unwrap();

        // granted by the ACL, but the memory backend does not serve depot
        // operations
        let err = proxy.execute(&MethodCall::new("depot_installPackage")).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[test]
    fn test_attribute_restricted_rule_hides_host_keys() {
        let rule = AclRule::new(
            "^host_",
            vec![AclEntry::new(AclEntryType::Client)
                .with_deny_attributes(["opsiHostKey".to_string()])],
        )
        .unwrap();
        let mut proxy = proxy_with_rules(vec![rule]);
        proxy.authenticate("pc1.example.org", "key1", None).unwrap();

        let result = proxy.execute(&MethodCall::new("host_getObjects")).unwrap();
        let hosts = result.as_array().unwrap();
        assert_eq!(hosts.len(), 3);
        for host in hosts {
            assert!(host.get("opsiHostKey").is_none());
            assert!(host.get("id").is_some());
        }
    }

    #[test]
    fn test_depot_identity_is_admin_and_not_read_only() {
        let mut proxy =
            proxy_with_rules(vec![AclRule::new(".*", vec![AclEntry::all()]).unwrap()]);
        proxy.authenticate("server.example.org", "serverkey", None).unwrap();
        assert!(proxy.is_authenticated());
        assert!(proxy.is_admin());
        assert!(!proxy.is_read_only());
    }
}
