//! Protected-method classification
//!
//! The registry collects the full method surface of the capability
//! interfaces a storage backend can implement: generic entity CRUD, the
//! extended CRUD operations, package/depot operations, and host remote
//! control (plus its "safe" variant). Any call whose name is in this set is
//! protected and must pass an access decision; every other method the
//! wrapped backend exposes is forwarded without a check, which is how
//! read-only introspection stays reachable without an ACL rule.

use std::collections::HashSet;

/// Entities served by the generic CRUD surface
const CRUD_ENTITIES: &[&str] = &[
    "host",
    "product",
    "productProperty",
    "productOnClient",
    "productOnDepot",
    "config",
    "configState",
    "group",
    "objectToGroup",
    "licenseContract",
    "softwareLicense",
    "licensePool",
    "auditHardware",
    "auditSoftware",
];

/// Operations of the generic and extended CRUD surfaces
const CRUD_OPS: &[&str] = &[
    "insertObject",
    "updateObject",
    "createObjects",
    "updateObjects",
    "getObjects",
    "getIdents",
    "getHashes",
    "deleteObjects",
    "delete",
    "create",
];

/// Package/depot capability surface
const DEPOT_METHODS: &[&str] = &[
    "depot_installPackage",
    "depot_uninstallPackage",
    "depot_getMD5Sum",
    "depot_getDiskSpaceUsage",
    "depot_createMd5SumFile",
    "depot_librsyncSignature",
    "depot_librsyncPatchFile",
];

/// Host remote control capability surface (shared by the safe variant)
const HOST_CONTROL_OPS: &[&str] = &[
    "start",
    "shutdown",
    "reboot",
    "fireEvent",
    "execute",
    "reachable",
    "uptime",
    "getActiveSessions",
    "showPopup",
];

/// Classification of a backend's call surface into protected and passthrough
#[derive(Debug, Clone)]
pub struct MethodRegistry {
    protected: HashSet<String>,
}

impl MethodRegistry {
    /// Build the registry from the fixed capability interfaces
    pub fn new() -> Self {
        let mut protected = HashSet::new();
        for entity in CRUD_ENTITIES {
            for op in CRUD_OPS {
                protected.insert(format!("{entity}_{op}"));
            }
        }
        protected.extend(DEPOT_METHODS.iter().map(|m| m.to_string()));
        for op in HOST_CONTROL_OPS {
            protected.insert(format!("hostControl_{op}"));
            protected.insert(format!("hostControlSafe_{op}"));
        }
        Self { protected }
    }

    /// Is this method subject to access control?
    pub fn is_protected(&self, method: &str) -> bool {
        self.protected.contains(method)
    }

    /// Is this a read operation? Read-only identities may call these but no
    /// other protected methods.
    pub fn is_read_method(method: &str) -> bool {
        method.ends_with("_getObjects")
            || method.ends_with("_getIdents")
            || method.ends_with("_getHashes")
    }

    /// Number of protected method names (diagnostics)
    pub fn len(&self) -> usize {
        self.protected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protected.is_empty()
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud_methods_are_protected() {
        let registry = MethodRegistry::new();
        assert!(registry.is_protected("host_getObjects"));
        assert!(registry.is_protected("host_insertObject"));
        assert!(registry.is_protected("configState_deleteObjects"));
        assert!(registry.is_protected("licenseContract_getIdents"));
    }

    #[test]
    fn test_depot_and_host_control_are_protected() {
        let registry = MethodRegistry::new();
        assert!(registry.is_protected("depot_installPackage"));
        assert!(registry.is_protected("hostControl_shutdown"));
        assert!(registry.is_protected("hostControlSafe_shutdown"));
    }

    #[test]
    fn test_unlisted_methods_are_passthrough() {
        let registry = MethodRegistry::new();
        assert!(!registry.is_protected("backend_info"));
        assert!(!registry.is_protected("backend_getInterface"));
        assert!(!registry.is_protected("dhcpd_updateConfig"));
    }

    #[test]
    fn test_read_method_classification() {
        assert!(MethodRegistry::is_read_method("host_getObjects"));
        assert!(MethodRegistry::is_read_method("host_getIdents"));
        assert!(MethodRegistry::is_read_method("product_getHashes"));
        assert!(!MethodRegistry::is_read_method("host_insertObject"));
        assert!(!MethodRegistry::is_read_method("hostControl_shutdown"));
    }
}
