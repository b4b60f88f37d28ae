//! Backend call surface
//!
//! Storage engines (file, SQL, LDAP, DHCP) plug in underneath the
//! authorization proxy by implementing the [`Backend`] trait: a dynamic
//! method-call surface plus the typed host lookup that authentication needs.
//!
//! Calls travel as method name + named parameters; parameter values and
//! results are JSON-shaped so the object filter can operate on them without
//! knowing the concrete entity types a backend serves.

mod memory;

pub use memory::MemoryBackend;

use serde_json::Value;

use crate::objects::Host;

/// Named parameters of a backend call
pub type ParamMap = serde_json::Map<String, Value>;

/// A backend method invocation: RPC method name plus named parameters
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub params: ParamMap,
}

impl MethodCall {
    /// Create a call with no parameters
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: ParamMap::new() }
    }

    /// Add a named parameter
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// A pluggable storage backend
///
/// Implement this trait to put a storage engine behind the authorization
/// proxy. The proxy implements the same trait by delegation, so proxied and
/// raw backends are interchangeable to callers.
pub trait Backend: Send + Sync {
    /// Invoke a backend operation by its RPC method name.
    ///
    /// Unknown methods fail with [`crate::Error::Backend`].
    fn call(&self, call: &MethodCall) -> crate::Result<Value>;

    /// Names of every operation this backend exposes
    fn method_names(&self) -> Vec<String>;

    /// Look up managed host records by id (case-insensitive)
    fn hosts_by_id(&self, id: &str) -> crate::Result<Vec<Host>>;

    /// True for backends that are themselves an access-control layer.
    ///
    /// Used to reject stacking one authorization proxy on top of another at
    /// construction time instead of failing at call time.
    fn is_access_control_layer(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_call_builder() {
        let call = MethodCall::new("host_getObjects")
            .with_param("attributes", json!(["id", "description"]))
            .with_param("id", json!("pc1.example.org"));

        assert_eq!(call.method, "host_getObjects");
        assert_eq!(call.params.len(), 2);
        assert_eq!(call.params["id"], "pc1.example.org");
    }
}
