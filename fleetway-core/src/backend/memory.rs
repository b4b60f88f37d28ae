//! In-memory backend
//!
//! Thread-safe entity storage using RwLock<HashMap>. Objects are stored in
//! their attribute-map shape, keyed by the entity prefix of the methods that
//! serve them ("host", "product", "configState", ...). Suitable for tests
//! and single-process tooling; production deployments use the file, SQL or
//! LDAP backends.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::{Backend, MethodCall, ParamMap};
use crate::error::Error;
use crate::objects::{ident_attributes, Entity, Host, TYPE_ATTRIBUTE};

/// Entity CRUD operations served for every stored entity kind
const ENTITY_OPS: &[&str] = &[
    "insertObject",
    "updateObject",
    "createObjects",
    "updateObjects",
    "getObjects",
    "getIdents",
    "getHashes",
    "deleteObjects",
    "delete",
];

/// In-memory storage backend
pub struct MemoryBackend {
    store: RwLock<HashMap<String, Vec<ParamMap>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self { store: RwLock::new(HashMap::new()) }
    }

    /// Add a host record (builder form for test and tooling setup)
    pub fn with_host(self, host: Host) -> Self {
        self.insert_entity("host", &host).expect("host serialization");
        self
    }

    /// Add an arbitrary entity under its method prefix
    pub fn with_entity<T: Entity>(self, prefix: &str, entity: &T) -> Self {
        self.insert_entity(prefix, entity).expect("entity serialization");
        self
    }

    /// Insert or replace an entity under the given method prefix
    pub fn insert_entity<T: Entity>(&self, prefix: &str, entity: &T) -> crate::Result<()> {
        let map = entity.to_map()?;
        self.upsert(prefix, map);
        Ok(())
    }

    fn upsert(&self, prefix: &str, object: ParamMap) {
        let mut store = self.store.write().unwrap();
        let objects = store.entry(prefix.to_string()).or_default();
        match objects.iter_mut().find(|existing| same_ident(existing, &object)) {
            Some(existing) => *existing = object,
            None => objects.push(object),
        }
    }

    fn handle_entity_op(&self, prefix: &str, op: &str, params: &ParamMap) -> crate::Result<Value> {
        match op {
            "insertObject" | "updateObject" => {
                let object = object_param(params, prefix)?;
                self.upsert(prefix, object);
                Ok(Value::Null)
            }
            "createObjects" | "updateObjects" => {
                for object in collection_param(params, prefix)? {
                    self.upsert(prefix, object);
                }
                Ok(Value::Null)
            }
            "getObjects" | "getHashes" => {
                let objects = self.select(prefix, params);
                let attributes = requested_attributes(params);
                let projected: Vec<Value> = objects
                    .into_iter()
                    .map(|o| Value::Object(project(o, attributes.as_deref())))
                    .collect();
                Ok(Value::Array(projected))
            }
            "getIdents" => {
                let idents: Vec<Value> = self
                    .select(prefix, params)
                    .into_iter()
                    .map(|o| Value::Object(project(o, Some(&[]))))
                    .collect();
                Ok(Value::Array(idents))
            }
            "deleteObjects" => {
                let victims = collection_param(params, prefix)?;
                let mut store = self.store.write().unwrap();
                if let Some(objects) = store.get_mut(prefix) {
                    objects.retain(|o| !victims.iter().any(|v| same_ident(o, v)));
                }
                Ok(Value::Null)
            }
            "delete" => {
                let mut store = self.store.write().unwrap();
                if let Some(objects) = store.get_mut(prefix) {
                    objects.retain(|o| !matches_filter(o, params));
                }
                Ok(Value::Null)
            }
            _ => Err(Error::Backend(format!("method '{prefix}_{op}' not supported"))),
        }
    }

    /// Objects under `prefix` matching the non-attribute params as a filter
    fn select(&self, prefix: &str, params: &ParamMap) -> Vec<ParamMap> {
        let store = self.store.read().unwrap();
        store
            .get(prefix)
            .map(|objects| {
                objects.iter().filter(|o| matches_filter(o, params)).cloned().collect()
            })
            .unwrap_or_default()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn call(&self, call: &MethodCall) -> crate::Result<Value> {
        match call.method.as_str() {
            "backend_info" => {
                let store = self.store.read().unwrap();
                let counts: ParamMap = store
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.len())))
                    .collect();
                let mut info = ParamMap::new();
                info.insert("backend".to_string(), Value::String("memory".to_string()));
                info.insert("objects".to_string(), Value::Object(counts));
                Ok(Value::Object(info))
            }
            "backend_getInterface" => {
                Ok(Value::Array(self.method_names().into_iter().map(Value::String).collect()))
            }
            method => {
                let (prefix, op) = method
                    .rsplit_once('_')
                    .ok_or_else(|| Error::Backend(format!("unknown method '{method}'")))?;
                self.handle_entity_op(prefix, op, &call.params)
            }
        }
    }

    fn method_names(&self) -> Vec<String> {
        let store = self.store.read().unwrap();
        let mut names: Vec<String> = store
            .keys()
            .flat_map(|prefix| ENTITY_OPS.iter().map(move |op| format!("{prefix}_{op}")))
            .collect();
        names.push("backend_info".to_string());
        names.push("backend_getInterface".to_string());
        names.sort();
        names
    }

    fn hosts_by_id(&self, id: &str) -> crate::Result<Vec<Host>> {
        let wanted = id.to_lowercase();
        let store = self.store.read().unwrap();
        store
            .get("host")
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| {
                        o.get("id").and_then(Value::as_str).is_some_and(|i| i == wanted)
                    })
                    .map(|o| Host::from_map(o.clone()))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// The single-object parameter of insertObject/updateObject, named after the
/// entity ("host" for host_insertObject)
fn object_param(params: &ParamMap, prefix: &str) -> crate::Result<ParamMap> {
    match params.get(prefix) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(Error::Backend(format!(
            "parameter '{prefix}' must be an object, got {other}"
        ))),
        None => Err(Error::Backend(format!("missing parameter '{prefix}'"))),
    }
}

/// The collection parameter of createObjects/deleteObjects ("hosts" for
/// host_deleteObjects); a single object is accepted in place of a list
fn collection_param(params: &ParamMap, prefix: &str) -> crate::Result<Vec<ParamMap>> {
    let name = format!("{prefix}s");
    match params.get(&name) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map.clone()),
                other => Err(Error::Backend(format!(
                    "elements of '{name}' must be objects, got {other}"
                ))),
            })
            .collect(),
        Some(Value::Object(map)) => Ok(vec![map.clone()]),
        Some(other) => Err(Error::Backend(format!(
            "parameter '{name}' must be a list, got {other}"
        ))),
        None => Err(Error::Backend(format!("missing parameter '{name}'"))),
    }
}

/// Attribute projection requested via the `attributes` parameter
fn requested_attributes(params: &ParamMap) -> Option<Vec<String>> {
    let values = params.get("attributes")?.as_array()?;
    Some(values.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

/// Equality of two stored objects by type and identifying attributes
fn same_ident(a: &ParamMap, b: &ParamMap) -> bool {
    if a.get(TYPE_ATTRIBUTE) != b.get(TYPE_ATTRIBUTE) {
        return false;
    }
    let object_type = a.get(TYPE_ATTRIBUTE).and_then(Value::as_str).unwrap_or_default();
    ident_attributes(object_type).iter().all(|attr| a.get(*attr) == b.get(*attr))
}

/// Filter match: every non-attributes parameter must equal the object's
/// attribute (list-valued filters match any element, null matches all)
fn matches_filter(object: &ParamMap, params: &ParamMap) -> bool {
    params.iter().filter(|(name, _)| name.as_str() != "attributes").all(|(name, wanted)| {
        match wanted {
            Value::Null => true,
            Value::Array(options) => {
                object.get(name).map(|actual| options.contains(actual)).unwrap_or(false)
            }
            single => object.get(name).map(|actual| actual == single).unwrap_or(false),
        }
    })
}

/// Keep the requested attributes plus type discriminator and idents
fn project(object: ParamMap, attributes: Option<&[String]>) -> ParamMap {
    let Some(attributes) = attributes else {
        return object;
    };
    let object_type =
        object.get(TYPE_ATTRIBUTE).and_then(Value::as_str).unwrap_or_default().to_string();
    let idents = ident_attributes(&object_type);
    object
        .into_iter()
        .filter(|(name, _)| {
            name == TYPE_ATTRIBUTE
                || idents.iter().any(|ident| *ident == name.as_str())
                || attributes.iter().any(|a| a == name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ConfigState, Product};
    use serde_json::json;

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_host(Host::configserver("server.example.org").with_key("serverkey"))
            .with_host(Host::client("pc1.example.org").with_key("key1"))
            .with_host(Host::client("pc2.example.org").with_key("key2"))
    }

    #[test]
    fn test_get_objects_with_filter() {
        let backend = backend();
        let result = backend
            .call(&MethodCall::new("host_getObjects").with_param("id", json!("pc1.example.org")))
            .unwrap();

        let hosts = result.as_array().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0]["id"], "pc1.example.org");
    }

    #[test]
    fn test_get_objects_with_list_filter() {
        let backend = backend();
        let result = backend
            .call(
                &MethodCall::new("host_getObjects")
                    .with_param("id", json!(["pc1.example.org", "pc2.example.org"])),
            )
            .unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_attribute_projection_keeps_idents() {
        let backend = backend();
        let result = backend
            .call(
                &MethodCall::new("host_getObjects")
                    .with_param("attributes", json!(["description"]))
                    .with_param("id", json!("pc1.example.org")),
            )
            .unwrap();

        let host = result.as_array().unwrap()[0].as_object().unwrap();
        assert!(host.contains_key("id"));
        assert!(host.contains_key("type"));
        assert!(!host.contains_key("opsiHostKey"));
    }

    #[test]
    fn test_insert_updates_by_ident() {
        let backend = backend();
        backend
            .call(&MethodCall::new("host_insertObject").with_param(
                "host",
                serde_json::to_value(Host::client("pc1.example.org").with_description("updated"))
                    .unwrap(),
            ))
            .unwrap();

        let result = backend
            .call(&MethodCall::new("host_getObjects").with_param("id", json!("pc1.example.org")))
            .unwrap();
        let hosts = result.as_array().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0]["description"], "updated");
    }

    #[test]
    fn test_delete_objects() {
        let backend = backend();
        let victim = Host::client("pc2.example.org").to_map().unwrap();
        backend
            .call(
                &MethodCall::new("host_deleteObjects")
                    .with_param("hosts", json!([Value::Object(victim)])),
            )
            .unwrap();

        let result = backend.call(&MethodCall::new("host_getObjects")).unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_get_idents() {
        let mut poc = crate::objects::ProductOnClient::new(
            "firefox",
            "LocalbootProduct",
            "pc1.example.org",
        );
        poc.installation_status = Some("installed".to_string());
        let backend = MemoryBackend::new().with_entity("productOnClient", &poc);

        let result = backend.call(&MethodCall::new("productOnClient_getIdents")).unwrap();
        let idents = result.as_array().unwrap();
        assert_eq!(idents.len(), 1);
        let ident = idents[0].as_object().unwrap();
        assert_eq!(ident["productId"], "firefox");
        assert_eq!(ident["clientId"], "pc1.example.org");
        assert!(!ident.contains_key("installationStatus"));
    }

    #[test]
    fn test_unknown_method_is_backend_error() {
        let backend = backend();
        let err = backend.call(&MethodCall::new("depot_installPackage")).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[test]
    fn test_hosts_by_id_is_case_insensitive() {
        let backend = backend();
        let hosts = backend.hosts_by_id("PC1.Example.ORG").unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].id, "pc1.example.org");
    }

    #[test]
    fn test_mixed_entity_kinds() {
        let backend = MemoryBackend::new()
            .with_entity("product", &Product::new("firefox", "140.0", "2"))
            .with_entity("configState", &ConfigState::new("clientconfig.loglevel", "pc1"));

        let products = backend.call(&MethodCall::new("product_getObjects")).unwrap();
        assert_eq!(products.as_array().unwrap().len(), 1);
        let states = backend.call(&MethodCall::new("configState_getObjects")).unwrap();
        assert_eq!(states.as_array().unwrap().len(), 1);
    }
}
