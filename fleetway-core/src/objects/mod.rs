//! Managed-entity domain model
//!
//! Typed structs for the entities the backend layer serves: hosts, products,
//! configs, groups and licenses. Every entity serializes to a flat attribute
//! map (camelCase keys, a `type` discriminator) and can be reconstructed from
//! one - this is the shape RPC parameters and results travel in, and the shape
//! the object filter operates on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::ParamMap;
use crate::error::Error;

/// Attribute key carrying the type discriminator in serialized maps
pub const TYPE_ATTRIBUTE: &str = "type";

/// Identifying attributes per object type.
///
/// These are the minimal constructor arguments that make an object of the
/// given type identifiable and reconstructible. The object filter always
/// preserves them, so a filtered object stays usable even when none of its
/// substantive attributes survive. Unknown types fall back to `id`.
pub fn ident_attributes(object_type: &str) -> &'static [&'static str] {
    match object_type {
        "OpsiClient" | "Depotserver" | "Configserver" => &["id"],
        "Product" | "LocalbootProduct" | "NetbootProduct" => {
            &["id", "productVersion", "packageVersion"]
        }
        "Config" | "UnicodeConfig" | "BoolConfig" => &["id"],
        "ConfigState" => &["configId", "objectId"],
        "Group" | "HostGroup" | "ProductGroup" => &["id"],
        "ObjectToGroup" => &["groupType", "groupId", "objectId"],
        "ProductOnClient" => &["productId", "productType", "clientId"],
        "LicenseContract" => &["id"],
        _ => &["id"],
    }
}

/// A managed domain entity
///
/// Implementors serialize to and from the flat attribute-map shape used on
/// the call surface. `to_map` guarantees the `type` discriminator is present.
pub trait Entity: Serialize + for<'de> Deserialize<'de> + Sized {
    /// Type discriminator of this instance (e.g. "OpsiClient", "Product")
    fn object_type(&self) -> &'static str;

    /// Serialize to an attribute map, including the type discriminator
    fn to_map(&self) -> crate::Result<ParamMap> {
        let value = serde_json::to_value(self)
            .map_err(|e| Error::Backend(format!("entity serialization failed: {e}")))?;
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::Backend(format!(
                    "entity did not serialize to a map: {other}"
                )))
            }
        };
        map.entry(TYPE_ATTRIBUTE.to_string())
            .or_insert_with(|| Value::String(self.object_type().to_string()));
        Ok(map)
    }

    /// Reconstruct an entity from an attribute map
    fn from_map(map: ParamMap) -> crate::Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Backend(format!("entity deserialization failed: {e}")))
    }
}

/// Role of a managed host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostRole {
    /// A managed client machine
    OpsiClient,
    /// A depot server distributing packages to clients
    Depotserver,
    /// The central configuration server (a depot server with the master role)
    Configserver,
}

/// A fleet-managed machine record
///
/// `id` is the lowercase FQDN of the machine. `opsi_host_key` is the shared
/// secret the machine presents when authenticating as a managed-host identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(rename = "type")]
    pub role: HostRole,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opsi_host_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl Host {
    fn with_role(role: HostRole, id: impl Into<String>) -> Self {
        Self {
            role,
            id: id.into().to_lowercase(),
            opsi_host_key: None,
            description: None,
            notes: None,
            hardware_address: None,
            ip_address: None,
        }
    }

    /// Create a managed client record
    pub fn client(id: impl Into<String>) -> Self {
        Self::with_role(HostRole::OpsiClient, id)
    }

    /// Create a depot server record
    pub fn depotserver(id: impl Into<String>) -> Self {
        Self::with_role(HostRole::Depotserver, id)
    }

    /// Create a config server record
    pub fn configserver(id: impl Into<String>) -> Self {
        Self::with_role(HostRole::Configserver, id)
    }

    /// Set the shared host key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.opsi_host_key = Some(key.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True for depot and config servers
    pub fn is_depot(&self) -> bool {
        matches!(self.role, HostRole::Depotserver | HostRole::Configserver)
    }
}

impl Entity for Host {
    fn object_type(&self) -> &'static str {
        match self.role {
            HostRole::OpsiClient => "OpsiClient",
            HostRole::Depotserver => "Depotserver",
            HostRole::Configserver => "Configserver",
        }
    }
}

/// An installable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub product_version: String,
    pub package_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        product_version: impl Into<String>,
        package_version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            product_version: product_version.into(),
            package_version: package_version.into(),
            name: None,
            priority: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Entity for Product {
    fn object_type(&self) -> &'static str {
        "Product"
    }
}

/// A configuration item with default and possible values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<Value>,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub multi_value: bool,
}

impl Config {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            default_values: Vec::new(),
            possible_values: Vec::new(),
            editable: true,
            multi_value: false,
        }
    }

    pub fn with_default_values(mut self, values: Vec<Value>) -> Self {
        self.default_values = values;
        self
    }
}

impl Entity for Config {
    fn object_type(&self) -> &'static str {
        "Config"
    }
}

/// The value of a config on a specific object (usually a client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    pub config_id: String,
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

impl ConfigState {
    pub fn new(config_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self { config_id: config_id.into(), object_id: object_id.into(), values: Vec::new() }
    }

    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }
}

impl Entity for ConfigState {
    fn object_type(&self) -> &'static str {
        "ConfigState"
    }
}

/// A named group of hosts or products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), description: None, parent_group_id: None }
    }
}

impl Entity for Group {
    fn object_type(&self) -> &'static str {
        "Group"
    }
}

/// Installation state of a product on a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOnClient {
    pub product_id: String,
    pub product_type: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_request: Option<String>,
}

impl ProductOnClient {
    pub fn new(
        product_id: impl Into<String>,
        product_type: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: product_type.into(),
            client_id: client_id.into(),
            installation_status: None,
            action_request: None,
        }
    }
}

impl Entity for ProductOnClient {
    fn object_type(&self) -> &'static str {
        "ProductOnClient"
    }
}

/// A license contract with a software vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseContract {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
}

impl LicenseContract {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), description: None, partner: None }
    }
}

impl Entity for LicenseContract {
    fn object_type(&self) -> &'static str {
        "LicenseContract"
    }
}
