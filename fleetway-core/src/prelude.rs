//! Prelude module for convenient imports.
//!
//! Import everything you need with a single line:
//!
//! ```rust,ignore
//! use fleetway_core::prelude::*;
//! ```

// === Proxy and access control ===
pub use crate::access::AccessControlledBackend;
pub use crate::access::Decision;
pub use crate::access::IdentityStore;
pub use crate::access::StaticAuthModule;
pub use crate::access::StaticUser;
pub use crate::access::SystemAuthModule;

// === ACL rules ===
pub use crate::acl::AclCache;
pub use crate::acl::AclEntry;
pub use crate::acl::AclEntryType;
pub use crate::acl::AclRule;

// === Backend call surface ===
pub use crate::backend::Backend;
pub use crate::backend::MemoryBackend;
pub use crate::backend::MethodCall;
pub use crate::backend::ParamMap;

// === Configuration ===
pub use crate::config::AccessControlConfig;
pub use crate::config::TruncatePolicy;

// === Domain model ===
pub use crate::objects::Config;
pub use crate::objects::ConfigState;
pub use crate::objects::Entity;
pub use crate::objects::Group;
pub use crate::objects::Host;
pub use crate::objects::HostRole;
pub use crate::objects::LicenseContract;
pub use crate::objects::Product;
pub use crate::objects::ProductOnClient;

// === Errors ===
pub use crate::error::Error;
pub use crate::Result;
