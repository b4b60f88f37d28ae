//! Fleetway Framework - Core
//!
//! The backend layer of the Fleetway fleet/configuration-management platform.
//! Pluggable data backends expose a uniform call surface over a domain model of
//! hosts, products, configs, groups and licenses; this crate provides the
//! authorization proxy that sits between RPC callers and any wrapped backend.
//!
//! # Overview
//!
//! Every call routed through [`AccessControlledBackend`] is classified as
//! protected or passthrough, matched against an ordered ACL table
//! (first matching rule wins), and resolved to one of three outcomes:
//! denied, fully granted, or partially granted. Partial grants constrain
//! which object instances and which attributes of those instances pass
//! through, in both call arguments and results.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fleetway_core::prelude::*;
//!
//! let backend = MemoryBackend::new().with_host(Host::configserver("server.example.org"));
//! let module = StaticAuthModule::new()
//!     .with_user(StaticUser::new("alice", "secret", vec!["fleetadmin"]));
//!
//! let mut proxy = AccessControlledBackend::new(
//!     Box::new(backend),
//!     AccessControlConfig::default().with_acl_file("/etc/fleetway/acl.toml"),
//!     Some(Arc::new(module)),
//! )?;
//!
//! proxy.authenticate("alice", "secret", None)?;
//! let hosts = proxy.execute(&MethodCall::new("host_getObjects"))?;
//! ```
//!
//! # Architecture
//!
//! - [`access`] - Identity, authentication, access decisions, object filtering
//!   and the proxy dispatcher
//! - [`acl`] - ACL rule model, TOML source loading and the cached parse
//! - [`backend`] - The `Backend` trait and the in-memory reference backend
//! - [`objects`] - Managed-entity domain model (hosts, products, configs, ...)
//! - [`config`] - Configuration system with TOML and environment support

pub mod access;
pub mod acl;
pub mod backend;
pub mod config;
pub mod error;
pub mod objects;

// Prelude module for convenient imports
pub mod prelude;

// Re-exports of main types and traits
pub use access::{
    AccessControlledBackend, AccessDecisionEngine, Decision, IdentityStore, ObjectFilter,
    StaticAuthModule, StaticUser, SystemAuthModule,
};
pub use acl::{AclCache, AclEntry, AclEntryType, AclRule};
pub use backend::{Backend, MemoryBackend, MethodCall, ParamMap};
pub use config::{AccessControlConfig, TruncatePolicy};
pub use error::Error;
pub use objects::{Config, ConfigState, Entity, Group, Host, HostRole, Product, ProductOnClient};

/// Main result type for the framework
pub type Result<T> = std::result::Result<T, Error>;
