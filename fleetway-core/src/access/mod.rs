//! Access control for backend calls
//!
//! This module contains the authorization proxy and everything it is built
//! from:
//!
//! - [`IdentityStore`] - who is calling and what they have proven
//! - [`SystemAuthModule`] / authentication - host-key and system-user
//!   credential checks
//! - [`AccessDecisionEngine`] - first-match-wins rule evaluation producing a
//!   three-valued decision
//! - [`ObjectFilter`] - per-object, per-attribute filtering of call
//!   arguments and results under partial grants
//! - [`MethodRegistry`] - protected vs passthrough classification of the
//!   wrapped backend's call surface
//! - [`AccessControlledBackend`] - the proxy dispatcher tying it together

mod auth;
mod decision;
mod filter;
mod identity;
mod proxy;
mod registry;

pub use auth::{StaticAuthModule, StaticUser, SystemAuthModule};
pub use decision::{AccessDecisionEngine, Decision};
pub use filter::ObjectFilter;
pub use identity::IdentityStore;
pub use proxy::AccessControlledBackend;
pub use registry::MethodRegistry;
