//! Error taxonomy for the access-controlled backend layer.
//!
//! Authentication failures are deliberately opaque towards the caller: the
//! underlying reason (wrong user, wrong key, module outage) is logged on the
//! server side only. Missing-data errors during host authentication stay
//! distinguishable so operators can tell "unknown host" from "wrong key".

use thiserror::Error;

/// Main error type for the Fleetway backend layer
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid backend or ACL wiring. Fatal at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credentials rejected, authentication module missing or failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A referenced managed entity was not found.
    #[error("missing data: {0}")]
    MissingData(String),

    /// The access decision was negative, or filtering removed every usable
    /// parameter of a call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Failure inside the wrapped backend, propagated unchanged.
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// True for errors the authorization layer itself produced, as opposed to
    /// errors the wrapped backend raised during a delegated call.
    pub fn is_access_error(&self) -> bool {
        !matches!(self, Error::Backend(_))
    }
}
