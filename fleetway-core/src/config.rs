//! Access control configuration

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What to do when parameter filtering removes objects or attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncatePolicy {
    /// Call through with whatever survived filtering
    #[default]
    Lenient,
    /// Fail the call as soon as filtering removes anything from its arguments
    Strict,
}

/// Configuration of the access-controlled backend proxy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControlConfig {
    /// ACL source file; when unset, a secure-by-default table restricted to
    /// the administrator group applies
    pub acl_file: Option<PathBuf>,

    /// Truncation behavior for parameter filtering
    #[serde(default)]
    pub truncate_policy: TruncatePolicy,
}

impl AccessControlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ACL source file
    pub fn with_acl_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.acl_file = Some(path.into());
        self
    }

    /// Set the truncation policy
    pub fn with_truncate_policy(mut self, policy: TruncatePolicy) -> Self {
        self.truncate_policy = policy;
        self
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(path) = env::var("FLEETWAY_ACL_FILE") {
            self.acl_file = Some(PathBuf::from(path));
        }
        if let Ok(strict) = env::var("FLEETWAY_STRICT_TRUNCATE") {
            self.truncate_policy = if strict.parse().unwrap_or(false) {
                TruncatePolicy::Strict
            } else {
                TruncatePolicy::Lenient
            };
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.acl_file {
            if !Path::new(path).is_file() {
                anyhow::bail!("ACL file {} does not exist", path.display());
            }
        }
        Ok(())
    }
}
