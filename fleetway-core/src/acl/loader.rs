//! ACL source loading and caching
//!
//! The on-disk ACL source is a TOML document of ordered `[[rule]]` tables:
//!
//! ```toml
//! [[rule]]
//! method = "^host_"
//!
//! [[rule.entry]]
//! type = "group"
//! ids = ["fleetadmin"]
//!
//! [[rule.entry]]
//! type = "self"
//! allow_attributes = ["id", "description"]
//! ```
//!
//! Parsed tables are cached per source path and re-parsed only when the file's
//! modification time changes, so concurrent proxy constructions against the
//! same source share one parse.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use lazy_static::lazy_static;
use serde::Deserialize;

use super::{AclEntry, AclEntryType, AclRule};
use crate::error::Error;

#[derive(Debug, Deserialize)]
struct RawAclDocument {
    #[serde(default, rename = "rule")]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    method: String,
    #[serde(default, rename = "entry")]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    ids: Vec<String>,
    allow_attributes: Option<Vec<String>>,
    deny_attributes: Option<Vec<String>>,
}

/// Parse ACL rules from TOML source text
pub fn parse_acl(text: &str) -> crate::Result<Vec<AclRule>> {
    let document: RawAclDocument = toml::from_str(text)
        .map_err(|e| Error::Configuration(format!("invalid ACL source: {e}")))?;

    document
        .rules
        .into_iter()
        .map(|raw| {
            let entries = raw
                .entries
                .into_iter()
                .map(|raw_entry| {
                    let mut entry = AclEntry::new(AclEntryType::from_tag(&raw_entry.entry_type))
                        .with_ids(raw_entry.ids);
                    if let Some(allow) = raw_entry.allow_attributes {
                        entry = entry.with_allow_attributes(allow);
                    }
                    if let Some(deny) = raw_entry.deny_attributes {
                        entry = entry.with_deny_attributes(deny);
                    }
                    entry
                })
                .collect();
            AclRule::new(&raw.method, entries)
        })
        .collect()
}

struct CacheSlot {
    modified: SystemTime,
    rules: Arc<Vec<AclRule>>,
}

/// Cache of parsed ACL sources, keyed by path
///
/// Invalidation is mtime-based: `load` re-reads a source only when its
/// modification time differs from the cached one.
pub struct AclCache {
    slots: Mutex<HashMap<PathBuf, CacheSlot>>,
}

impl AclCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    /// Load the ACL table at `path`, reusing the cached parse when the file
    /// has not changed
    pub fn load(&self, path: impl AsRef<Path>) -> crate::Result<Arc<Vec<AclRule>>> {
        let path = path.as_ref();
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| Error::Configuration(format!("cannot stat ACL file {path:?}: {e}")))?;

        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get(path) {
            if slot.modified == modified {
                return Ok(Arc::clone(&slot.rules));
            }
            log::info!("ACL file {path:?} changed, reloading");
        }

        let text = fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read ACL file {path:?}: {e}")))?;
        let rules = Arc::new(parse_acl(&text)?);
        log::debug!("loaded {} ACL rules from {path:?}", rules.len());
        slots.insert(path.to_path_buf(), CacheSlot { modified, rules: Arc::clone(&rules) });
        Ok(rules)
    }

    /// Drop all cached parses
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

impl Default for AclCache {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref PROCESS_CACHE: AclCache = AclCache::new();
}

/// Load an ACL file through the process-wide cache
pub fn load_acl_file(path: impl AsRef<Path>) -> crate::Result<Arc<Vec<AclRule>>> {
    PROCESS_CACHE.load(path)
}
