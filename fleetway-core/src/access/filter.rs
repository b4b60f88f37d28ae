//! Object and attribute filtering for partial grants
//!
//! When a decision is partially granted, the contributing ACL entries
//! constrain which objects and which attributes of those objects may pass
//! through. The same per-object pass runs over call arguments and results;
//! the two call sites differ only in how they treat an empty outcome:
//! arguments fail closed, results fail open.

use std::collections::HashSet;

use serde_json::Value;

use super::identity::IdentityStore;
use crate::acl::{AclEntry, AclEntryType};
use crate::backend::ParamMap;
use crate::config::TruncatePolicy;
use crate::error::Error;
use crate::objects::{ident_attributes, TYPE_ATTRIBUTE};

/// Attributes checked, in order, to find the one identifying an object for
/// ownership (`self`) entries
const SELF_IDENT_ATTRIBUTES: &[&str] =
    &["id", "objectId", "hostId", "clientId", "depotId", "serverId"];

#[derive(Debug, Default)]
struct FilterStats {
    objects_removed: usize,
    attributes_removed: usize,
}

/// Applies the contributing entries of a partial grant to values
pub struct ObjectFilter<'a> {
    identity: &'a IdentityStore,
    entries: &'a [AclEntry],
    policy: TruncatePolicy,
    method: &'a str,
}

impl<'a> ObjectFilter<'a> {
    pub fn new(
        identity: &'a IdentityStore,
        entries: &'a [AclEntry],
        policy: TruncatePolicy,
        method: &'a str,
    ) -> Self {
        Self { identity, entries, policy, method }
    }

    /// Filter call arguments. Fails closed: when filtering leaves no usable
    /// parameter, the call must not reach the backend.
    pub fn filter_params(&self, params: &ParamMap) -> crate::Result<ParamMap> {
        let mut stats = FilterStats::default();
        let mut filtered = ParamMap::new();

        for (name, value) in params {
            match value {
                Value::Object(object) => match self.filter_object(object, &mut stats) {
                    Some(kept) => {
                        filtered.insert(name.clone(), Value::Object(kept));
                    }
                    None => {
                        log::debug!(
                            "parameter '{name}' of '{}' removed by access filtering",
                            self.method
                        );
                    }
                },
                Value::Array(items) => {
                    let kept = self.filter_array(items, &mut stats);
                    if kept.is_empty() {
                        log::debug!(
                            "parameter '{name}' of '{}' emptied by access filtering",
                            self.method
                        );
                    } else {
                        filtered.insert(name.clone(), Value::Array(kept));
                    }
                }
                scalar => {
                    filtered.insert(name.clone(), scalar.clone());
                }
            }
        }

        if filtered.is_empty() && !params.is_empty() {
            return Err(Error::PermissionDenied(format!(
                "no allowed parameter supplied for method '{}'",
                self.method
            )));
        }
        if self.policy == TruncatePolicy::Strict
            && (stats.objects_removed > 0 || stats.attributes_removed > 0)
        {
            return Err(Error::PermissionDenied(format!(
                "access filtering would truncate parameters of method '{}' \
                 ({} objects, {} attributes)",
                self.method, stats.objects_removed, stats.attributes_removed
            )));
        }
        Ok(filtered)
    }

    /// Filter a call result. Fails open: an empty outcome degrades to an
    /// empty collection or an absent value, never an error.
    pub fn filter_result(&self, value: Value) -> Value {
        let mut stats = FilterStats::default();
        let filtered = match value {
            Value::Array(items) => Value::Array(self.filter_array(&items, &mut stats)),
            Value::Object(object) => self
                .filter_object(&object, &mut stats)
                .map(Value::Object)
                .unwrap_or(Value::Null),
            scalar => scalar,
        };
        if stats.objects_removed > 0 || stats.attributes_removed > 0 {
            log::info!(
                "access control removed {} objects and {} attributes from the result of '{}'",
                stats.objects_removed,
                stats.attributes_removed,
                self.method
            );
        }
        filtered
    }

    /// Filter the object elements of a collection, preserving relative order.
    /// Scalar elements pass through untouched.
    fn filter_array(&self, items: &[Value], stats: &mut FilterStats) -> Vec<Value> {
        items
            .iter()
            .filter_map(|item| match item {
                Value::Object(object) => {
                    self.filter_object(object, stats).map(Value::Object)
                }
                scalar => Some(scalar.clone()),
            })
            .collect()
    }

    /// The shared per-object pass: union the attribute contributions of every
    /// applicable entry, then trim. Returns None when the object is dropped.
    fn filter_object(&self, object: &ParamMap, stats: &mut FilterStats) -> Option<ParamMap> {
        let mut allowed: HashSet<String> = HashSet::new();
        let mut allow_all = false;

        for entry in self.entries {
            // self entries authorize per object: only objects the caller is
            // the subject of acquire attributes from them
            if entry.entry_type == AclEntryType::Owner && !self.owns(object) {
                continue;
            }
            match (&entry.allow_attributes, &entry.deny_attributes) {
                (Some(allow), _) => allowed.extend(allow.iter().cloned()),
                (None, Some(deny)) => {
                    allowed.extend(
                        object.keys().filter(|key| !deny.contains(*key)).cloned(),
                    );
                }
                (None, None) => {
                    allow_all = true;
                    break;
                }
            }
        }

        if allow_all {
            return Some(object.clone());
        }
        if allowed.is_empty() {
            stats.objects_removed += 1;
            return None;
        }

        // A filtered object must stay identifiable and re-constructible:
        // the type discriminator and the identifying attributes always
        // survive.
        let object_type =
            object.get(TYPE_ATTRIBUTE).and_then(Value::as_str).unwrap_or_default().to_string();
        let idents = ident_attributes(&object_type);
        let self_ident = self.self_ident_attribute(object);

        let before = object.len();
        let kept: ParamMap = object
            .iter()
            .filter(|(key, _)| {
                key.as_str() == TYPE_ATTRIBUTE
                    || idents.iter().any(|ident| *ident == key.as_str())
                    || self_ident == Some(key.as_str())
                    || allowed.contains(key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        stats.attributes_removed += before - kept.len();
        Some(kept)
    }

    /// Is the caller the subject of this object?
    fn owns(&self, object: &ParamMap) -> bool {
        match self.self_ident_attribute(object) {
            Some(attribute) => {
                object.get(attribute).and_then(Value::as_str)
                    == Some(self.identity.username.as_str())
            }
            None => false,
        }
    }

    /// The first identifying attribute present on the object, if any
    fn self_ident_attribute(&self, object: &ParamMap) -> Option<&'static str> {
        SELF_IDENT_ATTRIBUTES.iter().copied().find(|attr| object.contains_key(*attr))
    }
}
