//! Access decisions
//!
//! The decision engine walks the ordered ACL table and evaluates the first
//! rule whose pattern matches the method name. Later rules are never
//! consulted, even when the first match denies everything - ACL authors
//! order rules from most specific to least specific.

use std::sync::Arc;

use super::identity::IdentityStore;
use crate::acl::{AclEntry, AclEntryType, AclRule};

/// How much access a single entry yields, as an explicit lattice
///
/// Ordering matters: `None < Partial < Full`. The most permissive verdict
/// across a rule's entries wins, and `Full` short-circuits the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Access {
    None,
    Partial,
    Full,
}

/// Outcome of an access decision for one call
#[derive(Debug, Clone)]
pub enum Decision {
    /// No entry of the matching rule applies to the caller
    Denied,
    /// At least one entry grants the call unconditionally
    Granted,
    /// The call may proceed, constrained by the contributing entries
    PartiallyGranted(Vec<AclEntry>),
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Denied)
    }
}

/// Evaluates the ACL table against method names and identities
pub struct AccessDecisionEngine {
    rules: Arc<Vec<AclRule>>,
}

impl AccessDecisionEngine {
    pub fn new(rules: Arc<Vec<AclRule>>) -> Self {
        Self { rules }
    }

    /// Decide whether `identity` may call `method`.
    ///
    /// First matching pattern wins; a method matching no rule at all is
    /// denied.
    pub fn decide(&self, method: &str, identity: &IdentityStore) -> Decision {
        for rule in self.rules.iter() {
            if rule.matches(method) {
                log::debug!("method '{method}' matched ACL pattern '{}'", rule.pattern_str());
                return evaluate_rule(rule, identity);
            }
        }
        log::debug!("method '{method}' matched no ACL pattern");
        Decision::Denied
    }

    /// The table this engine evaluates
    pub fn rules(&self) -> &Arc<Vec<AclRule>> {
        &self.rules
    }
}

fn evaluate_rule(rule: &AclRule, identity: &IdentityStore) -> Decision {
    let mut contributing: Vec<AclEntry> = Vec::new();
    let mut best = Access::None;

    for entry in &rule.entries {
        let verdict = match &entry.entry_type {
            AclEntryType::All => Access::Full,
            AclEntryType::Depotserver => host_role_verdict(identity, entry, true),
            AclEntryType::Client => host_role_verdict(identity, entry, false),
            AclEntryType::Group => {
                if identity.user_groups.iter().any(|g| entry.ids.contains(g)) {
                    Access::Full
                } else {
                    Access::None
                }
            }
            AclEntryType::User => {
                if entry.ids.contains(&identity.username) {
                    Access::Full
                } else {
                    Access::None
                }
            }
            // Ownership is resolved later, per object, during filtering.
            AclEntryType::Owner => Access::Partial,
            AclEntryType::Unknown(tag) => {
                log::warn!("skipping ACL entry with unknown type '{tag}'");
                continue;
            }
        };

        if verdict == Access::None {
            continue;
        }

        // Attribute restrictions downgrade any verdict to partial.
        let verdict = if entry.restricts_attributes() { Access::Partial } else { verdict };

        contributing.push(entry.clone());
        best = best.max(verdict);
        if best == Access::Full {
            break;
        }
    }

    match best {
        Access::Full => Decision::Granted,
        Access::None => Decision::Denied,
        Access::Partial => Decision::PartiallyGranted(contributing),
    }
}

fn host_role_verdict(identity: &IdentityStore, entry: &AclEntry, want_depot: bool) -> Access {
    let Some(host) = &identity.host else {
        return Access::None;
    };
    let role_matches = if want_depot { host.is_depot() } else { !host.is_depot() };
    if role_matches && (entry.ids.is_empty() || entry.ids.contains(&host.id)) {
        Access::Full
    } else {
        Access::None
    }
}
