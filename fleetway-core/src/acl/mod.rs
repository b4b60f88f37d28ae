//! ACL rule model
//!
//! An ACL table is an ordered list of rules; each rule pairs a method-name
//! pattern (a regular expression, matched by search) with an ordered list of
//! entries. Rule order is significant: the first rule whose pattern matches
//! a method name is the only one consulted for that call.

mod loader;

pub use loader::{load_acl_file, parse_acl, AclCache};

use std::collections::HashSet;

use regex::Regex;

use crate::error::Error;

/// Who an ACL entry applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclEntryType {
    /// Any caller, authenticated or not
    All,
    /// Managed hosts with the depot or config server role
    Depotserver,
    /// Managed hosts with the client role
    Client,
    /// System users by group membership
    Group,
    /// System users by name
    User,
    /// Objects owned by the caller; resolved per object during filtering
    Owner,
    /// Unrecognized tag, skipped with a diagnostic at evaluation time
    Unknown(String),
}

impl AclEntryType {
    /// Parse an entry type tag from its ACL source spelling
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "all" => Self::All,
            "depotserver" => Self::Depotserver,
            "client" => Self::Client,
            "group" => Self::Group,
            "user" => Self::User,
            "self" => Self::Owner,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// One entry of an ACL rule
///
/// `ids` restricts the entry to specific group names, usernames or host ids;
/// an empty set means "any" for the role-based types. When `allow_attributes`
/// is set, exactly these attributes are visible; otherwise `deny_attributes`
/// hides the listed attributes. Allow takes precedence when both are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub entry_type: AclEntryType,
    pub ids: HashSet<String>,
    pub allow_attributes: Option<HashSet<String>>,
    pub deny_attributes: Option<HashSet<String>>,
}

impl AclEntry {
    /// Entry applying to the given subject kind, unrestricted
    pub fn new(entry_type: AclEntryType) -> Self {
        Self { entry_type, ids: HashSet::new(), allow_attributes: None, deny_attributes: None }
    }

    /// Entry granting everything to everyone
    pub fn all() -> Self {
        Self::new(AclEntryType::All)
    }

    /// Entry for members of the given system group
    pub fn group(name: impl Into<String>) -> Self {
        let mut entry = Self::new(AclEntryType::Group);
        entry.ids.insert(name.into());
        entry
    }

    /// Entry for objects owned by the caller
    pub fn owner() -> Self {
        Self::new(AclEntryType::Owner)
    }

    /// Restrict to specific identifiers
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    /// Make exactly these attributes visible
    pub fn with_allow_attributes(
        mut self,
        attributes: impl IntoIterator<Item = String>,
    ) -> Self {
        self.allow_attributes = Some(attributes.into_iter().collect());
        self
    }

    /// Hide these attributes, keep the rest visible
    pub fn with_deny_attributes(mut self, attributes: impl IntoIterator<Item = String>) -> Self {
        self.deny_attributes = Some(attributes.into_iter().collect());
        self
    }

    /// True when the entry constrains attribute visibility
    pub fn restricts_attributes(&self) -> bool {
        self.allow_attributes.is_some() || self.deny_attributes.is_some()
    }
}

/// A method-name pattern paired with its ordered entries
#[derive(Debug, Clone)]
pub struct AclRule {
    pattern: Regex,
    pub entries: Vec<AclEntry>,
}

impl AclRule {
    /// Compile a rule; the pattern is matched against method names by search,
    /// not full match
    pub fn new(pattern: &str, entries: Vec<AclEntry>) -> crate::Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Configuration(format!("invalid ACL pattern '{pattern}': {e}")))?;
        Ok(Self { pattern, entries })
    }

    /// Does this rule apply to the given method name?
    pub fn matches(&self, method: &str) -> bool {
        self.pattern.is_match(method)
    }

    /// The source pattern, for diagnostics
    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }
}
