//! Identifiers and linked-collection primitives.
//!
//! A [`LinkedItem`] compares, orders, and hashes by its [`IdentityKey`] only,
//! so two items that differ in a non-key attribute (the remote `link_id`)
//! are the same item for diffing purposes.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The sentinel that declares a collection as shared with every peer.
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed managed-workspace identifier (`ws-…`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub String);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkspaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed account identifier (`acc-…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Linked collection items
// ---------------------------------------------------------------------------

/// Composite identity of a linked item: `id` plus its alias (`""` when unset).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
    pub id: String,
    pub alias: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id, self.alias)
    }
}

/// One member of a linked collection (tag, provider-configuration link,
/// remote-state consumer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Remote handle of the link record itself. Present only on items read
    /// from the remote; never part of the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
}

impl LinkedItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            link_id: None,
        }
    }

    /// An item with an alias; an empty alias is normalised to none.
    pub fn with_alias(id: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            id: id.into(),
            alias: (!alias.is_empty()).then_some(alias),
            link_id: None,
        }
    }

    pub fn with_link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_id = Some(link_id.into());
        self
    }

    /// The alias, or `""` when unset.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or("")
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            id: self.id.clone(),
            alias: self.alias().to_owned(),
        }
    }

    fn key_parts(&self) -> (&str, &str) {
        (self.id.as_str(), self.alias())
    }
}

impl PartialEq for LinkedItem {
    fn eq(&self, other: &Self) -> bool {
        self.key_parts() == other.key_parts()
    }
}

impl Eq for LinkedItem {}

impl Hash for LinkedItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_parts().hash(state);
    }
}

impl PartialOrd for LinkedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinkedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_parts().cmp(&other.key_parts())
    }
}

impl fmt::Display for LinkedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} (alias {alias})", self.id),
            None => self.id.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Share scope
// ---------------------------------------------------------------------------

/// A collection that is either shared with everyone or an explicit item set.
///
/// `All` and `Explicit(∅)` are distinct states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareScope {
    All,
    Explicit(BTreeSet<LinkedItem>),
}

impl Default for ShareScope {
    fn default() -> Self {
        ShareScope::Explicit(BTreeSet::new())
    }
}

impl ShareScope {
    pub fn is_all(&self) -> bool {
        matches!(self, ShareScope::All)
    }

    /// Explicit members; empty for `All`.
    pub fn explicit(&self) -> BTreeSet<LinkedItem> {
        match self {
            ShareScope::All => BTreeSet::new(),
            ShareScope::Explicit(items) => items.clone(),
        }
    }

    /// Persisted form: `{"*"}` for `All`, else the member ids.
    pub fn to_ids(&self) -> BTreeSet<String> {
        match self {
            ShareScope::All => BTreeSet::from([WILDCARD.to_owned()]),
            ShareScope::Explicit(items) => items.iter().map(|i| i.id.clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
