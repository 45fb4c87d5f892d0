//! Domain types shared by the transport and the reconcilers.
//!
//! Local records ([`TermDefinition`], [`TaxonomyDefinitions`]) are parsed from
//! `taxonomies.json`. Remote records ([`RemoteTaxonomy`], [`RemoteTerm`],
//! [`ResourceManifest`]) are what the content store reports. [`TermPayload`] is
//! what the engine sends back.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Parent id the remote store reports for top-level terms.
pub const ROOT_PARENT: &str = "0";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A remote term identifier, as assigned by the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TermId(pub String);

impl TermId {
    /// The sentinel parent id of top-level terms.
    pub fn root() -> Self {
        Self(ROOT_PARENT.to_owned())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PARENT
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TermId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TermId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Local definitions
// ---------------------------------------------------------------------------

/// One term as declared in `taxonomies.json`.
///
/// `name` and `slug` default to empty so that a missing field surfaces as a
/// validation error naming the term rather than as a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TermDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TermDefinition>,
}

impl TermDefinition {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children: Vec<TermDefinition>) -> Self {
        self.children = children;
        self
    }

    /// This term plus all of its descendants.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TermDefinition::count).sum::<usize>()
    }
}

/// Root of `taxonomies.json`: taxonomy name to its top-level terms.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyDefinitions(pub BTreeMap<String, Vec<TermDefinition>>);

impl TaxonomyDefinitions {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TermDefinition>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of terms across every taxonomy, children included.
    pub fn term_count(&self) -> usize {
        self.0
            .values()
            .flat_map(|terms| terms.iter())
            .map(TermDefinition::count)
            .sum()
    }
}

impl FromIterator<(String, Vec<TermDefinition>)> for TaxonomyDefinitions {
    fn from_iter<I: IntoIterator<Item = (String, Vec<TermDefinition>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Remote records
// ---------------------------------------------------------------------------

/// A taxonomy known to the remote store. Taxonomies are remote schema; the
/// engine never creates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTaxonomy {
    pub name: String,
}

/// A term as reported by the remote store: a flat record with a parent id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTerm {
    pub term_id: TermId,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    /// [`ROOT_PARENT`] for top-level terms.
    pub parent: TermId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Create/update payload for a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPayload {
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    /// Remote id of the already-resolved parent; `None` for top-level terms.
    pub parent: Option<TermId>,
    pub description: Option<String>,
}

impl TermPayload {
    /// True when `remote` already carries everything this payload would write.
    pub fn matches(&self, remote: &RemoteTerm) -> bool {
        let parent = self.parent.clone().unwrap_or_else(TermId::root);
        let description_matches = match &self.description {
            Some(wanted) => remote.description.as_deref().unwrap_or_default() == wanted,
            None => true,
        };
        remote.name == self.name
            && remote.slug == self.slug
            && remote.parent == parent
            && description_matches
    }
}

/// Remote resource manifest: relative path to content hash.
pub type ResourceManifest = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
