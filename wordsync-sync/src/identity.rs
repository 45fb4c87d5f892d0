//! Identity resolution: path keys and per-taxonomy remote snapshots.
//!
//! A term's stable identity across runs is its path key, the slash-joined
//! slugs from the taxonomy root down to the term. Remote terms only carry a
//! flat parent id, so a snapshot first indexes a taxonomy's full term list by
//! id and then expands each term's parent chain up to the root sentinel.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use wordsync_core::{RemoteTerm, TermId};

use crate::SyncError;

// ---------------------------------------------------------------------------
// PathKey
// ---------------------------------------------------------------------------

/// Slash-joined slugs from the root to a term, e.g. `events/meetups`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PathKey(String);

impl PathKey {
    /// Key of a top-level term.
    pub fn root(slug: &str) -> Self {
        Self(slug.to_owned())
    }

    /// Key of a child of `self`.
    pub fn child(&self, slug: &str) -> Self {
        Self(format!("{}/{}", self.0, slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of ancestors; top-level terms have depth 0.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for PathKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// RemoteSnapshot
// ---------------------------------------------------------------------------

/// Immutable path-keyed view of one taxonomy's remote terms, fetched once per
/// run. Matching is tracked outside the snapshot; see [`RemoteSnapshot::unmatched`].
#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    taxonomy: String,
    terms: BTreeMap<PathKey, RemoteTerm>,
}

impl RemoteSnapshot {
    /// Index `terms` by id and expand every term's path.
    ///
    /// Fails with [`SyncError::Inconsistent`] when a parent id is missing from
    /// the list or the parent chain never reaches the root.
    pub fn from_terms(taxonomy: &str, terms: Vec<RemoteTerm>) -> Result<Self, SyncError> {
        let by_id: HashMap<&TermId, &RemoteTerm> =
            terms.iter().map(|term| (&term.term_id, term)).collect();

        let mut keyed = BTreeMap::new();
        for term in &terms {
            let key = expand_path(taxonomy, term, &by_id)?;
            if let Some(previous) = keyed.insert(key.clone(), term.clone()) {
                tracing::warn!(
                    "{taxonomy} terms {} and {} share path {key}; keeping {}",
                    previous.term_id,
                    term.term_id,
                    term.term_id
                );
            }
        }

        Ok(Self {
            taxonomy: taxonomy.to_owned(),
            terms: keyed,
        })
    }

    pub fn taxonomy(&self) -> &str {
        &self.taxonomy
    }

    /// The remote term at `key`, if any. `None` means the term must be created.
    pub fn resolve(&self, key: &PathKey) -> Option<&RemoteTerm> {
        self.terms.get(key)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Remote terms whose key is not in `matched`, deepest first so that a
    /// child is always removed before its parent.
    pub fn unmatched<'a>(
        &'a self,
        matched: Option<&BTreeSet<PathKey>>,
    ) -> Vec<(&'a PathKey, &'a RemoteTerm)> {
        let mut leftovers: Vec<_> = self
            .terms
            .iter()
            .filter(|(key, _)| !matched.is_some_and(|m| m.contains(*key)))
            .collect();
        leftovers.sort_by(|(a, _), (b, _)| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));
        leftovers
    }
}

fn expand_path(
    taxonomy: &str,
    term: &RemoteTerm,
    by_id: &HashMap<&TermId, &RemoteTerm>,
) -> Result<PathKey, SyncError> {
    let mut slugs = vec![term.slug.as_str()];
    let mut current = term;
    let mut steps = 0usize;

    while !current.parent.is_root() {
        steps += 1;
        if steps > by_id.len() {
            return Err(SyncError::Inconsistent {
                taxonomy: taxonomy.to_owned(),
                detail: format!("term {} has a cyclic parent chain", term.term_id),
            });
        }
        current = by_id.get(&current.parent).copied().ok_or_else(|| SyncError::Inconsistent {
            taxonomy: taxonomy.to_owned(),
            detail: format!(
                "term {} refers to parent {} which does not exist",
                current.term_id, current.parent
            ),
        })?;
        slugs.push(current.slug.as_str());
    }

    slugs.reverse();
    Ok(PathKey(slugs.join("/")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
