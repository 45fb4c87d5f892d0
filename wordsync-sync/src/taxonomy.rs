//! Taxonomy reconciliation.
//!
//! ## `sync_terms`: 5-step protocol
//!
//! 1. Fetch remote taxonomies; reject local taxonomies unknown remotely.
//! 2. Fetch every remote taxonomy's terms into path-keyed snapshots.
//! 3. Walk local terms depth-first; create or update each term after its
//!    parent has a remote id. Skip terms already current.
//! 4. Delete remote terms no local term matched, after all creates/updates.
//! 5. Return the [`TermMap`] for the content phase.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use wordsync_core::{
    definitions, ContentStore, RemoteTaxonomy, TaxonomyDefinitions, TermDefinition, TermId,
    TermPayload,
};

use crate::error::{remote_err, SyncError};
use crate::identity::{PathKey, RemoteSnapshot};

// ---------------------------------------------------------------------------
// TermMap
// ---------------------------------------------------------------------------

/// Remote ids of every synchronized term: taxonomy, then path key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermMap(BTreeMap<String, BTreeMap<PathKey, TermId>>);

impl TermMap {
    pub fn get(&self, taxonomy: &str, path: &str) -> Option<&TermId> {
        self.0.get(taxonomy).and_then(|terms| terms.get(path))
    }

    pub fn taxonomy(&self, taxonomy: &str) -> Option<&BTreeMap<PathKey, TermId>> {
        self.0.get(taxonomy)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, taxonomy: &str, path: PathKey, id: TermId) {
        self.0.entry(taxonomy.to_owned()).or_default().insert(path, id);
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Outcome for one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TermChange {
    Created { taxonomy: String, path: PathKey, id: TermId },
    Updated { taxonomy: String, path: PathKey, id: TermId },
    /// Remote term already matches the definition; no call issued.
    Unchanged { taxonomy: String, path: PathKey, id: TermId },
    Deleted { taxonomy: String, path: PathKey, id: TermId },
    /// `--dry-run`: the term *would* have been created.
    WouldCreate { taxonomy: String, path: PathKey },
    WouldUpdate { taxonomy: String, path: PathKey, id: TermId },
    WouldDelete { taxonomy: String, path: PathKey, id: TermId },
}

impl TermChange {
    pub fn taxonomy(&self) -> &str {
        match self {
            TermChange::Created { taxonomy, .. }
            | TermChange::Updated { taxonomy, .. }
            | TermChange::Unchanged { taxonomy, .. }
            | TermChange::Deleted { taxonomy, .. }
            | TermChange::WouldCreate { taxonomy, .. }
            | TermChange::WouldUpdate { taxonomy, .. }
            | TermChange::WouldDelete { taxonomy, .. } => taxonomy,
        }
    }

    pub fn path(&self) -> &PathKey {
        match self {
            TermChange::Created { path, .. }
            | TermChange::Updated { path, .. }
            | TermChange::Unchanged { path, .. }
            | TermChange::Deleted { path, .. }
            | TermChange::WouldCreate { path, .. }
            | TermChange::WouldUpdate { path, .. }
            | TermChange::WouldDelete { path, .. } => path,
        }
    }

    /// Short verb for summaries.
    pub fn action(&self) -> &'static str {
        match self {
            TermChange::Created { .. } => "created",
            TermChange::Updated { .. } => "updated",
            TermChange::Unchanged { .. } => "unchanged",
            TermChange::Deleted { .. } => "deleted",
            TermChange::WouldCreate { .. } => "would create",
            TermChange::WouldUpdate { .. } => "would update",
            TermChange::WouldDelete { .. } => "would delete",
        }
    }

    /// Whether the change issued (or would issue) a mutating call.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, TermChange::Unchanged { .. })
    }
}

/// Outcome of the taxonomy phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermSyncResult {
    pub term_map: TermMap,
    pub changes: Vec<TermChange>,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Fetch the names of every remote taxonomy.
pub fn fetch_taxonomies(store: &dyn ContentStore) -> Result<Vec<RemoteTaxonomy>, SyncError> {
    tracing::debug!("getting taxonomies");
    store
        .get_taxonomies()
        .map_err(|e| remote_err("getting taxonomies", e))
}

/// Fetch the full term list of each taxonomy and build one snapshot apiece.
pub fn fetch_snapshots(
    store: &dyn ContentStore,
    taxonomies: Vec<RemoteTaxonomy>,
) -> Result<BTreeMap<String, RemoteSnapshot>, SyncError> {
    let mut snapshots = BTreeMap::new();
    for taxonomy in taxonomies {
        tracing::debug!("getting {} terms", taxonomy.name);
        let terms = store
            .get_terms(&taxonomy.name)
            .map_err(|e| remote_err(format!("getting {} terms", taxonomy.name), e))?;
        let snapshot = RemoteSnapshot::from_terms(&taxonomy.name, terms)?;
        snapshots.insert(taxonomy.name, snapshot);
    }
    Ok(snapshots)
}

// ---------------------------------------------------------------------------
// sync_terms
// ---------------------------------------------------------------------------

struct TermReconciler<'s> {
    store: &'s dyn ContentStore,
    dry_run: bool,
    term_map: TermMap,
    changes: Vec<TermChange>,
    matched: BTreeMap<String, BTreeSet<PathKey>>,
}

impl TermReconciler<'_> {
    fn process(
        &mut self,
        snapshot: &RemoteSnapshot,
        terms: &[TermDefinition],
        parent: Option<(&PathKey, Option<&TermId>)>,
    ) -> Result<(), SyncError> {
        let taxonomy = snapshot.taxonomy();

        for term in terms {
            let path = match parent {
                Some((parent_path, _)) => parent_path.child(&term.slug),
                None => PathKey::root(&term.slug),
            };
            let payload = TermPayload {
                taxonomy: taxonomy.to_owned(),
                name: term.name.clone(),
                slug: term.slug.clone(),
                parent: parent.and_then(|(_, id)| id.cloned()),
                description: term.description.clone(),
            };

            let existing = snapshot.resolve(&path);
            let id = match existing {
                Some(remote) if payload.matches(remote) => {
                    tracing::debug!("unchanged: {taxonomy} {path}");
                    self.record(TermChange::Unchanged {
                        taxonomy: taxonomy.to_owned(),
                        path: path.clone(),
                        id: remote.term_id.clone(),
                    });
                    Some(remote.term_id.clone())
                }
                Some(remote) => {
                    let id = remote.term_id.clone();
                    if self.dry_run {
                        tracing::info!("[dry-run] would update: {taxonomy} {path}");
                        self.record(TermChange::WouldUpdate {
                            taxonomy: taxonomy.to_owned(),
                            path: path.clone(),
                            id: id.clone(),
                        });
                    } else {
                        self.store
                            .edit_term(&id, &payload)
                            .map_err(|e| remote_err(format!("editing {taxonomy} {path}"), e))?;
                        tracing::info!("updated: {taxonomy} {path}");
                        self.record(TermChange::Updated {
                            taxonomy: taxonomy.to_owned(),
                            path: path.clone(),
                            id: id.clone(),
                        });
                    }
                    Some(id)
                }
                None if self.dry_run => {
                    tracing::info!("[dry-run] would create: {taxonomy} {path}");
                    self.record(TermChange::WouldCreate {
                        taxonomy: taxonomy.to_owned(),
                        path: path.clone(),
                    });
                    None
                }
                None => {
                    let id = self
                        .store
                        .new_term(&payload)
                        .map_err(|e| remote_err(format!("creating {taxonomy} {path}"), e))?;
                    tracing::info!("created: {taxonomy} {path}");
                    self.record(TermChange::Created {
                        taxonomy: taxonomy.to_owned(),
                        path: path.clone(),
                        id: id.clone(),
                    });
                    Some(id)
                }
            };

            if existing.is_some() {
                self.matched
                    .entry(taxonomy.to_owned())
                    .or_default()
                    .insert(path.clone());
            }
            if let Some(id) = &id {
                self.term_map.insert(taxonomy, path.clone(), id.clone());
            }

            if !term.children.is_empty() {
                self.process(snapshot, &term.children, Some((&path, id.as_ref())))?;
            }
        }
        Ok(())
    }

    fn delete_unmatched(
        &mut self,
        snapshots: &BTreeMap<String, RemoteSnapshot>,
    ) -> Result<(), SyncError> {
        for (taxonomy, snapshot) in snapshots {
            for (path, remote) in snapshot.unmatched(self.matched.get(taxonomy)) {
                if self.dry_run {
                    tracing::info!("[dry-run] would delete: {taxonomy} {path}");
                    self.record(TermChange::WouldDelete {
                        taxonomy: taxonomy.clone(),
                        path: path.clone(),
                        id: remote.term_id.clone(),
                    });
                    continue;
                }
                self.store
                    .delete_term(taxonomy, &remote.term_id)
                    .map_err(|e| remote_err(format!("deleting {taxonomy} {path}"), e))?;
                tracing::info!("deleted: {taxonomy} {path}");
                self.record(TermChange::Deleted {
                    taxonomy: taxonomy.clone(),
                    path: path.clone(),
                    id: remote.term_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, change: TermChange) {
        self.changes.push(change);
    }
}

/// Reconcile remote terms against `definitions`.
///
/// Every create/update across every taxonomy completes before the first
/// delete. Any failed call aborts the phase immediately.
pub fn sync_terms(
    store: &dyn ContentStore,
    definitions: &TaxonomyDefinitions,
    dry_run: bool,
) -> Result<TermSyncResult, SyncError> {
    let taxonomies = fetch_taxonomies(store)?;

    // Taxonomies must already exist remotely.
    for (taxonomy, _) in definitions.iter() {
        if !taxonomies.iter().any(|t| &t.name == taxonomy) {
            return Err(SyncError::UnknownTaxonomy {
                taxonomy: taxonomy.clone(),
            });
        }
    }

    let snapshots = fetch_snapshots(store, taxonomies)?;

    let mut reconciler = TermReconciler {
        store,
        dry_run,
        term_map: TermMap::default(),
        changes: Vec::new(),
        matched: BTreeMap::new(),
    };

    for (taxonomy, terms) in definitions.iter() {
        tracing::debug!("processing {taxonomy} terms");
        reconciler.process(&snapshots[taxonomy], terms, None)?;
    }

    // TODO: defer term deletion until after the content phase so posts can
    // introduce keywords that are not declared in taxonomies.json.
    reconciler.delete_unmatched(&snapshots)?;

    Ok(TermSyncResult {
        term_map: reconciler.term_map,
        changes: reconciler.changes,
    })
}

/// Load `taxonomies.json` at `path` and reconcile it.
///
/// A missing file means no terms to process: succeeds with an empty result
/// without contacting the remote store.
pub fn sync_terms_at(
    store: &dyn ContentStore,
    path: &Path,
    dry_run: bool,
) -> Result<TermSyncResult, SyncError> {
    let Some(definitions) = definitions::load_at(path)? else {
        tracing::info!("no terms to process");
        return Ok(TermSyncResult::default());
    };
    sync_terms(store, &definitions, dry_run)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
