//! Run coordination: `validate` and `sync` entrypoints used by the CLI.
//!
//! A sync run is strictly sequential: taxonomy phase, content phase, resource
//! phase. The first failing phase ends the run. Callers run [`run_validate`]
//! to completion before [`run_sync`]; the sync run does not re-check.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use wordsync_core::{ContentStore, RemoteError, SiteConfig};

use crate::error::{remote_err, SyncError};
use crate::resources::{self, ResourceChange};
use crate::taxonomy::{self, TermChange, TermMap};
use crate::validate;

/// Version the remote extension must report.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Content phase seam
// ---------------------------------------------------------------------------

/// Post/page publishing, run between the taxonomy and resource phases.
///
/// Implementations receive the [`TermMap`] so posts can reference terms by
/// path key.
pub trait ContentPhase {
    /// Structural validation of local content under `posts_dir`; returns the
    /// number of items checked.
    fn validate(&mut self, posts_dir: &Path) -> Result<usize, SyncError>;

    fn sync(
        &mut self,
        store: &dyn ContentStore,
        posts_dir: &Path,
        term_map: &TermMap,
        dry_run: bool,
    ) -> Result<(), SyncError>;
}

/// Content phase that publishes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContent;

impl ContentPhase for NoContent {
    fn validate(&mut self, posts_dir: &Path) -> Result<usize, SyncError> {
        tracing::debug!("content validation skipped for {}", posts_dir.display());
        Ok(0)
    }

    fn sync(
        &mut self,
        _store: &dyn ContentStore,
        posts_dir: &Path,
        term_map: &TermMap,
        _dry_run: bool,
    ) -> Result<(), SyncError> {
        tracing::debug!(
            "content publishing skipped for {} ({} terms available)",
            posts_dir.display(),
            term_map.len()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Version check
// ---------------------------------------------------------------------------

/// Compare the remote extension version with `expected`.
pub fn check_version_against(store: &dyn ContentStore, expected: &str) -> Result<String, SyncError> {
    let remote = match store.get_version() {
        Ok(version) => version,
        Err(e) => return Err(translate_version_error(e)),
    };
    if remote != expected {
        return Err(SyncError::VersionMismatch {
            local: expected.to_owned(),
            remote,
        });
    }
    tracing::info!("remote extension version {remote}");
    Ok(remote)
}

/// Compare the remote extension version with [`ENGINE_VERSION`].
pub fn check_version(store: &dyn ContentStore) -> Result<String, SyncError> {
    check_version_against(store, ENGINE_VERSION)
}

fn translate_version_error(err: RemoteError) -> SyncError {
    match err {
        e if e.is_connection_refused() => remote_err("could not connect to WordPress", e),
        e if e.is_method_not_found() => SyncError::ExtensionMissing,
        RemoteError::Fault { code: 0, message } => SyncError::UnknownServer { detail: message },
        RemoteError::Http { status, endpoint } if status >= 500 => SyncError::UnknownServer {
            detail: format!("HTTP {status} from {endpoint}"),
        },
        RemoteError::Protocol(detail) => SyncError::UnknownServer { detail },
        e => remote_err("checking extension version", e),
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Options for a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report planned mutations without issuing them.
    pub dry_run: bool,
}

/// Outcome of a validate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidateReport {
    pub remote_version: String,
    /// Local terms validated.
    pub terms: usize,
    /// Content items validated.
    pub content: usize,
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub terms: Vec<TermChange>,
    pub term_map: TermMap,
    pub resources: Vec<ResourceChange>,
}

impl SyncReport {
    /// Count of mutating (or, in a dry run, planned) calls.
    pub fn mutations(&self) -> usize {
        self.terms.iter().filter(|c| c.is_mutation()).count()
            + self.resources.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn is_noop(&self) -> bool {
        self.mutations() == 0
    }
}

// ---------------------------------------------------------------------------
// Entrypoints
// ---------------------------------------------------------------------------

/// Offline structural validation of `taxonomies.json` and local content.
pub fn lint(site: &SiteConfig, content: &mut dyn ContentPhase) -> Result<(usize, usize), SyncError> {
    let terms = validate::validate_terms_at(&site.taxonomies_path())?;
    let items = content.validate(&site.posts_dir())?;
    Ok((terms, items))
}

/// Remote version check, then taxonomy and content structural validation.
pub fn run_validate(
    store: &dyn ContentStore,
    site: &SiteConfig,
    content: &mut dyn ContentPhase,
) -> Result<ValidateReport, SyncError> {
    let remote_version = check_version(store)?;
    let (terms, items) = lint(site, content)?;
    Ok(ValidateReport {
        remote_version,
        terms,
        content: items,
    })
}

/// Taxonomy phase, content phase, resource phase; the first error aborts.
pub fn run_sync(
    store: &dyn ContentStore,
    site: &SiteConfig,
    content: &mut dyn ContentPhase,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    tracing::info!("synchronizing {} (dry run: {})", site.label(), options.dry_run);

    let terms = taxonomy::sync_terms_at(store, &site.taxonomies_path(), options.dry_run)?;
    content.sync(store, &site.posts_dir(), &terms.term_map, options.dry_run)?;
    let resources = resources::sync_resources(store, &site.resources_dir(), options.dry_run)?;

    Ok(SyncReport {
        target: site.label().to_owned(),
        started_at,
        finished_at: Utc::now(),
        dry_run: options.dry_run,
        terms: terms.changes,
        term_map: terms.term_map,
        resources,
    })
}
