//! Resource synchronization.
//!
//! Every file under the resources directory is published under its relative
//! path unless the remote manifest already holds the same fingerprint. Remote
//! resources with no local counterpart are deleted once all publishing is done.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use wordsync_core::ContentStore;

use crate::error::{io_err, remote_err, SyncError};
use crate::fingerprint;

/// A file found under the resources directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResource {
    /// Path relative to the resources root, `/`-separated.
    pub relative_path: String,
    pub absolute: PathBuf,
}

/// Outcome for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "snake_case")]
pub enum ResourceChange {
    Published(String),
    /// Remote fingerprint matched; nothing sent.
    Unchanged(String),
    Deleted(String),
    WouldPublish(String),
    WouldDelete(String),
}

impl ResourceChange {
    pub fn path(&self) -> &str {
        match self {
            ResourceChange::Published(p)
            | ResourceChange::Unchanged(p)
            | ResourceChange::Deleted(p)
            | ResourceChange::WouldPublish(p)
            | ResourceChange::WouldDelete(p) => p,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ResourceChange::Published(_) => "published",
            ResourceChange::Unchanged(_) => "unchanged",
            ResourceChange::Deleted(_) => "deleted",
            ResourceChange::WouldPublish(_) => "would publish",
            ResourceChange::WouldDelete(_) => "would delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, ResourceChange::Unchanged(_))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

// Files before subdirectories, each group by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    a_dir.cmp(&b_dir).then_with(|| a.file_name().cmp(b.file_name()))
}

fn relative_key(root: &Path, path: &Path) -> Result<String, SyncError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| SyncError::NonUtf8Path {
                path: path.to_path_buf(),
            })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// List every non-hidden file under `root`, recursively.
///
/// Within each directory, files come before subdirectories. Symlinks are
/// followed, to files and directories alike; a link cycle is a walk error. A
/// missing root yields an empty list.
pub fn local_resources(root: &Path) -> Result<Vec<LocalResource>, SyncError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        found.push(LocalResource {
            relative_path: relative_key(root, entry.path())?,
            absolute: entry.into_path(),
        });
    }
    Ok(found)
}

/// Publish changed resources under `root`, then delete remote leftovers.
///
/// Does nothing, and makes no remote call, when `root` does not exist.
pub fn sync_resources(
    store: &dyn ContentStore,
    root: &Path,
    dry_run: bool,
) -> Result<Vec<ResourceChange>, SyncError> {
    if !root.is_dir() {
        tracing::info!("no resources to process");
        return Ok(Vec::new());
    }

    let locals = local_resources(root)?;
    let manifest = store
        .get_resources()
        .map_err(|e| remote_err("getting resources", e))?;

    let mut changes = Vec::new();
    let mut seen = BTreeSet::new();

    for resource in &locals {
        seen.insert(resource.relative_path.as_str());

        let bytes = std::fs::read(&resource.absolute)
            .map_err(|e| io_err(&resource.absolute, e))?;
        let encoded = fingerprint::encode(&bytes);

        if manifest.get(&resource.relative_path) == Some(&encoded.checksum) {
            tracing::debug!("unchanged: {}", resource.relative_path);
            changes.push(ResourceChange::Unchanged(resource.relative_path.clone()));
            continue;
        }

        if dry_run {
            tracing::info!("[dry-run] would publish: {}", resource.relative_path);
            changes.push(ResourceChange::WouldPublish(resource.relative_path.clone()));
            continue;
        }

        let stored = store
            .add_resource(&resource.relative_path, &encoded.content)
            .map_err(|e| remote_err(format!("publishing {}", resource.relative_path), e))?;
        if stored != encoded.checksum {
            tracing::warn!(
                "{}: server stored checksum {stored}, expected {}",
                resource.relative_path,
                encoded.checksum
            );
        }
        tracing::info!("published: {}", resource.relative_path);
        changes.push(ResourceChange::Published(resource.relative_path.clone()));
    }

    for path in manifest.keys().filter(|p| !seen.contains(p.as_str())) {
        if dry_run {
            tracing::info!("[dry-run] would delete: {path}");
            changes.push(ResourceChange::WouldDelete(path.clone()));
            continue;
        }
        store
            .delete_resource(path)
            .map_err(|e| remote_err(format!("deleting resource {path}"), e))?;
        tracing::info!("deleted: {path}");
        changes.push(ResourceChange::Deleted(path.clone()));
    }

    Ok(changes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
