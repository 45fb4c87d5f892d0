//! # wordsync-sync
//!
//! Reconciliation engine: makes a remote WordPress site's taxonomy terms and
//! resources match local definitions.
//!
//! Call [`run_validate`] before [`run_sync`]. The phases are also usable on
//! their own: [`taxonomy::sync_terms`] and [`resources::sync_resources`].

pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod pipeline;
pub mod resources;
pub mod taxonomy;
pub mod validate;

pub use error::SyncError;
pub use identity::{PathKey, RemoteSnapshot};
pub use pipeline::{
    check_version, lint, run_sync, run_validate, ContentPhase, NoContent, SyncOptions, SyncReport,
    ValidateReport, ENGINE_VERSION,
};
pub use resources::{LocalResource, ResourceChange};
pub use taxonomy::{TermChange, TermMap, TermSyncResult};
pub use validate::ValidationError;
