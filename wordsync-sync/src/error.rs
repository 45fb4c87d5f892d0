//! Error types for wordsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use wordsync_core::{DefinitionError, RemoteError};

use crate::validate::ValidationError;

/// All errors that can arise from validation and synchronization runs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed; `context` names the operation.
    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: RemoteError,
    },

    /// `taxonomies.json` could not be read or parsed.
    #[error(transparent)]
    Definitions(#[from] DefinitionError),

    /// Structural validation of local definitions failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A local taxonomy does not exist remotely. Taxonomies are remote schema.
    #[error("invalid taxonomy: {taxonomy}; taxonomies must exist in WordPress prior to use in taxonomies.json")]
    UnknownTaxonomy { taxonomy: String },

    /// Remote term data cannot be resolved into paths.
    #[error("inconsistent remote {taxonomy} terms: {detail}")]
    Inconsistent { taxonomy: String, detail: String },

    #[error("mismatching versions; wordsync: {local}, XML-RPC extension: {remote}")]
    VersionMismatch { local: String, remote: String },

    /// The server does not expose the `gw.*` methods.
    #[error("XML-RPC extensions for wordsync are not installed")]
    ExtensionMissing,

    #[error("unknown error ({detail}); please ensure that your database server is running and WordPress is functioning properly")]
    UnknownServer { detail: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A resource file name that cannot be published under a stable key.
    #[error("resource path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    /// Resource directory traversal failed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Failure reported by a content phase implementation.
    #[error("content phase failed: {0}")]
    Content(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SyncError {
    /// True when the run failed because nothing was listening at the endpoint.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, SyncError::Remote { source, .. } if source.is_connection_refused())
    }
}

/// Convenience constructor for [`SyncError::Remote`].
pub(crate) fn remote_err(context: impl Into<String>, source: RemoteError) -> SyncError {
    SyncError::Remote {
        context: context.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
