//! The remote content store seam.
//!
//! The reconcilers only ever talk to a [`ContentStore`]. `wordsync-rpc`
//! provides the XML-RPC implementation; tests use an in-memory one.

use thiserror::Error;

use crate::types::{RemoteTaxonomy, RemoteTerm, ResourceManifest, TermId, TermPayload};

/// Fault code returned when the server does not know the called method.
pub const FAULT_METHOD_NOT_FOUND: i64 = -32601;

/// Failures reported by a [`ContentStore`].
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Nothing is listening at the endpoint.
    #[error("connection refused by {endpoint}")]
    ConnectionRefused { endpoint: String },

    /// The server answered with a fault. Authentication and permission
    /// failures arrive here with the server's own wording.
    #[error("{message} (fault {code})")]
    Fault { code: i64, message: String },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    /// DNS, TLS, timeout, or other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, RemoteError::ConnectionRefused { .. })
    }

    pub fn is_method_not_found(&self) -> bool {
        matches!(self, RemoteError::Fault { code, .. } if *code == FAULT_METHOD_NOT_FOUND)
    }
}

/// Narrow RPC surface of the remote content store.
///
/// Every call is a suspension point; callers sequence them strictly.
pub trait ContentStore {
    /// Version of the server-side extension.
    fn get_version(&self) -> Result<String, RemoteError>;

    fn get_taxonomies(&self) -> Result<Vec<RemoteTaxonomy>, RemoteError>;

    /// All terms of `taxonomy`, flat, each carrying its parent id.
    fn get_terms(&self, taxonomy: &str) -> Result<Vec<RemoteTerm>, RemoteError>;

    /// Create a term; returns the newly assigned id.
    fn new_term(&self, term: &TermPayload) -> Result<TermId, RemoteError>;

    fn edit_term(&self, term_id: &TermId, term: &TermPayload) -> Result<(), RemoteError>;

    fn delete_term(&self, taxonomy: &str, term_id: &TermId) -> Result<(), RemoteError>;

    /// Manifest of every stored resource: relative path to content hash.
    fn get_resources(&self) -> Result<ResourceManifest, RemoteError>;

    /// Create or replace a resource; returns the hash the server computed.
    fn add_resource(&self, path: &str, content_base64: &str) -> Result<String, RemoteError>;

    fn delete_resource(&self, path: &str) -> Result<(), RemoteError>;
}

impl<S: ContentStore + ?Sized> ContentStore for &S {
    fn get_version(&self) -> Result<String, RemoteError> {
        (**self).get_version()
    }

    fn get_taxonomies(&self) -> Result<Vec<RemoteTaxonomy>, RemoteError> {
        (**self).get_taxonomies()
    }

    fn get_terms(&self, taxonomy: &str) -> Result<Vec<RemoteTerm>, RemoteError> {
        (**self).get_terms(taxonomy)
    }

    fn new_term(&self, term: &TermPayload) -> Result<TermId, RemoteError> {
        (**self).new_term(term)
    }

    fn edit_term(&self, term_id: &TermId, term: &TermPayload) -> Result<(), RemoteError> {
        (**self).edit_term(term_id, term)
    }

    fn delete_term(&self, taxonomy: &str, term_id: &TermId) -> Result<(), RemoteError> {
        (**self).delete_term(taxonomy, term_id)
    }

    fn get_resources(&self) -> Result<ResourceManifest, RemoteError> {
        (**self).get_resources()
    }

    fn add_resource(&self, path: &str, content_base64: &str) -> Result<String, RemoteError> {
        (**self).add_resource(path, content_base64)
    }

    fn delete_resource(&self, path: &str) -> Result<(), RemoteError> {
        (**self).delete_resource(path)
    }
}
