//! wordsync core library: domain types, local definitions, configuration,
//! and the remote store seam.
//!
//! - [`types`]: term, taxonomy, and resource records (local and remote)
//! - [`definitions`]: `taxonomies.json` loading
//! - [`config`]: `wordsync.yaml` loading and target resolution
//! - [`remote`]: the [`ContentStore`] trait and [`RemoteError`]
//! - [`error`]: [`ConfigError`], [`DefinitionError`]

pub mod config;
pub mod definitions;
pub mod error;
pub mod remote;
pub mod types;

pub use config::{Config, SiteConfig};
pub use error::{ConfigError, DefinitionError};
pub use remote::{ContentStore, RemoteError};
pub use types::{
    RemoteTaxonomy, RemoteTerm, ResourceManifest, TaxonomyDefinitions, TermDefinition, TermId,
    TermPayload,
};
