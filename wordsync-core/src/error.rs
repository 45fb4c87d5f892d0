//! Error types for wordsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or resolving `wordsync.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No config file in the working directory or the home directory.
    #[error("config not found; looked in {}", searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ConfigNotFound { searched: Vec<PathBuf> },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// `--target` or `default_target` names a target that is not configured.
    #[error("unknown target '{target}'; known targets: {known}")]
    UnknownTarget { target: String, known: String },

    /// A required connection field is absent after target resolution.
    #[error("missing `{field}` for {scope}")]
    MissingField { field: &'static str, scope: String },
}

/// Errors from reading the local taxonomy definitions document.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document exists but is not a valid definitions object.
    #[error("invalid taxonomy definitions file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
