//! `wordsync.yaml` loading and deployment-target resolution.
//!
//! # Layout
//!
//! ```text
//! dir: dist/wordpress
//! default_target: staging
//! url: http://localhost          # used when no target is selected
//! username: admin
//! password: secret
//! targets:
//!   staging:
//!     url: https://staging.example.com
//!     username: deploy
//!     password: hunter2
//! ```
//!
//! # API pattern
//!
//! Lookup functions have two forms, as elsewhere in the workspace:
//! - `fn_at(cwd: &Path, home: &Path, …)`: explicit roots; used in tests
//! - `fn(…)`: derives `cwd`/`home` from the process, delegates to `_at`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::definitions::TAXONOMIES_FILE;
use crate::error::ConfigError;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE: &str = "wordsync.yaml";
/// Fallback config file name in the home directory.
pub const HOME_CONFIG_FILE: &str = ".wordsync.yaml";

pub const DEFAULT_BLOG_ID: u32 = 0;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

/// Connection fields, shared by the top level and each named target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Connection {
    /// Fields set on `self` win; unset ones fall back to `base`.
    fn over(&self, base: &Connection) -> Connection {
        Connection {
            url: self.url.clone().or_else(|| base.url.clone()),
            username: self.username.clone().or_else(|| base.username.clone()),
            password: self.password.clone().or_else(|| base.password.clone()),
            blog_id: self.blog_id.or(base.blog_id),
            timeout_secs: self.timeout_secs.or(base.timeout_secs),
        }
    }
}

/// Root of `wordsync.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Content root holding `taxonomies.json`, `posts/`, and `resources/`.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
    #[serde(flatten)]
    pub connection: Connection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, Connection>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

// ---------------------------------------------------------------------------
// Resolved shape
// ---------------------------------------------------------------------------

/// Fully resolved settings for one run against one remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Selected target name, if any.
    pub target: Option<String>,
    pub url: String,
    pub username: String,
    pub password: String,
    pub blog_id: u32,
    pub timeout: Duration,
    pub dir: PathBuf,
}

impl SiteConfig {
    pub fn taxonomies_path(&self) -> PathBuf {
        self.dir.join(TAXONOMIES_FILE)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.dir.join("posts")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.dir.join("resources")
    }

    /// Human label for log lines: the target name or the url.
    pub fn label(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.url)
    }
}

impl Config {
    /// Resolve connection settings for `target`, falling back to
    /// `default_target`, then to the top-level fields.
    pub fn resolve(&self, target: Option<&str>) -> Result<SiteConfig, ConfigError> {
        let selected = target.or(self.default_target.as_deref());

        let (connection, scope) = match selected {
            Some(name) => {
                let Some(entry) = self.targets.get(name) else {
                    let known = if self.targets.is_empty() {
                        "(none)".to_string()
                    } else {
                        self.targets.keys().cloned().collect::<Vec<_>>().join(", ")
                    };
                    return Err(ConfigError::UnknownTarget {
                        target: name.to_string(),
                        known,
                    });
                };
                (entry.over(&self.connection), format!("target '{name}'"))
            }
            None => (self.connection.clone(), "top-level config".to_string()),
        };

        let require = |value: Option<String>, field: &'static str| {
            value.ok_or_else(|| ConfigError::MissingField {
                field,
                scope: scope.clone(),
            })
        };

        Ok(SiteConfig {
            target: selected.map(str::to_owned),
            url: require(connection.url, "url")?,
            username: require(connection.username, "username")?,
            password: require(connection.password, "password")?,
            blog_id: connection.blog_id.unwrap_or(DEFAULT_BLOG_ID),
            timeout: connection
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            dir: self.dir.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load a config file from `path`.
///
/// A relative `dir` is resolved against the directory holding the file.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: Config =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if config.dir.is_relative() {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.dir = base.join(&config.dir);
    }
    Ok(config)
}

/// Find the config file: `<cwd>/wordsync.yaml`, then `<home>/.wordsync.yaml`.
pub fn locate_at(cwd: &Path, home: &Path) -> Result<PathBuf, ConfigError> {
    let searched = vec![cwd.join(CONFIG_FILE), home.join(HOME_CONFIG_FILE)];
    match searched.iter().find(|p| p.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(ConfigError::ConfigNotFound { searched }),
    }
}

/// `locate_at` convenience wrapper.
pub fn locate() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    locate_at(&cwd, &home()?)
}

/// Load `explicit` if given, otherwise locate and load the default file.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => load_at(path),
        None => load_at(&locate()?),
    }
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
