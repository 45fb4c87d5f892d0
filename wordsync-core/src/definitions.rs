//! Loading the local taxonomy definitions document (`taxonomies.json`).

use std::path::Path;

use crate::error::DefinitionError;
use crate::types::TaxonomyDefinitions;

/// File name of the definitions document inside the content directory.
pub const TAXONOMIES_FILE: &str = "taxonomies.json";

/// Load definitions from `path`.
///
/// Returns `Ok(None)` when the file does not exist (no terms declared),
/// `DefinitionError::Parse` (with path) when it is not a valid definitions object.
pub fn load_at(path: &Path) -> Result<Option<TaxonomyDefinitions>, DefinitionError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let definitions = serde_json::from_str(&contents).map_err(|source| DefinitionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(definitions))
}
