//! Structural validation of local taxonomy definitions.
//!
//! Runs before any remote call. The first violation aborts with an error that
//! names the taxonomy and the offending term or slug.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use wordsync_core::{definitions, TaxonomyDefinitions, TermDefinition};

use crate::SyncError;

/// Slug grammar: alphanumeric runs, each optionally followed by one `.` or `-`.
pub const SLUG_PATTERN: &str = r"^([a-zA-Z0-9]+[.\-]?)+$";

/// A malformed local definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a {taxonomy} term has no name")]
    MissingName { taxonomy: String },

    /// Names must be unique across the whole taxonomy, not only among siblings.
    #[error("there are multiple {taxonomy} {name} terms")]
    DuplicateName { taxonomy: String, name: String },

    #[error("the {taxonomy} term {name} has no slug")]
    MissingSlug { taxonomy: String, name: String },

    #[error("invalid slug '{slug}' on {taxonomy} term {name}")]
    InvalidSlug {
        taxonomy: String,
        name: String,
        slug: String,
    },

    #[error("{taxonomy} terms {first} and {second} share the slug '{slug}' under the same parent")]
    DuplicateSlug {
        taxonomy: String,
        first: String,
        second: String,
        slug: String,
    },
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(SLUG_PATTERN).expect("slug pattern is a valid regex"))
}

/// Whether `slug` satisfies the slug grammar.
pub fn is_valid_slug(slug: &str) -> bool {
    slug_regex().is_match(slug)
}

/// Validate every taxonomy; returns the number of terms checked.
pub fn validate_definitions(definitions: &TaxonomyDefinitions) -> Result<usize, ValidationError> {
    let mut count = 0;
    for (taxonomy, terms) in definitions.iter() {
        let mut names = HashSet::new();
        validate_siblings(taxonomy, terms, &mut names, &mut count)?;
    }
    Ok(count)
}

fn validate_siblings<'a>(
    taxonomy: &str,
    terms: &'a [TermDefinition],
    names: &mut HashSet<&'a str>,
    count: &mut usize,
) -> Result<(), ValidationError> {
    let mut slugs: HashMap<&str, &str> = HashMap::new();

    for term in terms {
        if term.name.is_empty() {
            return Err(ValidationError::MissingName {
                taxonomy: taxonomy.to_owned(),
            });
        }
        if !names.insert(term.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                taxonomy: taxonomy.to_owned(),
                name: term.name.clone(),
            });
        }
        if term.slug.is_empty() {
            return Err(ValidationError::MissingSlug {
                taxonomy: taxonomy.to_owned(),
                name: term.name.clone(),
            });
        }
        if !is_valid_slug(&term.slug) {
            return Err(ValidationError::InvalidSlug {
                taxonomy: taxonomy.to_owned(),
                name: term.name.clone(),
                slug: term.slug.clone(),
            });
        }
        if let Some(first) = slugs.insert(term.slug.as_str(), term.name.as_str()) {
            return Err(ValidationError::DuplicateSlug {
                taxonomy: taxonomy.to_owned(),
                first: first.to_owned(),
                second: term.name.clone(),
                slug: term.slug.clone(),
            });
        }

        *count += 1;
        validate_siblings(taxonomy, &term.children, names, count)?;
    }
    Ok(())
}

/// Load and validate `taxonomies.json` at `path`. A missing file has zero terms.
pub fn validate_terms_at(path: &Path) -> Result<usize, SyncError> {
    let Some(definitions) = definitions::load_at(path)? else {
        tracing::debug!("no taxonomy definitions at {}", path.display());
        return Ok(0);
    };
    let count = validate_definitions(&definitions)?;
    tracing::info!("validated {count} term(s) in {}", path.display());
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
