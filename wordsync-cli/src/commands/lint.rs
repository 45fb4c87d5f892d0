//! `wordsync lint`: offline structural validation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use wordsync_core::{config, definitions::TAXONOMIES_FILE};
use wordsync_sync::validate;

use crate::GlobalArgs;

/// Arguments for `wordsync lint`.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Content root to check; defaults to the config's `dir`.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl LintArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let dir = match self.dir {
            Some(dir) => dir,
            None => {
                config::load(global.config.as_deref())
                    .context("failed to load config")?
                    .dir
            }
        };

        let path = dir.join(TAXONOMIES_FILE);
        let count = validate::validate_terms_at(&path)
            .with_context(|| format!("validation failed for {}", path.display()))?;
        println!("✓ {}", super::validated_message(count));
        Ok(())
    }
}
