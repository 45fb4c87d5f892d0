//! `wordsync publish`: validate, then sync, against one client.

use anyhow::Result;
use clap::Args;

use wordsync_sync::{run_validate, NoContent};

use super::sync::SyncArgs;
use crate::GlobalArgs;

/// Arguments for `wordsync publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub sync: SyncArgs,
}

impl PublishArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let site = super::load_site(global)?;
        let client = super::connect(&site);

        let report = run_validate(&client, &site, &mut NoContent)
            .map_err(|e| anyhow::Error::new(e).context(format!("validation of '{}' failed", site.label())))?;
        if !self.sync.json {
            super::validate::print_report(site.label(), &report);
        }

        self.sync.sync_with(&client, &site)
    }
}
