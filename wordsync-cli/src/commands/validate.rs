//! `wordsync validate`: remote version check plus local validation.

use anyhow::Result;
use clap::Args;

use wordsync_sync::{run_validate, NoContent, ValidateReport};

use crate::GlobalArgs;

/// Arguments for `wordsync validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let site = super::load_site(global)?;
        let client = super::connect(&site);
        let report = run_validate(&client, &site, &mut NoContent)
            .map_err(|e| anyhow::Error::new(e).context(format!("validation of '{}' failed", site.label())))?;
        print_report(site.label(), &report);
        Ok(())
    }
}

pub(crate) fn print_report(label: &str, report: &ValidateReport) {
    println!(
        "✓ '{label}' extension v{} | {}",
        report.remote_version,
        super::validated_message(report.terms)
    );
}
