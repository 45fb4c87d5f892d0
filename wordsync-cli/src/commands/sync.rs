//! `wordsync sync`: reconcile the remote site with the local content tree.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use wordsync_core::SiteConfig;
use wordsync_rpc::XmlRpcClient;
use wordsync_sync::{run_sync, NoContent, ResourceChange, SyncOptions, SyncReport, TermChange};

use crate::GlobalArgs;

/// Arguments for `wordsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would change without issuing any mutating call.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let site = super::load_site(global)?;
        let client = super::connect(&site);
        self.sync_with(&client, &site)
    }

    pub(crate) fn sync_with(&self, client: &XmlRpcClient, site: &SiteConfig) -> Result<()> {
        let options = SyncOptions {
            dry_run: self.dry_run,
        };
        let report = run_sync(client, site, &mut NoContent, options)
            .map_err(|e| super::explain_sync(e, "sync"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "path")]
    path: String,
}

fn colorize(action: &'static str) -> String {
    match action {
        "created" | "published" => action.green().to_string(),
        "updated" => action.yellow().to_string(),
        "deleted" => action.red().to_string(),
        "unchanged" => action.bright_black().to_string(),
        planned => planned.cyan().to_string(),
    }
}

fn term_row(change: &TermChange) -> ChangeRow {
    ChangeRow {
        kind: "term",
        action: colorize(change.action()),
        path: format!("{}:{}", change.taxonomy(), change.path()),
    }
}

fn resource_row(change: &ResourceChange) -> ChangeRow {
    ChangeRow {
        kind: "resource",
        action: colorize(change.action()),
        path: change.path().to_string(),
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    if report.is_noop() {
        println!("{prefix}✓ '{}' is up to date", report.target);
        return;
    }

    let rows: Vec<ChangeRow> = report
        .terms
        .iter()
        .filter(|c| c.is_mutation())
        .map(term_row)
        .chain(
            report
                .resources
                .iter()
                .filter(|c| c.is_mutation())
                .map(resource_row),
        )
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let unchanged = report.terms.len() + report.resources.len() - report.mutations();
    let elapsed = report.finished_at - report.started_at;
    println!(
        "{prefix}✓ '{}' synced ({} changed, {} unchanged) in {}.{:03}s",
        report.target,
        report.mutations(),
        unchanged,
        elapsed.num_seconds(),
        elapsed.num_milliseconds() % 1000
    );
}
