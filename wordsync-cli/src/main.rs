//! wordsync: keep a WordPress site's taxonomy terms and resources in step
//! with a local content tree.
//!
//! # Usage
//!
//! ```text
//! wordsync lint [--dir <path>]
//! wordsync validate
//! wordsync sync [--dry-run] [--json]
//! wordsync publish [--dry-run] [--json]
//!
//! global: [--config <file>] [--target <name>] [-v | -vv]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{lint::LintArgs, publish::PublishArgs, sync::SyncArgs, validate::ValidateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wordsync",
    version,
    about = "Synchronize WordPress taxonomies and resources from a local content tree",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./wordsync.yaml, then ~/.wordsync.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named target from the config's `targets` table.
    #[arg(long, short, global = true)]
    pub target: Option<String>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check local taxonomy definitions without contacting WordPress.
    Lint(LintArgs),

    /// Check the remote extension version and validate local definitions.
    Validate(ValidateArgs),

    /// Reconcile terms, content, and resources against the remote site.
    Sync(SyncArgs),

    /// Validate, then sync.
    Publish(PublishArgs),
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Lint(args) => args.run(&cli.global),
        Commands::Validate(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Publish(args) => args.run(&cli.global),
    }
}
