//! # dependabot-merger
//!
//! Approves and merges dependabot pull requests that pass every
//! eligibility gate in the opted-in repositories.
//!
//! - `dependabot-merger merge` — run over every opted-in repository
//! - `dependabot-merger merge --dry-run` — report what would be merged
//! - `dependabot-merger analyse <url>` — explain the verdict for one PR

mod commands;
mod repos;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dm_pipeline::MergerConfig;
use tracing_subscriber::EnvFilter;

/// Auto-merge dependabot pull requests that pass policy.
#[derive(Parser)]
#[command(name = "dependabot-merger", version, about)]
struct Cli {
    /// Merger settings file (defaults apply when it does not exist).
    #[arg(long, default_value = "config/merger.toml")]
    config: PathBuf,

    /// YAML list of opted-in repository names.
    #[arg(long, default_value = "config/repos_opted_in.yml")]
    repos: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Approve and merge every eligible dependabot pull request.
    Merge {
        /// Evaluate only; never approve or merge.
        #[arg(long)]
        dry_run: bool,
    },
    /// Explain why one pull request is or is not auto-mergeable.
    Analyse {
        /// e.g. https://github.com/alphagov/content-data-api/pull/1996
        url: String,
        /// Print the full evaluation as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the progress report.
    let filter = EnvFilter::from_default_env()
        .add_directive("dm_pipeline=info".parse()?)
        .add_directive("dependabot_merger=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = MergerConfig::load_or_default(&cli.config)?;

    match &cli.command {
        Commands::Merge { dry_run } => commands::merge::execute(&config, &cli.repos, *dry_run),
        Commands::Analyse { url, json } => commands::analyse::execute(&config, url, *json),
    }
}
