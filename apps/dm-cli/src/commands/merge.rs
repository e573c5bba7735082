// merge.rs — Approve and merge eligible pull requests across repositories.

use std::path::Path;

use anyhow::Context;
use chrono::Local;

use dm_pipeline::{MergeDriver, MergeOutcome, MergerConfig, PullRequestReport};
use dm_remote::{BankHolidays, GitHubClient, RubyGemsRegistry};

use crate::repos;

pub fn execute(config: &MergerConfig, repos_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let repos = repos::load(repos_path)?;
    let github = GitHubClient::from_env(config)?;

    if !dry_run && is_bank_holiday(config)? {
        println!("Today is a bank holiday. Skipping auto-merge.");
        return Ok(());
    }

    let registry = RubyGemsRegistry::new(&config.registry_base)?;
    let driver = MergeDriver::new(&github, &registry, config).dry_run(dry_run);

    tracing::info!(repos = repos.len(), dry_run, "starting merge run");
    let summary = driver.run(&repos, print_report);

    for (repo, err) in &summary.failed_repos {
        println!("Could not list pull requests for {}: {}", repo, err);
    }
    println!(
        "{} pull request(s) inspected, {} {}.",
        summary.reports.len(),
        summary.merged(),
        if dry_run { "would be merged" } else { "merged" }
    );

    let failures = summary.failures();
    if failures > 0 {
        anyhow::bail!("{} pull request(s) or repositories could not be processed", failures);
    }
    Ok(())
}

fn is_bank_holiday(config: &MergerConfig) -> anyhow::Result<bool> {
    let holidays = BankHolidays::fetch(&config.bank_holidays_url).context("cannot fetch bank holidays")?;
    let today = Local::now().date_naive();
    Ok(holidays.contains(&config.bank_holiday_region, today)?)
}

fn print_report(report: &PullRequestReport) {
    println!("Inspecting {}...", report.pull_request.label());
    match &report.outcome {
        MergeOutcome::Merged => {
            println!("...approved.");
            println!("...merged.");
        }
        MergeOutcome::WouldMerge => println!("...auto-mergeable (dry run, not merging)."),
        MergeOutcome::Skipped(verdict) => {
            for reason in &verdict.reasons {
                println!("  Not auto-mergeable: {}", reason);
            }
            println!("...skipping.");
        }
        MergeOutcome::ApprovalFailed(e) => println!("...approval failed, not merging: {}", e),
        MergeOutcome::MergeFailed(e) => {
            println!("...approved.");
            println!("...merge failed: {}", e);
        }
        MergeOutcome::EvaluationFailed(e) => println!("...could not be evaluated: {}", e),
    }
}
