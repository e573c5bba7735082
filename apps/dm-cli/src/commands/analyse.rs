// analyse.rs — Explain the verdict for a single pull request.
//
// Runs the same gates as `merge` in dry-run mode and prints every step,
// so a repository owner can see which gate blocked their pull request.

use std::sync::OnceLock;

use regex::Regex;

use dm_pipeline::{MergeDriver, MergerConfig};
use dm_remote::{GitHubClient, RubyGemsRegistry};

/// A pull request named by its GitHub URL.
#[derive(Debug, PartialEq, Eq)]
pub struct PullRequestRef {
    pub organisation: String,
    pub repo: String,
    pub number: u64,
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/pull/([0-9]+)/?(?:[#?].*)?$").expect("valid PR url regex")
    })
}

pub fn parse_pr_url(url: &str) -> anyhow::Result<PullRequestRef> {
    let Some(caps) = url_pattern().captures(url.trim()) else {
        anyhow::bail!(
            "expected a pull request URL like https://github.com/alphagov/content-data-api/pull/1996, got '{}'",
            url
        );
    };
    Ok(PullRequestRef {
        organisation: caps[1].to_string(),
        repo: caps[2].to_string(),
        number: caps[3].parse()?,
    })
}

pub fn execute(config: &MergerConfig, url: &str, json: bool) -> anyhow::Result<()> {
    let target = parse_pr_url(url)?;
    if target.organisation != config.organisation {
        anyhow::bail!(
            "{} belongs to '{}', but this merger is configured for '{}'",
            url,
            target.organisation,
            config.organisation
        );
    }

    let github = GitHubClient::from_env(config)?;
    let registry = RubyGemsRegistry::new(&config.registry_base)?;
    let driver = MergeDriver::new(&github, &registry, config).dry_run(true);

    if !json {
        println!("Analysing {}...", url);
    }
    let (pr, evaluation) = driver.analyse(&target.repo, target.number)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    println!("{} by {}: {}", pr.label(), pr.author, pr.title);
    if pr.author != config.bot_login {
        println!("Note: not authored by {}; `merge` would ignore it.", config.bot_login);
    }
    println!();
    for step in &evaluation.steps {
        println!("  {:<18} {}", step.check, step.outcome);
    }
    if let Some(change_set) = &evaluation.change_set {
        println!();
        println!("Changes:");
        for change in change_set {
            println!("  {}", change);
        }
    }
    println!();
    if evaluation.is_mergeable() {
        println!("PR is considered auto-mergeable.");
    } else {
        println!("PR is not considered auto-mergeable.");
        for reason in &evaluation.verdict.reasons {
            println!("  {}", reason);
        }
    }
    Ok(())
}
