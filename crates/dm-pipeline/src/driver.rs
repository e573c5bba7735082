// driver.rs — Walk opted-in repositories and act on verdicts.
//
// For each repository: list open pull requests oldest first, keep the ones
// the bot authored, evaluate each, and for mergeable ones approve and then
// merge. Approval must succeed before merge is attempted; neither call is
// retried. A failure on one pull request (or one repository) is reported
// and the walk carries on.

use crate::api::{PullRequest, PullRequestApi};
use crate::config::MergerConfig;
use crate::error::{ApiError, PipelineError};
use crate::pipeline::EligibilityPipeline;
use crate::verdict::{Evaluation, Verdict};

use dm_policy::OwnerRegistry;

/// What happened to one pull request.
#[derive(Debug)]
pub enum MergeOutcome {
    /// Approved and merged.
    Merged,
    /// Mergeable, but this is a dry run.
    WouldMerge,
    /// A gate blocked it.
    Skipped(Verdict),
    /// Approval was rejected; merge was not attempted.
    ApprovalFailed(ApiError),
    /// Approved, but the merge call failed.
    MergeFailed(ApiError),
    /// Evidence for a gate could not be fetched.
    EvaluationFailed(PipelineError),
}

impl MergeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ApprovalFailed(_) | Self::MergeFailed(_) | Self::EvaluationFailed(_)
        )
    }
}

/// Outcome for one pull request, with the pull request it applies to.
#[derive(Debug)]
pub struct PullRequestReport {
    pub pull_request: PullRequest,
    pub outcome: MergeOutcome,
}

/// Everything one run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<PullRequestReport>,
    /// Repositories whose pull requests could not be listed.
    pub failed_repos: Vec<(String, ApiError)>,
}

impl RunSummary {
    pub fn merged(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, MergeOutcome::Merged | MergeOutcome::WouldMerge))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failure()).count() + self.failed_repos.len()
    }
}

pub struct MergeDriver<'a> {
    api: &'a dyn PullRequestApi,
    pipeline: EligibilityPipeline<'a>,
    config: &'a MergerConfig,
    dry_run: bool,
}

impl<'a> MergeDriver<'a> {
    pub fn new(api: &'a dyn PullRequestApi, registry: &'a dyn OwnerRegistry, config: &'a MergerConfig) -> Self {
        Self {
            api,
            pipeline: EligibilityPipeline::new(api, registry, config),
            config,
            dry_run: false,
        }
    }

    /// Evaluate only; never approve or merge.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process every repository in `repos`, calling `on_report` as soon as
    /// each pull request is decided.
    pub fn run(&self, repos: &[String], mut on_report: impl FnMut(&PullRequestReport)) -> RunSummary {
        let mut summary = RunSummary::default();
        for repo in repos {
            let pull_requests = match self.bot_pull_requests(repo) {
                Ok(prs) => prs,
                Err(e) => {
                    tracing::warn!(repo = %repo, error = %e, "cannot list pull requests; skipping repository");
                    summary.failed_repos.push((repo.clone(), e));
                    continue;
                }
            };
            tracing::info!(repo = %repo, count = pull_requests.len(), "inspecting dependabot pull requests");
            for pr in pull_requests {
                let report = PullRequestReport {
                    outcome: self.process(&pr),
                    pull_request: pr,
                };
                on_report(&report);
                summary.reports.push(report);
            }
        }
        summary
    }

    /// Open pull requests of `repo` authored by the bot, oldest first.
    pub fn bot_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        let mut prs: Vec<PullRequest> = self
            .api
            .open_pull_requests(repo)?
            .into_iter()
            .filter(|pr| pr.author == self.config.bot_login)
            .collect();
        prs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.number.cmp(&b.number)));
        Ok(prs)
    }

    /// Evaluate one pull request and act on the verdict.
    pub fn process(&self, pr: &PullRequest) -> MergeOutcome {
        let evaluation = match self.pipeline.evaluate(pr) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!(repo = %pr.repo, pr = pr.number, error = %e, "evaluation failed");
                return MergeOutcome::EvaluationFailed(e);
            }
        };
        if !evaluation.is_mergeable() {
            return MergeOutcome::Skipped(evaluation.verdict);
        }
        if self.dry_run {
            return MergeOutcome::WouldMerge;
        }

        if let Err(e) = self.api.approve(&pr.repo, pr.number, &self.config.approval_message) {
            tracing::warn!(repo = %pr.repo, pr = pr.number, error = %e, "approval failed; not merging");
            return MergeOutcome::ApprovalFailed(e);
        }
        tracing::info!(repo = %pr.repo, pr = pr.number, "approved");

        match self.api.merge(&pr.repo, pr.number) {
            Ok(()) => {
                tracing::info!(repo = %pr.repo, pr = pr.number, "merged");
                MergeOutcome::Merged
            }
            Err(e) => {
                tracing::warn!(repo = %pr.repo, pr = pr.number, error = %e, "merge failed");
                MergeOutcome::MergeFailed(e)
            }
        }
    }

    /// Fetch and evaluate a single pull request without acting on it.
    pub fn analyse(&self, repo: &str, number: u64) -> Result<(PullRequest, Evaluation), PipelineError> {
        let pr = self
            .api
            .pull_request(repo, number)
            .map_err(PipelineError::api("fetch pull request"))?;
        let evaluation = self.pipeline.evaluate(&pr)?;
        Ok((pr, evaluation))
    }
}
