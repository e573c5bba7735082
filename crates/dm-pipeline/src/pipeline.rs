// pipeline.rs — Ordered, short-circuiting eligibility gates.
//
// Gates run strictly in this order; the first failure decides the verdict
// and nothing after it is fetched:
//
// 1. single_commit      — exactly one commit on the pull request
// 2. changed_files      — every touched file matches `allowed_files`
// 3. ci_discovery       — a run of the CI workflow exists for the head SHA
// 4. ci_outcome         — every job of that run completed green
// 5. policy_file        — the repository's policy file loads
// 6. policy_compliance  — every parsed change is allowed by its policy
//
// The pipeline holds no state between evaluations. Each call re-fetches
// everything and builds a fresh ownership classifier, so evaluating the
// same pull request twice gives the same verdict.

use dm_changes::ChangeSet;
use dm_policy::{ConfigState, OwnerRegistry, PolicyResolver, RegistryOwnership, RemoteConfig};

use crate::api::{CiJob, HeadCommit, PullRequest, PullRequestApi};
use crate::config::MergerConfig;
use crate::error::{PipelineError, Result};
use crate::verdict::{Blocker, Evaluation, GateStep, Verdict};

pub const GATE_SINGLE_COMMIT: &str = "single_commit";
pub const GATE_CHANGED_FILES: &str = "changed_files";
pub const GATE_CI_DISCOVERY: &str = "ci_discovery";
pub const GATE_CI_OUTCOME: &str = "ci_outcome";
pub const GATE_POLICY_FILE: &str = "policy_file";
pub const GATE_POLICY_COMPLIANCE: &str = "policy_compliance";

/// Accumulates gate steps for one evaluation.
struct Trace<'p> {
    pr: &'p PullRequest,
    steps: Vec<GateStep>,
    change_set: Option<ChangeSet>,
}

impl<'p> Trace<'p> {
    fn new(pr: &'p PullRequest) -> Self {
        Self {
            pr,
            steps: Vec::with_capacity(6),
            change_set: None,
        }
    }

    fn pass(&mut self, gate: &'static str) {
        tracing::debug!(repo = %self.pr.repo, pr = self.pr.number, gate, "gate passed");
        self.steps.push(GateStep {
            check: gate.to_string(),
            outcome: "passed".to_string(),
            terminal: false,
        });
    }

    fn block(mut self, gate: &'static str, blocker: Blocker) -> Evaluation {
        let verdict = Verdict::blocked(&blocker);
        tracing::info!(
            repo = %self.pr.repo,
            pr = self.pr.number,
            gate,
            reason = %blocker,
            "not auto-mergeable"
        );
        self.steps.push(GateStep {
            check: gate.to_string(),
            outcome: format!("failed: {}", blocker),
            terminal: true,
        });
        Evaluation {
            verdict,
            change_set: self.change_set,
            steps: self.steps,
        }
    }

    fn mergeable(mut self, gate: &'static str) -> Evaluation {
        tracing::info!(repo = %self.pr.repo, pr = self.pr.number, "auto-mergeable");
        self.steps.push(GateStep {
            check: gate.to_string(),
            outcome: "passed".to_string(),
            terminal: true,
        });
        Evaluation {
            verdict: Verdict::mergeable(),
            change_set: self.change_set,
            steps: self.steps,
        }
    }
}

/// Decides whether a dependabot pull request may be merged without review.
pub struct EligibilityPipeline<'a> {
    api: &'a dyn PullRequestApi,
    registry: &'a dyn OwnerRegistry,
    config: &'a MergerConfig,
}

impl<'a> EligibilityPipeline<'a> {
    pub fn new(api: &'a dyn PullRequestApi, registry: &'a dyn OwnerRegistry, config: &'a MergerConfig) -> Self {
        Self { api, registry, config }
    }

    /// Run every gate against `pr` and return the verdict with its trace.
    ///
    /// A collaborator failure aborts the evaluation with
    /// `PipelineError::Api`; it is never turned into a verdict.
    pub fn evaluate(&self, pr: &PullRequest) -> Result<Evaluation> {
        let repo = pr.repo.as_str();
        let mut trace = Trace::new(pr);

        let commits = self
            .api
            .pull_request_commits(repo, pr.number)
            .map_err(PipelineError::api("fetch pull request commits"))?;
        if commits.len() != 1 {
            return Ok(trace.block(GATE_SINGLE_COMMIT, Blocker::MultipleCommits));
        }
        trace.pass(GATE_SINGLE_COMMIT);

        let head = self
            .api
            .commit(repo, &pr.head_sha)
            .map_err(PipelineError::api("fetch head commit"))?;
        if !self.only_allowed_files(&head) {
            return Ok(trace.block(GATE_CHANGED_FILES, Blocker::UnexpectedFiles));
        }
        trace.pass(GATE_CHANGED_FILES);

        let run_id = self
            .api
            .ci_workflow_run(repo, &pr.head_sha, &self.config.ci_workflow)
            .map_err(PipelineError::api("find CI workflow run"))?;
        let Some(run_id) = run_id else {
            return Ok(trace.block(GATE_CI_DISCOVERY, Blocker::CiMissing));
        };
        trace.pass(GATE_CI_DISCOVERY);

        let jobs = self
            .api
            .ci_jobs(repo, run_id)
            .map_err(PipelineError::api("fetch CI jobs"))?;
        // A run with no jobs yet is still queued.
        if jobs.is_empty() || !jobs.iter().all(CiJob::is_green) {
            return Ok(trace.block(GATE_CI_OUTCOME, Blocker::CiFailing));
        }
        trace.pass(GATE_CI_OUTCOME);

        let raw = self
            .api
            .policy_file(repo, &self.config.policy_file)
            .map_err(PipelineError::api("fetch policy file"))?;
        let policy = match self.load_policy(raw.as_deref()) {
            Ok(policy) => policy,
            Err(blocker) => return Ok(trace.block(GATE_POLICY_FILE, blocker)),
        };
        trace.pass(GATE_POLICY_FILE);

        let lockfile_patch = head.patch_for(&self.config.lockfile);
        let change_set = match dm_changes::parse(&head.message, lockfile_patch) {
            Ok(change_set) => change_set,
            Err(e) => return Ok(trace.block(GATE_POLICY_COMPLIANCE, Blocker::MalformedCommit(e))),
        };
        trace.change_set = Some(change_set.clone());
        if change_set.is_empty() {
            return Ok(trace.block(GATE_POLICY_COMPLIANCE, Blocker::NoDependencies));
        }

        let ownership = RegistryOwnership::new(self.registry, self.config.owner_handle.as_str());
        let resolver = PolicyResolver::new(&policy, &ownership);
        for change in &change_set {
            let checked = resolver.check(change);
            if !checked.allowed {
                if !checked.policy.auto_merge {
                    if let Some(e) = ownership.lookup_failure(change.dependency.name()) {
                        return Ok(trace.block(GATE_POLICY_COMPLIANCE, Blocker::OwnershipUnverified(e)));
                    }
                }
                return Ok(trace.block(
                    GATE_POLICY_COMPLIANCE,
                    Blocker::ChangeNotAllowed {
                        change: checked.change,
                        policy: checked.policy,
                    },
                ));
            }
        }

        Ok(trace.mergeable(GATE_POLICY_COMPLIANCE))
    }

    fn only_allowed_files(&self, head: &HeadCommit) -> bool {
        !head.files.is_empty() && head.files.iter().all(|f| self.config.file_allowed(&f.filename))
    }

    fn load_policy(&self, raw: Option<&str>) -> std::result::Result<RemoteConfig, Blocker> {
        let path = self.config.policy_file.clone();
        match ConfigState::from_fetch(raw) {
            ConfigState::Loaded(config) => Ok(config),
            ConfigState::NotFound => Err(Blocker::PolicyFileMissing { path }),
            ConfigState::Invalid { detail } => {
                tracing::debug!(detail = %detail, "policy file rejected");
                Err(Blocker::PolicyFileInvalid { path })
            }
            ConfigState::UnsupportedVersion { found } => {
                tracing::debug!(?found, "policy file api_version rejected");
                Err(Blocker::PolicyFileUnsupported { path })
            }
        }
    }
}
