// end_to_end.rs — Full pipeline runs against an in-memory pull request host.
//
// Each test starts from a pull request that passes every gate:
//
//   - one commit, touching only Gemfile.lock
//   - a "CI" workflow run whose jobs all succeeded
//   - a valid policy file allowing patch and minor bumps
//   - a commit message bumping one internal dependency by a minor version
//
// and then breaks exactly one thing, checking that the verdict names that
// thing and that later gates were never consulted.

use std::collections::HashSet;
use std::sync::Mutex;

use dm_changes::{BumpKind, Change};
use dm_pipeline::{
    ApiError, ChangedFile, CiJob, CommitSummary, EligibilityPipeline, HeadCommit, MergeDriver, MergeOutcome,
    MergerConfig, PipelineError, PullRequest, PullRequestApi,
};
use dm_policy::{OwnerRegistry, PolicyError};

const POLICY: &str = "\
api_version: 0
defaults:
  auto_merge: true
  update_external_dependencies: false
  allowed_semver_bumps: [patch, minor]
";

const MINOR_BUMP: &str = "\
Bump govuk_publishing_components from 35.1.0 to 35.2.0

Bumps [govuk_publishing_components](https://github.com/alphagov/govuk_publishing_components) from 35.1.0 to 35.2.0.

---
updated-dependencies:
- dependency-name: govuk_publishing_components
  dependency-type: direct:production
  update-type: version-update:semver-minor
...

Signed-off-by: dependabot[bot] <support@github.com>
";

struct FakeHost {
    commit_count: usize,
    files: Vec<ChangedFile>,
    message: String,
    run_id: Option<u64>,
    jobs: Vec<CiJob>,
    policy: Option<String>,
    jobs_error: bool,
    fetched: Mutex<Vec<&'static str>>,
    actions: Mutex<Vec<&'static str>>,
}

impl FakeHost {
    fn green() -> Self {
        Self {
            commit_count: 1,
            files: vec![lockfile(None)],
            message: MINOR_BUMP.to_string(),
            run_id: Some(101),
            jobs: vec![job("test", "completed", Some("success")), job("lint", "completed", Some("skipped"))],
            policy: Some(POLICY.to_string()),
            jobs_error: false,
            fetched: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &'static str) {
        self.fetched.lock().unwrap().push(call);
    }

    fn fetched(&self) -> Vec<&'static str> {
        self.fetched.lock().unwrap().clone()
    }

    fn actions(&self) -> Vec<&'static str> {
        self.actions.lock().unwrap().clone()
    }
}

impl PullRequestApi for FakeHost {
    fn open_pull_requests(&self, _repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        Ok(vec![pull_request()])
    }

    fn pull_request(&self, _repo: &str, _number: u64) -> Result<PullRequest, ApiError> {
        Ok(pull_request())
    }

    fn pull_request_commits(&self, _repo: &str, _number: u64) -> Result<Vec<CommitSummary>, ApiError> {
        self.record("commits");
        Ok((0..self.commit_count)
            .map(|i| CommitSummary { sha: format!("sha{}", i) })
            .collect())
    }

    fn commit(&self, _repo: &str, _sha: &str) -> Result<HeadCommit, ApiError> {
        self.record("commit");
        Ok(HeadCommit {
            message: self.message.clone(),
            files: self.files.clone(),
        })
    }

    fn ci_workflow_run(&self, _repo: &str, _sha: &str, workflow: &str) -> Result<Option<u64>, ApiError> {
        self.record("workflow_run");
        Ok(if workflow == "CI" { self.run_id } else { None })
    }

    fn ci_jobs(&self, _repo: &str, _run_id: u64) -> Result<Vec<CiJob>, ApiError> {
        self.record("jobs");
        if self.jobs_error {
            return Err(ApiError::new(Some(502), "Bad Gateway"));
        }
        Ok(self.jobs.clone())
    }

    fn policy_file(&self, _repo: &str, _path: &str) -> Result<Option<String>, ApiError> {
        self.record("policy_file");
        Ok(self.policy.clone())
    }

    fn approve(&self, _repo: &str, _number: u64, _message: &str) -> Result<(), ApiError> {
        self.actions.lock().unwrap().push("approve");
        Err(ApiError::new(Some(422), "Unprocessable Entity"))
    }

    fn merge(&self, _repo: &str, _number: u64) -> Result<(), ApiError> {
        self.actions.lock().unwrap().push("merge");
        Ok(())
    }
}

struct FakeRegistry {
    internal: HashSet<&'static str>,
}

impl FakeRegistry {
    fn with_internal(names: &[&'static str]) -> Self {
        Self {
            internal: names.iter().copied().collect(),
        }
    }
}

impl OwnerRegistry for FakeRegistry {
    fn package_owners(&self, package: &str) -> Result<Option<Vec<String>>, PolicyError> {
        if self.internal.contains(package) {
            Ok(Some(vec!["govuk".to_string()]))
        } else {
            Ok(Some(vec!["someone-else".to_string()]))
        }
    }
}

fn pull_request() -> PullRequest {
    PullRequest {
        repo: "collections".to_string(),
        number: 3012,
        title: "Bump govuk_publishing_components from 35.1.0 to 35.2.0".to_string(),
        author: "dependabot[bot]".to_string(),
        head_sha: "f4c3b00c".to_string(),
        created_at: "2024-05-01T09:00:00Z".to_string(),
    }
}

fn lockfile(patch: Option<&str>) -> ChangedFile {
    ChangedFile {
        filename: "Gemfile.lock".to_string(),
        patch: patch.map(str::to_string),
    }
}

fn job(name: &str, status: &str, conclusion: Option<&str>) -> CiJob {
    CiJob {
        name: name.to_string(),
        status: status.to_string(),
        conclusion: conclusion.map(str::to_string),
    }
}

fn reasons(host: &FakeHost, registry: &FakeRegistry) -> Vec<String> {
    let config = MergerConfig::default();
    EligibilityPipeline::new(host, registry, &config)
        .evaluate(&pull_request())
        .unwrap()
        .verdict
        .reasons
}

#[test]
fn green_pull_request_is_mergeable() {
    let host = FakeHost::green();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let evaluation = EligibilityPipeline::new(&host, &registry, &config)
        .evaluate(&pull_request())
        .unwrap();

    assert!(evaluation.verdict.mergeable);
    assert!(evaluation.verdict.reasons.is_empty());
    assert_eq!(
        evaluation.change_set.unwrap().changes(),
        &[Change::new("govuk_publishing_components", BumpKind::Minor)]
    );
    let checks: Vec<&str> = evaluation.steps.iter().map(|s| s.check.as_str()).collect();
    assert_eq!(
        checks,
        vec!["single_commit", "changed_files", "ci_discovery", "ci_outcome", "policy_file", "policy_compliance"]
    );
    assert!(evaluation.steps.last().unwrap().terminal);
    assert!(evaluation.steps[..5].iter().all(|s| !s.terminal && s.outcome == "passed"));
}

#[test]
fn evaluation_is_repeatable() {
    let host = FakeHost::green();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let pipeline = EligibilityPipeline::new(&host, &registry, &config);
    let first = pipeline.evaluate(&pull_request()).unwrap();
    let second = pipeline.evaluate(&pull_request()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn pending_ci_job_is_failing() {
    let mut host = FakeHost::green();
    host.jobs[0] = job("test", "in_progress", None);
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(reasons(&host, &registry), vec!["CI workflow is failing.".to_string()]);
    assert!(!host.fetched().contains(&"policy_file"));
}

#[test]
fn workflow_run_without_jobs_is_failing() {
    let mut host = FakeHost::green();
    host.jobs.clear();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(reasons(&host, &registry), vec!["CI workflow is failing.".to_string()]);
}

#[test]
fn failed_ci_job_is_failing() {
    let mut host = FakeHost::green();
    host.jobs.push(job("integration", "completed", Some("failure")));
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(reasons(&host, &registry), vec!["CI workflow is failing.".to_string()]);
}

#[test]
fn missing_workflow_run() {
    let mut host = FakeHost::green();
    host.run_id = None;
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(reasons(&host, &registry), vec!["CI workflow doesn't exist.".to_string()]);
    assert!(!host.fetched().contains(&"jobs"));
}

#[test]
fn more_than_one_commit_stops_at_first_gate() {
    let mut host = FakeHost::green();
    host.commit_count = 2;
    host.run_id = None;
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(reasons(&host, &registry), vec!["PR contains more than one commit.".to_string()]);
    assert_eq!(host.fetched(), vec!["commits"]);
}

#[test]
fn files_outside_allow_list_are_blocked() {
    let mut host = FakeHost::green();
    host.files.push(ChangedFile {
        filename: "Gemfile".to_string(),
        patch: None,
    });
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(
        reasons(&host, &registry),
        vec!["PR changes files that should not be changed.".to_string()]
    );
}

#[test]
fn commit_without_files_is_blocked() {
    let mut host = FakeHost::green();
    host.files.clear();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(
        reasons(&host, &registry),
        vec!["PR changes files that should not be changed.".to_string()]
    );
}

#[test]
fn extra_allowed_files_are_configurable() {
    let mut host = FakeHost::green();
    host.files.push(ChangedFile {
        filename: "Gemfile".to_string(),
        patch: None,
    });
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig {
        allowed_files: vec!["Gemfile".to_string(), "Gemfile.lock".to_string()],
        ..MergerConfig::default()
    };
    let evaluation = EligibilityPipeline::new(&host, &registry, &config)
        .evaluate(&pull_request())
        .unwrap();
    assert!(evaluation.verdict.mergeable);
}

#[test]
fn policy_file_states_have_distinct_reasons() {
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let cases = [
        (None, "The remote .govuk_dependabot_merger.yml file is missing."),
        (Some("api_version: 0\ndefaults: [oops\n"), "The remote .govuk_dependabot_merger.yml file has invalid syntax."),
        (Some("api_version: 1\n"), "The remote .govuk_dependabot_merger.yml file uses an unsupported api_version."),
    ];
    for (policy, expected) in cases {
        let mut host = FakeHost::green();
        host.policy = policy.map(str::to_string);
        assert_eq!(reasons(&host, &registry), vec![expected.to_string()]);
    }
}

#[test]
fn external_dependency_blocked_by_default_policy() {
    let mut host = FakeHost::green();
    host.message = MINOR_BUMP.replace("version-update:semver-minor", "version-update:semver-patch");
    let registry = FakeRegistry::with_internal(&[]);
    assert_eq!(
        reasons(&host, &registry),
        vec!["PR bumps govuk_publishing_components by a patch version, which is not allowed by its policy (auto_merge: false, allowed_semver_bumps: [])."
            .to_string()]
    );
}

#[test]
fn major_bump_of_internal_dependency_is_blocked() {
    let mut host = FakeHost::green();
    host.message = MINOR_BUMP.replace("version-update:semver-minor", "version-update:semver-major");
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(
        reasons(&host, &registry),
        vec!["PR bumps govuk_publishing_components by a major version, which is not allowed by its policy (auto_merge: true, allowed_semver_bumps: [patch, minor])."
            .to_string()]
    );
}

#[test]
fn malformed_commit_message_is_blocked() {
    let mut host = FakeHost::green();
    host.message = "Bump govuk_publishing_components from 35.1.0 to 35.2.0".to_string();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let reasons = reasons(&host, &registry);
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].starts_with("PR commit message is not in the expected format: "));
}

#[test]
fn bump_recovered_from_lockfile_when_update_type_absent() {
    let mut host = FakeHost::green();
    host.message = MINOR_BUMP.replace("  update-type: version-update:semver-minor\n", "");
    host.files = vec![lockfile(Some(
        "@@ -120,7 +120,7 @@\n-    govuk_publishing_components (35.1.0)\n+    govuk_publishing_components (36.0.0)\n",
    ))];
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let evaluation = EligibilityPipeline::new(&host, &registry, &config)
        .evaluate(&pull_request())
        .unwrap();
    assert!(!evaluation.verdict.mergeable);
    assert_eq!(
        evaluation.change_set.unwrap().changes(),
        &[Change::new("govuk_publishing_components", BumpKind::Major)]
    );
}

#[test]
fn lockfile_major_bump_overrules_patch_update_type() {
    let mut host = FakeHost::green();
    host.message = MINOR_BUMP.replace("version-update:semver-minor", "version-update:semver-patch");
    host.files = vec![lockfile(Some(
        "@@ -120,7 +120,7 @@\n-    govuk_publishing_components (35.1.0)\n+    govuk_publishing_components (36.0.0)\n",
    ))];
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let evaluation = EligibilityPipeline::new(&host, &registry, &config)
        .evaluate(&pull_request())
        .unwrap();
    assert!(!evaluation.is_mergeable());
    assert_eq!(
        evaluation.change_set.unwrap().changes(),
        &[Change::new("govuk_publishing_components", BumpKind::Major)]
    );
}

#[test]
fn unchanged_lockfile_version_is_reported_as_such() {
    let mut host = FakeHost::green();
    host.message = MINOR_BUMP.replace("  update-type: version-update:semver-minor\n", "");
    host.files = vec![lockfile(Some(
        "-    govuk_publishing_components (35.1.0)\n+    govuk_publishing_components (35.1.0)\n",
    ))];
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    assert_eq!(
        reasons(&host, &registry),
        vec!["PR does not change the version of govuk_publishing_components, which is not allowed by its policy (auto_merge: true, allowed_semver_bumps: [patch, minor])."
            .to_string()]
    );
}

struct UnavailableRegistry;

impl OwnerRegistry for UnavailableRegistry {
    fn package_owners(&self, package: &str) -> Result<Option<Vec<String>>, PolicyError> {
        Err(PolicyError::Registry {
            package: package.to_string(),
            detail: "HTTP 503: Service Unavailable".to_string(),
        })
    }
}

#[test]
fn registry_outage_is_named_in_the_verdict() {
    let host = FakeHost::green();
    let config = MergerConfig::default();
    let evaluation = EligibilityPipeline::new(&host, &UnavailableRegistry, &config)
        .evaluate(&pull_request())
        .unwrap();
    assert!(!evaluation.is_mergeable());
    assert_eq!(
        evaluation.verdict.reasons,
        vec!["PR dependency ownership could not be verified: registry lookup for 'govuk_publishing_components' failed: HTTP 503: Service Unavailable"
            .to_string()]
    );
}

#[test]
fn collaborator_failure_is_an_error_not_a_verdict() {
    let mut host = FakeHost::green();
    host.jobs_error = true;
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let err = EligibilityPipeline::new(&host, &registry, &config)
        .evaluate(&pull_request())
        .unwrap_err();
    match err {
        PipelineError::Api { stage, source } => {
            assert_eq!(stage, "fetch CI jobs");
            assert_eq!(source.status, Some(502));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[test]
fn rejected_approval_means_no_merge() {
    let host = FakeHost::green();
    let registry = FakeRegistry::with_internal(&["govuk_publishing_components"]);
    let config = MergerConfig::default();
    let summary = MergeDriver::new(&host, &registry, &config).run(&["collections".to_string()], |_| {});
    assert_eq!(summary.reports.len(), 1);
    assert!(matches!(summary.reports[0].outcome, MergeOutcome::ApprovalFailed(_)));
    assert_eq!(host.actions(), vec!["approve"]);
}
