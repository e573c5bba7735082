// api.rs — The pull request host as seen by the pipeline.
//
// `PullRequestApi` is the seam between decision logic and the network.
// The production implementation lives in dm-remote (GitHub REST); tests
// use in-memory fakes. Every call is a blocking round trip and returns a
// fresh snapshot; nothing here is cached.
//
// `repo` arguments are bare repository names ("whitehall"); the
// implementation qualifies them with the organisation.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub head_sha: String,
    /// RFC 3339 timestamp; sorts chronologically as a string.
    #[serde(default)]
    pub created_at: String,
}

impl PullRequest {
    /// `repo#number`, the form used in progress output and logs.
    pub fn label(&self) -> String {
        format!("{}#{}", self.repo, self.number)
    }
}

/// Minimal metadata for one commit in a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
}

/// A file touched by a commit. `patch` is absent for binary or huge diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub patch: Option<String>,
}

/// The pull request's head commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    pub message: String,
    pub files: Vec<ChangedFile>,
}

impl HeadCommit {
    /// The patch of the file named `filename`, if it was touched.
    pub fn patch_for(&self, filename: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.filename == filename)
            .and_then(|f| f.patch.as_deref())
    }
}

/// One job of a CI workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiJob {
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl CiJob {
    /// Finished, and either succeeded or was deliberately skipped.
    pub fn is_green(&self) -> bool {
        self.status == "completed"
            && matches!(self.conclusion.as_deref(), Some("success") | Some("skipped"))
    }
}

/// Blocking access to the pull request host.
pub trait PullRequestApi: Send + Sync {
    /// Open pull requests of `repo`, in any order.
    fn open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, ApiError>;

    /// A single pull request.
    fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, ApiError>;

    /// Every commit on the pull request.
    fn pull_request_commits(&self, repo: &str, number: u64) -> Result<Vec<CommitSummary>, ApiError>;

    /// Message and changed files of commit `sha`.
    fn commit(&self, repo: &str, sha: &str) -> Result<HeadCommit, ApiError>;

    /// Id of the run of `workflow` for commit `sha`, if one exists.
    fn ci_workflow_run(&self, repo: &str, sha: &str, workflow: &str) -> Result<Option<u64>, ApiError>;

    /// Jobs of workflow run `run_id`.
    fn ci_jobs(&self, repo: &str, run_id: u64) -> Result<Vec<CiJob>, ApiError>;

    /// Raw text of `path` on the default branch; `Ok(None)` when absent.
    fn policy_file(&self, repo: &str, path: &str) -> Result<Option<String>, ApiError>;

    /// Post an approving review with `message` as its body.
    fn approve(&self, repo: &str, number: u64, message: &str) -> Result<(), ApiError>;

    /// Merge the pull request.
    fn merge(&self, repo: &str, number: u64) -> Result<(), ApiError>;
}
