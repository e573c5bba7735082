// github.rs — GitHub REST implementation of `PullRequestApi`.
//
// Blocking calls against `{api_base}/repos/{organisation}/{repo}/...`,
// authenticated with the token from AUTO_MERGE_TOKEN. Response bodies
// are decoded by the free `decode_*` functions so the wire shapes can be
// tested against fixtures without a network.
//
// Listings fetch a single page of 100, which covers every repository's
// open dependabot pull requests in practice.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use dm_pipeline::{
    ApiError, ChangedFile, CiJob, CommitSummary, HeadCommit, MergerConfig, PullRequest, PullRequestApi,
};

use crate::error::{RemoteError, Result};

/// Environment variable holding the GitHub token.
pub const TOKEN_VAR: &str = "AUTO_MERGE_TOKEN";

const USER_AGENT: &str = concat!("govuk-dependabot-merger/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

// ── Wire shapes ──

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    user: RawUser,
    head: RawRef,
    #[serde(default)]
    created_at: String,
}

impl RawPullRequest {
    fn into_pull_request(self, repo: &str) -> PullRequest {
        PullRequest {
            repo: repo.to_string(),
            number: self.number,
            title: self.title,
            author: self.user.login,
            head_sha: self.head.sha,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    commit: RawCommitDetail,
    #[serde(default)]
    files: Vec<ChangedFile>,
}

#[derive(Debug, Deserialize)]
struct RawWorkflowRun {
    id: u64,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWorkflowRuns {
    workflow_runs: Vec<RawWorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct RawJobs {
    jobs: Vec<CiJob>,
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Decode a `GET /pulls` listing.
pub fn decode_pull_requests(repo: &str, url: &str, body: &str) -> Result<Vec<PullRequest>> {
    let raw: Vec<RawPullRequest> = decode(url, body)?;
    Ok(raw.into_iter().map(|pr| pr.into_pull_request(repo)).collect())
}

/// Decode a `GET /pulls/{number}` response.
pub fn decode_pull_request(repo: &str, url: &str, body: &str) -> Result<PullRequest> {
    let raw: RawPullRequest = decode(url, body)?;
    Ok(raw.into_pull_request(repo))
}

/// Decode a `GET /pulls/{number}/commits` listing.
pub fn decode_commits(url: &str, body: &str) -> Result<Vec<CommitSummary>> {
    decode(url, body)
}

/// Decode a `GET /commits/{sha}` response.
pub fn decode_commit(url: &str, body: &str) -> Result<HeadCommit> {
    let raw: RawCommit = decode(url, body)?;
    Ok(HeadCommit {
        message: raw.commit.message,
        files: raw.files,
    })
}

/// Decode `GET /actions/runs?head_sha=...` and pick the run of `workflow`.
///
/// GitHub lists newest first, so the first match is the latest attempt.
pub fn decode_workflow_run(url: &str, body: &str, workflow: &str) -> Result<Option<u64>> {
    let raw: RawWorkflowRuns = decode(url, body)?;
    Ok(raw
        .workflow_runs
        .into_iter()
        .find(|run| run.name.as_deref() == Some(workflow))
        .map(|run| run.id))
}

/// Decode a `GET /actions/runs/{id}/jobs` response.
pub fn decode_jobs(url: &str, body: &str) -> Result<Vec<CiJob>> {
    let raw: RawJobs = decode(url, body)?;
    Ok(raw.jobs)
}

// ── Client ──

/// Blocking GitHub REST client scoped to one organisation.
pub struct GitHubClient {
    http: Client,
    api_base: String,
    organisation: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_base: &str, organisation: &str, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            organisation: organisation.to_string(),
            token: token.into(),
        })
    }

    /// Build a client from settings and the AUTO_MERGE_TOKEN variable.
    ///
    /// Fails before any request is made when the token is unset or empty.
    pub fn from_env(config: &MergerConfig) -> Result<Self> {
        let token = std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(RemoteError::MissingToken)?;
        Self::new(&config.api_base, &config.organisation, token)
    }

    fn repo_url(&self, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, self.organisation, repo, path)
    }

    fn authorised(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "GET");
        let response = self.authorised(self.http.get(url), JSON_MEDIA_TYPE).send()?;
        Ok(handle_response(response)?.text()?)
    }

    fn get_raw_optional(&self, url: &str) -> Result<Option<String>> {
        tracing::debug!(url, "GET raw");
        let response = self.authorised(self.http.get(url), RAW_MEDIA_TYPE).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(handle_response(response)?.text()?))
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        tracing::debug!(url, "POST");
        let response = self.authorised(self.http.post(url), JSON_MEDIA_TYPE).json(body).send()?;
        handle_response(response)?;
        Ok(())
    }

    fn put_json(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        tracing::debug!(url, "PUT");
        let response = self.authorised(self.http.put(url), JSON_MEDIA_TYPE).json(body).send()?;
        handle_response(response)?;
        Ok(())
    }
}

fn handle_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| status.to_string()),
    })
}

/// GitHub error bodies look like `{"message": "...", ...}`.
fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.message)
}

impl PullRequestApi for GitHubClient {
    fn open_pull_requests(&self, repo: &str) -> std::result::Result<Vec<PullRequest>, ApiError> {
        let url = self.repo_url(repo, "/pulls?state=open&sort=created&direction=asc&per_page=100");
        let body = self.get_text(&url)?;
        Ok(decode_pull_requests(repo, &url, &body)?)
    }

    fn pull_request(&self, repo: &str, number: u64) -> std::result::Result<PullRequest, ApiError> {
        let url = self.repo_url(repo, &format!("/pulls/{}", number));
        let body = self.get_text(&url)?;
        Ok(decode_pull_request(repo, &url, &body)?)
    }

    fn pull_request_commits(&self, repo: &str, number: u64) -> std::result::Result<Vec<CommitSummary>, ApiError> {
        let url = self.repo_url(repo, &format!("/pulls/{}/commits?per_page=100", number));
        let body = self.get_text(&url)?;
        Ok(decode_commits(&url, &body)?)
    }

    fn commit(&self, repo: &str, sha: &str) -> std::result::Result<HeadCommit, ApiError> {
        let url = self.repo_url(repo, &format!("/commits/{}", sha));
        let body = self.get_text(&url)?;
        Ok(decode_commit(&url, &body)?)
    }

    fn ci_workflow_run(&self, repo: &str, sha: &str, workflow: &str) -> std::result::Result<Option<u64>, ApiError> {
        let url = self.repo_url(repo, &format!("/actions/runs?head_sha={}", sha));
        let body = self.get_text(&url)?;
        Ok(decode_workflow_run(&url, &body, workflow)?)
    }

    fn ci_jobs(&self, repo: &str, run_id: u64) -> std::result::Result<Vec<CiJob>, ApiError> {
        let url = self.repo_url(repo, &format!("/actions/runs/{}/jobs?per_page=100", run_id));
        let body = self.get_text(&url)?;
        Ok(decode_jobs(&url, &body)?)
    }

    fn policy_file(&self, repo: &str, path: &str) -> std::result::Result<Option<String>, ApiError> {
        let url = self.repo_url(repo, &format!("/contents/{}", path.trim_start_matches('/')));
        Ok(self.get_raw_optional(&url)?)
    }

    fn approve(&self, repo: &str, number: u64, message: &str) -> std::result::Result<(), ApiError> {
        let url = self.repo_url(repo, &format!("/pulls/{}/reviews", number));
        let body = serde_json::json!({ "event": "APPROVE", "body": message });
        Ok(self.post_json(&url, &body)?)
    }

    fn merge(&self, repo: &str, number: u64) -> std::result::Result<(), ApiError> {
        let url = self.repo_url(repo, &format!("/pulls/{}/merge", number));
        Ok(self.put_json(&url, &serde_json::json!({}))?)
    }
}
