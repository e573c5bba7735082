//! # dm-pipeline
//!
//! Decides whether a dependabot pull request can be merged without a
//! human, and acts on that decision.
//!
//! - [`EligibilityPipeline`] runs six ordered gates (single commit, changed
//!   files, CI discovery, CI outcome, policy file, per-change policy) and
//!   returns an [`Evaluation`]: a [`Verdict`] plus the trace of gates it
//!   checked.
//! - [`MergeDriver`] walks opted-in repositories, evaluates each bot pull
//!   request and, for mergeable ones, approves and then merges.
//! - [`PullRequestApi`] is the seam to the pull request host.
//!
//! ## Key invariants
//!
//! - **First blocker only**: a blocked verdict carries exactly one reason,
//!   from the earliest failing gate.
//! - **Fresh snapshot**: nothing is cached between evaluations, so the same
//!   pull request state always yields the same verdict.
//! - **Approve before merge**: merge is only attempted after approval
//!   succeeded, and neither is retried.

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod verdict;

pub use api::{ChangedFile, CiJob, CommitSummary, HeadCommit, PullRequest, PullRequestApi};
pub use config::MergerConfig;
pub use driver::{MergeDriver, MergeOutcome, PullRequestReport, RunSummary};
pub use error::{ApiError, PipelineError};
pub use pipeline::EligibilityPipeline;
pub use verdict::{Blocker, Evaluation, GateStep, Verdict};
