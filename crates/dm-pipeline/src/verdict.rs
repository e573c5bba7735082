// verdict.rs — What the pipeline decided and why.
//
// `Blocker` is the typed reason a pull request cannot be merged; its
// Display impl is the user-facing reason string. `Verdict` is the stable
// external shape `{mergeable, reasons}`. Only the first blocker found is
// ever reported, so `reasons` holds at most one entry.

use std::fmt;

use serde::{Deserialize, Serialize};

use dm_changes::{BumpKind, Change, ChangeError, ChangeSet};
use dm_policy::{EffectivePolicy, PolicyError};

/// Why a pull request is not auto-mergeable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    MultipleCommits,
    UnexpectedFiles,
    CiMissing,
    CiFailing,
    PolicyFileMissing { path: String },
    PolicyFileInvalid { path: String },
    PolicyFileUnsupported { path: String },
    MalformedCommit(ChangeError),
    NoDependencies,
    OwnershipUnverified(PolicyError),
    ChangeNotAllowed { change: Change, policy: EffectivePolicy },
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleCommits => f.write_str("PR contains more than one commit."),
            Self::UnexpectedFiles => f.write_str("PR changes files that should not be changed."),
            Self::CiMissing => f.write_str("CI workflow doesn't exist."),
            Self::CiFailing => f.write_str("CI workflow is failing."),
            Self::PolicyFileMissing { path } => write!(f, "The remote {} file is missing.", path),
            Self::PolicyFileInvalid { path } => write!(f, "The remote {} file has invalid syntax.", path),
            Self::PolicyFileUnsupported { path } => {
                write!(f, "The remote {} file uses an unsupported api_version.", path)
            }
            Self::MalformedCommit(ChangeError::MalformedCommitMessage { reason }) => {
                write!(f, "PR commit message is not in the expected format: {}", reason)
            }
            Self::MalformedCommit(e) => {
                write!(f, "PR commit message is not in the expected format: {}", e)
            }
            Self::NoDependencies => f.write_str("PR commit message lists no updated dependencies."),
            Self::OwnershipUnverified(e) => {
                write!(f, "PR dependency ownership could not be verified: {}", e)
            }
            Self::ChangeNotAllowed { change, policy } if change.bump_kind == BumpKind::Unchanged => write!(
                f,
                "PR does not change the version of {}, which is not allowed by its policy ({}).",
                change.dependency, policy
            ),
            Self::ChangeNotAllowed { change, policy } => write!(
                f,
                "PR bumps {} by a {} version, which is not allowed by its policy ({}).",
                change.dependency, change.bump_kind, policy
            ),
        }
    }
}

/// The pipeline's answer for one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub mergeable: bool,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn mergeable() -> Self {
        Self {
            mergeable: true,
            reasons: Vec::new(),
        }
    }

    pub fn blocked(blocker: &Blocker) -> Self {
        Self {
            mergeable: false,
            reasons: vec![blocker.to_string()],
        }
    }
}

/// One gate the pipeline checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStep {
    /// Gate name (e.g. "single_commit", "ci_outcome").
    pub check: String,
    /// "passed" or "failed: <reason>".
    pub outcome: String,
    /// Whether this step decided the verdict.
    pub terminal: bool,
}

/// Full result of evaluating one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// The parsed changes, once gate 6 got far enough to parse them.
    pub change_set: Option<ChangeSet>,
    /// Ordered trace of gates checked.
    pub steps: Vec<GateStep>,
}

impl Evaluation {
    pub fn is_mergeable(&self) -> bool {
        self.verdict.mergeable
    }
}
