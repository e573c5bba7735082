// bump.rs — Semver bump classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChangeError;

/// How far a dependency moved between two versions.
///
/// Ordered from least to most significant so `max()` over a set of bumps
/// yields the riskiest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Unchanged,
    Patch,
    Minor,
    Major,
}

/// The `update-type` tokens dependabot writes into commit trailers.
const DEPENDABOT_MAJOR: &str = "version-update:semver-major";
const DEPENDABOT_MINOR: &str = "version-update:semver-minor";
const DEPENDABOT_PATCH: &str = "version-update:semver-patch";

impl BumpKind {
    /// Map a dependabot `update-type` token to a bump kind.
    ///
    /// Dependabot only emits the three semver tokens today. Anything else
    /// is an error rather than a guess.
    pub fn from_dependabot_token(token: &str) -> Result<Self, ChangeError> {
        match token.trim() {
            DEPENDABOT_MAJOR => Ok(Self::Major),
            DEPENDABOT_MINOR => Ok(Self::Minor),
            DEPENDABOT_PATCH => Ok(Self::Patch),
            other => Err(ChangeError::UnrecognisedUpdateType {
                token: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
