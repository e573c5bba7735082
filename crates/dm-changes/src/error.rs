// error.rs — Error types for change extraction.

use thiserror::Error;

/// Errors that can occur while turning commit text into a change set.
///
/// Every variant means "this pull request cannot be classified". Callers
/// must treat them as "not auto-mergeable", never as "no changes".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    /// A version string is not three dot-separated integers.
    #[error("'{version}' is not a MAJOR.MINOR.PATCH version")]
    Semver { version: String },

    /// The trailer block is missing or its body is not the expected YAML.
    #[error("commit message is not in the expected format: {reason}")]
    MalformedCommitMessage { reason: String },

    /// The trailer named an `update-type` this parser does not know.
    #[error("unrecognised update-type: {token}")]
    UnrecognisedUpdateType { token: String },

    /// No `update-type` was given and no version pair could be recovered.
    #[error("could not determine the version bump for '{dependency}'")]
    UndeterminedBump { dependency: String },
}

impl ChangeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCommitMessage {
            reason: reason.into(),
        }
    }
}
