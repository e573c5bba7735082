// error.rs — Error types for the eligibility pipeline and merge driver.

use std::path::PathBuf;

use thiserror::Error;

/// A failed call to the pull request host, with the provider's status
/// attached when there was one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", status_prefix(.status))]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A failure that never reached the provider (connection, decoding).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

fn status_prefix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}: ", code),
        None => String::new(),
    }
}

/// Errors from evaluating or acting on a pull request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A collaborator call failed while gathering evidence for a gate.
    #[error("{stage} failed: {source}")]
    Api {
        stage: &'static str,
        #[source]
        source: ApiError,
    },

    /// The merger settings file could not be read.
    #[error("cannot read settings file {}: {source}", .path.display())]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merger settings file is not valid TOML for `MergerConfig`.
    #[error("invalid settings file {}: {detail}", .path.display())]
    SettingsParse { path: PathBuf, detail: String },
}

impl PipelineError {
    pub(crate) fn api(stage: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::Api { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
