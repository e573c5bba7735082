// error.rs — Error types for the HTTP collaborators.

use thiserror::Error;

use dm_pipeline::ApiError;

/// Errors talking to GitHub, RubyGems or the bank holiday feed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The GitHub token environment variable is not set.
    #[error("AUTO_MERGE_TOKEN missing")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The body did not have the expected shape.
    #[error("unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// The bank holiday feed has no calendar for this division.
    #[error("no bank holiday calendar for '{region}'")]
    UnknownRegion { region: String },
}

pub type Result<T> = std::result::Result<T, RemoteError>;

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Api { status, message } => ApiError::new(Some(status), message),
            RemoteError::Http(e) => ApiError::new(e.status().map(|s| s.as_u16()), e.to_string()),
            other => ApiError::transport(other.to_string()),
        }
    }
}
