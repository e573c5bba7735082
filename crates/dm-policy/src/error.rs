// error.rs — Error types for the policy subsystem.

use thiserror::Error;

/// Errors that can occur while loading policy or looking up ownership.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The remote policy file is not valid YAML or does not fit the schema.
    #[error("invalid policy file: {detail}")]
    InvalidConfig { detail: String },

    /// The remote policy file declares an api_version this engine does not speak.
    #[error("unsupported policy api_version: {}", describe_version(.found))]
    UnsupportedApiVersion { found: Option<i64> },

    /// The package registry could not answer an ownership query.
    #[error("registry lookup for '{package}' failed: {detail}")]
    Registry { package: String, detail: String },
}

fn describe_version(found: &Option<i64>) -> String {
    match found {
        Some(version) => version.to_string(),
        None => "missing".to_string(),
    }
}
