//! Merger settings (`merger.toml`)

use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use dm_policy::DEFAULT_POLICY_FILE;

use crate::error::{PipelineError, Result};

/// Settings for one merger deployment.
///
/// Every field has a default, so an empty file (or no file) describes the
/// GOV.UK deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergerConfig {
    /// GitHub organisation that owns every opted-in repository
    #[serde(default = "default_organisation")]
    pub organisation: String,

    /// Registry owner handle that marks a dependency as internal
    #[serde(default = "default_owner_handle")]
    pub owner_handle: String,

    /// Name of the CI workflow that must pass
    #[serde(default = "default_ci_workflow")]
    pub ci_workflow: String,

    /// Path of the per-repository policy file
    #[serde(default = "default_policy_file")]
    pub policy_file: String,

    /// Lockfile whose patch is used to recover versions
    #[serde(default = "default_lockfile")]
    pub lockfile: String,

    /// Glob patterns a pull request is allowed to touch
    #[serde(default = "default_allowed_files")]
    pub allowed_files: Vec<String>,

    /// Only pull requests authored by this login are considered
    #[serde(default = "default_bot_login")]
    pub bot_login: String,

    /// Body of the approving review
    #[serde(default = "default_approval_message")]
    pub approval_message: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_registry_base")]
    pub registry_base: String,

    #[serde(default = "default_bank_holidays_url")]
    pub bank_holidays_url: String,

    /// Division of the bank holiday calendar to honour
    #[serde(default = "default_bank_holiday_region")]
    pub bank_holiday_region: String,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            organisation: default_organisation(),
            owner_handle: default_owner_handle(),
            ci_workflow: default_ci_workflow(),
            policy_file: default_policy_file(),
            lockfile: default_lockfile(),
            allowed_files: default_allowed_files(),
            bot_login: default_bot_login(),
            approval_message: default_approval_message(),
            api_base: default_api_base(),
            registry_base: default_registry_base(),
            bank_holidays_url: default_bank_holidays_url(),
            bank_holiday_region: default_bank_holiday_region(),
        }
    }
}

// Serde default functions
fn default_organisation() -> String {
    "alphagov".to_string()
}

fn default_owner_handle() -> String {
    "govuk".to_string()
}

fn default_ci_workflow() -> String {
    "CI".to_string()
}

fn default_policy_file() -> String {
    DEFAULT_POLICY_FILE.to_string()
}

fn default_lockfile() -> String {
    "Gemfile.lock".to_string()
}

fn default_allowed_files() -> Vec<String> {
    vec!["Gemfile.lock".to_string()]
}

fn default_bot_login() -> String {
    "dependabot[bot]".to_string()
}

fn default_approval_message() -> String {
    "This PR has been scanned and automatically approved by [govuk-dependabot-merger](https://github.com/alphagov/govuk-dependabot-merger).".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_registry_base() -> String {
    "https://rubygems.org".to_string()
}

fn default_bank_holidays_url() -> String {
    "https://www.gov.uk/bank-holidays.json".to_string()
}

fn default_bank_holiday_region() -> String {
    "england-and-wales".to_string()
}

impl MergerConfig {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| PipelineError::SettingsParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Load settings, falling back to defaults only when the file is absent.
    ///
    /// A file that exists but cannot be parsed is still an error: silently
    /// reverting to defaults would widen what gets merged.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            Ok(Self::default())
        }
    }

    /// Whether `filename` matches one of `allowed_files`.
    ///
    /// `*` does not cross `/`. Invalid patterns never match.
    pub fn file_allowed(&self, filename: &str) -> bool {
        let opts = MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        self.allowed_files.iter().any(|pattern| match Pattern::new(pattern) {
            Ok(p) => p.matches_with(filename, opts),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid allowed_files pattern");
                false
            }
        })
    }
}
