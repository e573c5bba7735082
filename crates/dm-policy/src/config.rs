// config.rs — The remote policy file each repository opts in with.
//
// Example `.govuk_dependabot_merger.yml`:
//
//     api_version: 0
//     defaults:
//       update_external_dependencies: false
//       auto_merge: true
//       allowed_semver_bumps: [patch, minor]
//     overrides:
//       - dependency: rails
//         auto_merge: false
//       - dependency: rubocop-govuk
//         allowed_semver_bumps: [patch, minor, major]
//
// The file is fetched fresh for every evaluation and is never persisted.
// Loading has three terminal failure states (missing, invalid syntax,
// unsupported api_version), each reported distinctly so the repository
// owner knows which thing to fix.

use serde::{Deserialize, Serialize};

use dm_changes::BumpKind;

use crate::error::PolicyError;

/// The only api_version this engine accepts. No range matching.
pub const SUPPORTED_API_VERSION: i64 = 0;

/// Default location of the policy file in each repository.
pub const DEFAULT_POLICY_FILE: &str = ".govuk_dependabot_merger.yml";

/// Policy fields shared by the `defaults` block and each override.
///
/// Every field is optional: a missing field inherits from the tier below
/// (override → defaults → built-in defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFields {
    #[serde(default)]
    pub update_external_dependencies: Option<bool>,
    #[serde(default)]
    pub auto_merge: Option<bool>,
    #[serde(default)]
    pub allowed_semver_bumps: Option<Vec<BumpKind>>,
}

/// A per-dependency override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub dependency: String,
    #[serde(default)]
    pub update_external_dependencies: Option<bool>,
    #[serde(default)]
    pub auto_merge: Option<bool>,
    #[serde(default)]
    pub allowed_semver_bumps: Option<Vec<BumpKind>>,
}

impl Override {
    /// The override's policy fields without the dependency key.
    pub fn fields(&self) -> RuleFields {
        RuleFields {
            update_external_dependencies: self.update_external_dependencies,
            auto_merge: self.auto_merge,
            allowed_semver_bumps: self.allowed_semver_bumps.clone(),
        }
    }
}

/// Typed form of the remote policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub api_version: Option<i64>,
    #[serde(default)]
    pub defaults: Option<RuleFields>,
    #[serde(default)]
    pub overrides: Option<Vec<Override>>,
}

impl RemoteConfig {
    /// Parse and validate policy file text.
    ///
    /// Syntax is checked before the api_version so that a broken file is
    /// reported as broken; the api_version is checked before the schema so
    /// that a file written for a newer engine is reported as unsupported
    /// rather than invalid.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| PolicyError::InvalidConfig {
                detail: e.to_string(),
            })?;
        if !document.is_mapping() {
            return Err(PolicyError::InvalidConfig {
                detail: "top level must be a mapping".to_string(),
            });
        }

        let found = document.get("api_version").and_then(serde_yaml::Value::as_i64);
        if found != Some(SUPPORTED_API_VERSION) {
            return Err(PolicyError::UnsupportedApiVersion { found });
        }

        let config: RemoteConfig =
            serde_yaml::from_value(document).map_err(|e| PolicyError::InvalidConfig {
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// The overrides list (empty when the file has none).
    pub fn overrides(&self) -> &[Override] {
        self.overrides.as_deref().unwrap_or_default()
    }

    /// The first override naming `dependency`, if any.
    pub fn override_for(&self, dependency: &str) -> Option<&Override> {
        self.overrides().iter().find(|o| o.dependency == dependency)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        let defaults = self.defaults.iter().map(|d| (None, &d.allowed_semver_bumps));
        let overrides = self
            .overrides()
            .iter()
            .map(|o| (Some(o.dependency.as_str()), &o.allowed_semver_bumps));

        for (dependency, bumps) in defaults.chain(overrides) {
            let listed = bumps.as_deref().unwrap_or_default();
            if listed.contains(&BumpKind::Unchanged) {
                let scope = dependency.map_or_else(|| "defaults".to_string(), |d| format!("override '{}'", d));
                return Err(PolicyError::InvalidConfig {
                    detail: format!(
                        "{}: allowed_semver_bumps may only contain patch, minor or major",
                        scope
                    ),
                });
            }
        }

        if let Some(unnamed) = self.overrides().iter().find(|o| o.dependency.trim().is_empty()) {
            return Err(PolicyError::InvalidConfig {
                detail: format!("override with empty dependency name: {:?}", unnamed),
            });
        }
        Ok(())
    }
}

/// The outcome of fetching and loading a repository's policy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigState {
    Loaded(RemoteConfig),
    NotFound,
    Invalid { detail: String },
    UnsupportedVersion { found: Option<i64> },
}

impl ConfigState {
    /// Classify a fetch result: `None` means the file does not exist.
    pub fn from_fetch(raw: Option<&str>) -> Self {
        let Some(text) = raw else {
            return Self::NotFound;
        };
        match RemoteConfig::parse(text) {
            Ok(config) => Self::Loaded(config),
            Err(PolicyError::UnsupportedApiVersion { found }) => Self::UnsupportedVersion { found },
            Err(e) => Self::Invalid {
                detail: e.to_string(),
            },
        }
    }
}
