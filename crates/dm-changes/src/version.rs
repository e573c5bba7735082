// version.rs — MAJOR.MINOR.PATCH comparison.
//
// Only plain three-part numeric versions are understood. Pre-release and
// build metadata (`1.2.3-rc.1`, `1.2.3+abc`) are rejected with a Semver
// error; dependabot bumps of gems essentially never carry them, and a
// guess here would feed straight into an auto-merge decision.

use std::sync::OnceLock;

use regex::Regex;

use crate::bump::BumpKind;
use crate::error::ChangeError;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("valid version regex"))
}

/// A parsed MAJOR.MINOR.PATCH triple. Only used transiently for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    fn parse(raw: &str) -> Result<Self, ChangeError> {
        let invalid = || ChangeError::Semver {
            version: raw.to_string(),
        };
        if !version_pattern().is_match(raw) {
            return Err(invalid());
        }
        let mut parts = raw.split('.').map(str::parse::<u64>);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch))) => Ok(Self {
                major,
                minor,
                patch,
            }),
            // Components that overflow u64 land here.
            _ => Err(invalid()),
        }
    }
}

/// Check that `raw` is a MAJOR.MINOR.PATCH version.
pub fn validate(raw: &str) -> Result<(), ChangeError> {
    Version::parse(raw).map(|_| ())
}

/// Classify the move from `previous` to `next`.
///
/// Components are compared major, then minor, then patch; the first one
/// that increased decides the kind. Equal versions are `Unchanged`.
pub fn classify(previous: &str, next: &str) -> Result<BumpKind, ChangeError> {
    let prev = Version::parse(previous)?;
    let next = Version::parse(next)?;

    let kind = if next.major > prev.major {
        BumpKind::Major
    } else if next.minor > prev.minor {
        BumpKind::Minor
    } else if next.patch > prev.patch {
        BumpKind::Patch
    } else {
        BumpKind::Unchanged
    };
    Ok(kind)
}
