// parser.rs — Commit message + lockfile diff → ChangeSet.
//
// Dependabot commit messages end with a YAML trailer block:
//
//     ---
//     updated-dependencies:
//     - dependency-name: govuk_publishing_components
//       dependency-type: direct:production
//       update-type: version-update:semver-minor
//     ...
//
// The trailer is the primary source. When an entry has no `update-type`
// the bump is inferred from versions found in, in increasing priority:
//
// 1. the subject line (`Bump foo from 1.2.3 to 1.3.0`) or, for grouped
//    updates, the body line ``Updates `foo` from 1.2.3 to 1.3.0``
// 2. the lockfile diff (`-    foo (1.2.3)` / `+    foo (1.3.0)`)
//
// The lockfile diff wins over commit text because it is what the merge
// actually changes. When an entry does carry an `update-type` and the
// lockfile also moves that dependency, the more significant of the two
// bumps is used, so a trailer can never understate a lockfile change.
// Only dependencies named in the trailer are looked up in the diff, so
// transitive churn is never picked up.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::bump::BumpKind;
use crate::change::{Change, ChangeSet};
use crate::error::ChangeError;
use crate::lockfile::LockfileDiff;
use crate::version;

const TRAILER_START: &str = "---";
const TRAILER_END: &str = "...";

#[derive(Debug, Deserialize)]
struct Trailer {
    #[serde(rename = "updated-dependencies")]
    updated_dependencies: Vec<TrailerEntry>,
}

#[derive(Debug, Deserialize)]
struct TrailerEntry {
    #[serde(rename = "dependency-name")]
    dependency_name: String,
    #[serde(rename = "update-type", default)]
    update_type: Option<String>,
}

/// A `from` / `to` version pair recovered from commit text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPair {
    pub dependency: String,
    pub from: String,
    pub to: String,
}

fn subject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:bump|update)\s+`?([^\s`]+)`?\s+(?:requirement\s+)?from\s+(.+?)\s+to\s+(.+?)\s*$")
            .expect("valid subject regex")
    })
}

fn grouped_update_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*Updates\s+`?([^\s`]+)`?\s+from\s+(.+?)\s+to\s+(.+?)\.?\s*$")
            .expect("valid grouped-update regex")
    })
}

fn bare_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:>=|~>|=)?\s*([0-9][0-9A-Za-z.+\-]*)$").expect("valid bare-version regex")
    })
}

/// Parse the change set out of a dependabot commit message.
///
/// `lockfile_diff` is the patch text of the lockfile, when available.
/// Changes come back in trailer order; a dependency listed twice keeps
/// its first entry.
pub fn parse(commit_message: &str, lockfile_diff: Option<&str>) -> Result<ChangeSet, ChangeError> {
    let trailer = read_trailer(commit_message)?;
    let lockfile = lockfile_diff.map(LockfileDiff::scan).unwrap_or_default();

    let mut seen = HashSet::new();
    let mut changes = Vec::with_capacity(trailer.updated_dependencies.len());
    for entry in trailer.updated_dependencies {
        let name = entry.dependency_name.trim();
        if name.is_empty() {
            return Err(ChangeError::malformed("empty dependency-name"));
        }
        if !seen.insert(name.to_string()) {
            continue;
        }

        let bump_kind = match entry.update_type.as_deref() {
            Some(token) => {
                let claimed = BumpKind::from_dependabot_token(token)?;
                match locked_bump(name, &lockfile)? {
                    Some(locked) if locked > claimed => {
                        tracing::debug!(dependency = name, %claimed, %locked, "lockfile shows a larger bump than update-type");
                        locked
                    }
                    _ => claimed,
                }
            }
            None => infer_bump(name, commit_message, &lockfile)?,
        };
        tracing::debug!(dependency = name, bump = %bump_kind, "classified change");
        changes.push(Change::new(name, bump_kind));
    }

    Ok(ChangeSet::new(changes))
}

/// Pull `from`/`to` versions out of a subject line such as
/// `Bump foo from 1.2.3 to 2.3.4` or
/// `Update bar requirement from ~> 1.0 to ~> 2.0`.
///
/// Returns `None` when either side is a range the parser cannot reduce to
/// a single version (`>= 1.0, < 2.0`, `< 2.0`).
pub fn subject_versions(subject: &str) -> Option<VersionPair> {
    let caps = subject_pattern().captures(subject.trim())?;
    version_pair(&caps[1], &caps[2], &caps[3])
}

fn grouped_versions(message: &str, dependency: &str) -> Option<VersionPair> {
    message
        .lines()
        .filter_map(|line| grouped_update_pattern().captures(line))
        .find(|caps| &caps[1] == dependency)
        .and_then(|caps| version_pair(&caps[1], &caps[2], &caps[3]))
}

fn version_pair(dependency: &str, from: &str, to: &str) -> Option<VersionPair> {
    Some(VersionPair {
        dependency: dependency.to_string(),
        from: bare_version(from)?,
        to: bare_version(to)?,
    })
}

fn bare_version(raw: &str) -> Option<String> {
    bare_version_pattern()
        .captures(raw.trim())
        .map(|caps| caps[1].to_string())
}

fn read_trailer(commit_message: &str) -> Result<Trailer, ChangeError> {
    let lines: Vec<&str> = commit_message.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.trim_end() == TRAILER_START)
        .ok_or_else(|| ChangeError::malformed("no '---' line opening the trailer block"))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.trim_end() == TRAILER_END)
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| ChangeError::malformed("no '...' line closing the trailer block"))?;

    let body = lines[start + 1..end].join("\n");
    serde_yaml::from_str(&body).map_err(|e| ChangeError::malformed(e.to_string()))
}

/// The bump the lockfile itself records for `name`, when it shows both sides.
fn locked_bump(name: &str, lockfile: &LockfileDiff) -> Result<Option<BumpKind>, ChangeError> {
    match (lockfile.previous_version(name), lockfile.next_version(name)) {
        (Some(previous), Some(next)) => version::classify(previous, next).map(Some),
        _ => Ok(None),
    }
}

fn infer_bump(name: &str, commit_message: &str, lockfile: &LockfileDiff) -> Result<BumpKind, ChangeError> {
    let subject = commit_message.lines().next().unwrap_or_default();
    let mentioned = subject_versions(subject)
        .filter(|pair| pair.dependency == name)
        .or_else(|| grouped_versions(commit_message, name));

    let mut previous = mentioned.as_ref().map(|pair| pair.from.clone());
    let mut next = mentioned.as_ref().map(|pair| pair.to.clone());

    if let Some(locked) = lockfile.previous_version(name) {
        if previous.as_deref().is_some_and(|v| v != locked) {
            tracing::debug!(dependency = name, commit = ?previous, lockfile = locked, "lockfile overrides previous version");
        }
        previous = Some(locked.to_string());
    }
    if let Some(locked) = lockfile.next_version(name) {
        if next.as_deref().is_some_and(|v| v != locked) {
            tracing::debug!(dependency = name, commit = ?next, lockfile = locked, "lockfile overrides next version");
        }
        next = Some(locked.to_string());
    }

    match (previous, next) {
        (Some(previous), Some(next)) => version::classify(&previous, &next),
        _ => Err(ChangeError::UndeterminedBump {
            dependency: name.to_string(),
        }),
    }
}
