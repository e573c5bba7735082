// lockfile.rs — Version pairs recovered from a Gemfile.lock patch.
//
// A dependabot bump rewrites the `specs:` entry of the gem it targets:
//
//     -    govuk_publishing_components (35.7.0)
//     +    govuk_publishing_components (35.8.0)
//
// Requirement lines such as `rails (>= 6, < 8)` never match because the
// parenthesised part must be a bare version.

use std::sync::OnceLock;

use regex::Regex;

fn removed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-\s+([A-Za-z0-9][A-Za-z0-9_.\-]*) \(([0-9][0-9.]*)\)$")
            .expect("valid removed-line regex")
    })
}

fn added_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+\s+([A-Za-z0-9][A-Za-z0-9_.\-]*) \(([0-9][0-9.]*)\)$")
            .expect("valid added-line regex")
    })
}

/// Versions removed and added by a lockfile patch, in patch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockfileDiff {
    removed: Vec<(String, String)>,
    added: Vec<(String, String)>,
}

impl LockfileDiff {
    /// Scan unified-diff text line by line.
    pub fn scan(patch: &str) -> Self {
        let mut diff = Self::default();
        for line in patch.lines() {
            if let Some(caps) = removed_pattern().captures(line) {
                diff.removed.push((caps[1].to_string(), caps[2].to_string()));
            } else if let Some(caps) = added_pattern().captures(line) {
                diff.added.push((caps[1].to_string(), caps[2].to_string()));
            }
        }
        diff
    }

    /// The version `name` had before the patch, if a removed line names it.
    pub fn previous_version(&self, name: &str) -> Option<&str> {
        find(&self.removed, name)
    }

    /// The version `name` has after the patch, if an added line names it.
    pub fn next_version(&self, name: &str) -> Option<&str> {
        find(&self.added, name)
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

fn find<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, version)| version.as_str())
}
