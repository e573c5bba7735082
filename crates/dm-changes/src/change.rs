// change.rs — Dependency, Change and ChangeSet value types.
//
// These are plain immutable values. Ownership (internal vs external) is
// deliberately not stored on Dependency: it is looked up on demand by the
// policy layer so a stale answer can never ride along with the name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bump::BumpKind;

/// A package identified by its package-manager name (e.g. `rack`,
/// `govuk_publishing_components`, `rubocop-govuk`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dependency {
    name: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One dependency touched by a pull request, with how far it moved.
///
/// Two changes are equal iff dependency name and bump kind match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub dependency: Dependency,
    pub bump_kind: BumpKind,
}

impl Change {
    pub fn new(dependency: impl Into<String>, bump_kind: BumpKind) -> Self {
        Self {
            dependency: Dependency::new(dependency),
            bump_kind,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.dependency, self.bump_kind)
    }
}

/// Every change a pull request's head commit makes, in the order the
/// dependencies are first mentioned in the commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
