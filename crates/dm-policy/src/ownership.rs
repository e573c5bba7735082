// ownership.rs — Internal vs external dependency classification.
//
// A dependency is "internal" when the package registry lists the
// organisation's handle among its owners. Anything the registry cannot
// vouch for is external, so unknown packages never look safe to
// auto-merge. A failed lookup also answers "external", but the failure
// is kept so callers can report the outage instead of a policy block.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PolicyError;

/// Package registry collaborator (e.g. RubyGems).
pub trait OwnerRegistry: Send + Sync {
    /// Owner handles for `package`, or `Ok(None)` when the registry has no
    /// such package.
    fn package_owners(&self, package: &str) -> Result<Option<Vec<String>>, PolicyError>;
}

/// Answers "is this dependency maintained by us?".
pub trait OwnershipClassifier {
    fn is_internal(&self, dependency: &str) -> bool;
}

/// Registry-backed classifier with per-evaluation memoisation.
///
/// Build one per pull request evaluation; the cache is never shared
/// across evaluations, so every run sees fresh registry data.
pub struct RegistryOwnership<'a> {
    registry: &'a dyn OwnerRegistry,
    org_handle: String,
    memo: Mutex<HashMap<String, Result<bool, PolicyError>>>,
}

impl<'a> RegistryOwnership<'a> {
    pub fn new(registry: &'a dyn OwnerRegistry, org_handle: impl Into<String>) -> Self {
        Self {
            registry,
            org_handle: org_handle.into(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, dependency: &str) -> Result<bool, PolicyError> {
        match self.registry.package_owners(dependency) {
            Ok(Some(owners)) => Ok(owners.iter().any(|owner| owner == &self.org_handle)),
            Ok(None) => {
                tracing::debug!(dependency, "package not found in registry; treating as external");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(dependency, error = %e, "ownership lookup failed; treating as external");
                Err(e)
            }
        }
    }

    fn answer(&self, dependency: &str) -> Result<bool, PolicyError> {
        if let Ok(memo) = self.memo.lock() {
            if let Some(known) = memo.get(dependency) {
                return known.clone();
            }
        }
        let answer = self.lookup(dependency);
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(dependency.to_string(), answer.clone());
        }
        answer
    }

    /// The registry error behind an "external" answer for `dependency`,
    /// if its lookup failed during this evaluation.
    pub fn lookup_failure(&self, dependency: &str) -> Option<PolicyError> {
        let memo = self.memo.lock().ok()?;
        match memo.get(dependency) {
            Some(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }
}

impl OwnershipClassifier for RegistryOwnership<'_> {
    fn is_internal(&self, dependency: &str) -> bool {
        self.answer(dependency).unwrap_or(false)
    }
}
