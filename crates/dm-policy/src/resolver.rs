// resolver.rs — Effective policy for one dependency.
//
// Resolution, field by field:
//
// 1. Built-in defaults: update_external_dependencies=false, auto_merge=true,
//    allowed_semver_bumps=[patch, minor].
// 2. The file's `defaults` block overrides any field it sets.
// 3. The first override naming the dependency overrides any field it sets.
// 4. External gate: if auto_merge is still true and the dependency is not
//    internal, auto_merge becomes update_external_dependencies.
// 5. If auto_merge is false, allowed bumps collapse to the empty set.
//
// Ownership is only queried when step 4 can change the answer, so a
// dependency with auto_merge disabled never costs a registry round trip.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use dm_changes::{BumpKind, Change};

use crate::config::{RemoteConfig, RuleFields};
use crate::ownership::OwnershipClassifier;

/// The resolved policy for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePolicy {
    pub auto_merge: bool,
    pub allowed_bump_kinds: BTreeSet<BumpKind>,
}

impl EffectivePolicy {
    pub fn allows(&self, bump: BumpKind) -> bool {
        self.auto_merge && self.allowed_bump_kinds.contains(&bump)
    }
}

impl fmt::Display for EffectivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bumps: Vec<&str> = self.allowed_bump_kinds.iter().map(|b| b.as_str()).collect();
        write!(
            f,
            "auto_merge: {}, allowed_semver_bumps: [{}]",
            self.auto_merge,
            bumps.join(", ")
        )
    }
}

/// A policy tier with every field filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    update_external_dependencies: bool,
    auto_merge: bool,
    allowed_bump_kinds: BTreeSet<BumpKind>,
}

impl Rule {
    fn builtin() -> Self {
        Self {
            update_external_dependencies: false,
            auto_merge: true,
            allowed_bump_kinds: [BumpKind::Patch, BumpKind::Minor].into_iter().collect(),
        }
    }

    /// Layer `fields` on top of `self`; unset fields keep their value.
    fn overlay(mut self, fields: &RuleFields) -> Self {
        if let Some(v) = fields.update_external_dependencies {
            self.update_external_dependencies = v;
        }
        if let Some(v) = fields.auto_merge {
            self.auto_merge = v;
        }
        if let Some(bumps) = &fields.allowed_semver_bumps {
            self.allowed_bump_kinds = bumps.iter().copied().collect();
        }
        self
    }
}

/// Outcome of checking one change against its policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeVerdict {
    pub change: Change,
    pub policy: EffectivePolicy,
    pub allowed: bool,
}

/// Resolves layered policy for dependencies of one repository.
pub struct PolicyResolver<'a> {
    config: &'a RemoteConfig,
    ownership: &'a dyn OwnershipClassifier,
}

impl<'a> PolicyResolver<'a> {
    pub fn new(config: &'a RemoteConfig, ownership: &'a dyn OwnershipClassifier) -> Self {
        Self { config, ownership }
    }

    fn defaults(&self) -> Rule {
        match &self.config.defaults {
            Some(fields) => Rule::builtin().overlay(fields),
            None => Rule::builtin(),
        }
    }

    /// Compute the effective policy for `dependency`.
    pub fn effective_policy(&self, dependency: &str) -> EffectivePolicy {
        let mut rule = self.defaults();
        if let Some(found) = self.config.override_for(dependency) {
            rule = rule.overlay(&found.fields());
        }

        let mut auto_merge = rule.auto_merge;
        if auto_merge && !self.ownership.is_internal(dependency) {
            auto_merge = rule.update_external_dependencies;
            tracing::debug!(
                dependency,
                update_external_dependencies = auto_merge,
                "external dependency"
            );
        }

        EffectivePolicy {
            auto_merge,
            allowed_bump_kinds: if auto_merge {
                rule.allowed_bump_kinds
            } else {
                BTreeSet::new()
            },
        }
    }

    /// Whether a `bump` of `dependency` may be merged without review.
    pub fn change_allowed(&self, dependency: &str, bump: BumpKind) -> bool {
        self.effective_policy(dependency).allows(bump)
    }

    /// Check a change and keep the policy that decided it.
    pub fn check(&self, change: &Change) -> ChangeVerdict {
        let policy = self.effective_policy(change.dependency.name());
        ChangeVerdict {
            allowed: policy.allows(change.bump_kind),
            change: change.clone(),
            policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;

    struct Internal {
        names: HashSet<&'static str>,
        lookups: Cell<usize>,
    }

    impl Internal {
        fn of(names: &[&'static str]) -> Self {
            Self {
                names: names.iter().copied().collect(),
                lookups: Cell::new(0),
            }
        }
    }

    impl OwnershipClassifier for Internal {
        fn is_internal(&self, dependency: &str) -> bool {
            self.lookups.set(self.lookups.get() + 1);
            self.names.contains(dependency)
        }
    }

    fn config(yaml: &str) -> RemoteConfig {
        RemoteConfig::parse(yaml).unwrap()
    }

    fn kinds(list: &[BumpKind]) -> BTreeSet<BumpKind> {
        list.iter().copied().collect()
    }

    #[test]
    fn builtin_defaults_apply_without_defaults_block() {
        let config = config("api_version: 0\n");
        let ownership = Internal::of(&["foo"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert_eq!(
            resolver.effective_policy("foo"),
            EffectivePolicy {
                auto_merge: true,
                allowed_bump_kinds: kinds(&[BumpKind::Patch, BumpKind::Minor]),
            }
        );
    }

    #[test]
    fn external_dependency_blocked_by_default() {
        let config = config(
            "api_version: 0\ndefaults:\n  auto_merge: true\n  update_external_dependencies: false\n  allowed_semver_bumps: [patch, minor]\n",
        );
        let ownership = Internal::of(&["bar"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(!resolver.change_allowed("foo", BumpKind::Patch));
        assert!(resolver.effective_policy("foo").allowed_bump_kinds.is_empty());
    }

    #[test]
    fn internal_dependency_allowed_minor() {
        let config = config(
            "api_version: 0\ndefaults:\n  auto_merge: true\n  update_external_dependencies: false\n  allowed_semver_bumps: [patch, minor]\n",
        );
        let ownership = Internal::of(&["bar"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(resolver.change_allowed("bar", BumpKind::Minor));
        assert!(!resolver.change_allowed("bar", BumpKind::Major));
    }

    #[test]
    fn external_dependencies_allowed_when_opted_in() {
        let config = config("api_version: 0\ndefaults:\n  update_external_dependencies: true\n");
        let ownership = Internal::of(&[]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(resolver.change_allowed("rack", BumpKind::Patch));
    }

    #[test]
    fn override_without_bumps_inherits_default_bumps() {
        let config = config(
            "api_version: 0\ndefaults:\n  allowed_semver_bumps: [patch]\noverrides:\n  - dependency: foo\n    update_external_dependencies: true\n",
        );
        let ownership = Internal::of(&[]);
        let resolver = PolicyResolver::new(&config, &ownership);
        let policy = resolver.effective_policy("foo");
        assert!(policy.auto_merge);
        assert_eq!(policy.allowed_bump_kinds, kinds(&[BumpKind::Patch]));
    }

    #[test]
    fn override_auto_merge_false_empties_bumps() {
        let config = config(
            "api_version: 0\noverrides:\n  - dependency: foo\n    auto_merge: false\n    allowed_semver_bumps: [patch, minor, major]\n",
        );
        let ownership = Internal::of(&["foo"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert_eq!(
            resolver.effective_policy("foo"),
            EffectivePolicy {
                auto_merge: false,
                allowed_bump_kinds: BTreeSet::new(),
            }
        );
    }

    #[test]
    fn override_only_applies_to_named_dependency() {
        let config = config(
            "api_version: 0\noverrides:\n  - dependency: foo\n    allowed_semver_bumps: [major]\n",
        );
        let ownership = Internal::of(&["foo", "bar"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(resolver.change_allowed("foo", BumpKind::Major));
        assert!(!resolver.change_allowed("foo", BumpKind::Patch));
        assert!(resolver.change_allowed("bar", BumpKind::Patch));
        assert!(!resolver.change_allowed("bar", BumpKind::Major));
    }

    #[test]
    fn override_can_enable_dependency_when_defaults_disable() {
        let config = config(
            "api_version: 0\ndefaults:\n  auto_merge: false\noverrides:\n  - dependency: foo\n    auto_merge: true\n",
        );
        let ownership = Internal::of(&["foo", "bar"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(resolver.change_allowed("foo", BumpKind::Minor));
        assert!(!resolver.change_allowed("bar", BumpKind::Patch));
    }

    #[test]
    fn ownership_not_queried_when_auto_merge_disabled() {
        let config = config("api_version: 0\ndefaults:\n  auto_merge: false\n");
        let ownership = Internal::of(&[]);
        let resolver = PolicyResolver::new(&config, &ownership);
        resolver.effective_policy("foo");
        assert_eq!(ownership.lookups.get(), 0);
    }

    #[test]
    fn unchanged_bump_is_never_allowed() {
        let config = config("api_version: 0\n");
        let ownership = Internal::of(&["foo"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        assert!(!resolver.change_allowed("foo", BumpKind::Unchanged));
    }

    #[test]
    fn check_keeps_blocking_policy() {
        let config = config("api_version: 0\n");
        let ownership = Internal::of(&["rails"]);
        let resolver = PolicyResolver::new(&config, &ownership);
        let verdict = resolver.check(&Change::new("rails", BumpKind::Major));
        assert!(!verdict.allowed);
        assert_eq!(
            verdict.policy.to_string(),
            "auto_merge: true, allowed_semver_bumps: [patch, minor]"
        );
    }
}
