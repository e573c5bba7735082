//! # dm-policy
//!
//! Auto-merge policy for dependabot pull requests.
//!
//! Each repository opts in with a policy file ([`RemoteConfig`]) holding
//! global `defaults` and per-dependency `overrides`. The [`PolicyResolver`]
//! layers these field by field, folds in dependency ownership from an
//! [`OwnershipClassifier`], and answers whether a given bump may be merged
//! without review.
//!
//! ## Key invariants
//!
//! - **Unknown is external**: a package the registry cannot vouch for is
//!   never treated as internal.
//! - **No merge, no bumps**: when the resolved `auto_merge` is false the
//!   allowed bump set is empty.
//! - **Exact api_version**: any version other than
//!   [`SUPPORTED_API_VERSION`] is unsupported.

pub mod config;
pub mod error;
pub mod ownership;
pub mod resolver;

pub use config::{ConfigState, Override, RemoteConfig, RuleFields, DEFAULT_POLICY_FILE, SUPPORTED_API_VERSION};
pub use error::PolicyError;
pub use ownership::{OwnerRegistry, OwnershipClassifier, RegistryOwnership};
pub use resolver::{ChangeVerdict, EffectivePolicy, PolicyResolver};
