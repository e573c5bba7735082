//! # dm-changes
//!
//! Works out *what changed* in a dependabot pull request.
//!
//! - [`version::classify`] compares two `MAJOR.MINOR.PATCH` strings and
//!   returns a [`BumpKind`].
//! - [`parse`] reads the `updated-dependencies` trailer of a commit message,
//!   falling back to commit text and the lockfile diff for versions, and
//!   returns a [`ChangeSet`] in mention order.
//!
//! ## Key invariants
//!
//! - **Unparseable is not empty**: a missing or broken trailer is a
//!   [`ChangeError`], never an empty change set.
//! - **No silent `unchanged`**: an entry whose bump cannot be determined is
//!   an error, not `BumpKind::Unchanged`.

pub mod bump;
pub mod change;
pub mod error;
pub mod lockfile;
pub mod parser;
pub mod version;

pub use bump::BumpKind;
pub use change::{Change, ChangeSet, Dependency};
pub use error::ChangeError;
pub use lockfile::LockfileDiff;
pub use parser::{parse, subject_versions, VersionPair};
