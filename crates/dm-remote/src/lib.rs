//! # dm-remote
//!
//! Blocking HTTP collaborators for the dependabot merger:
//!
//! - [`GitHubClient`]: GitHub REST, implementing
//!   [`dm_pipeline::PullRequestApi`].
//! - [`RubyGemsRegistry`]: gem owners, implementing
//!   [`dm_policy::OwnerRegistry`].
//! - [`BankHolidays`]: the gov.uk bank holiday calendar.
//!
//! Timeouts live here, not in the decision logic: every client is built
//! with a request timeout so one hung call fails only its own pull request.

pub mod error;
pub mod github;
pub mod holidays;
pub mod rubygems;

pub use error::RemoteError;
pub use github::{GitHubClient, TOKEN_VAR};
pub use holidays::{BankHoliday, BankHolidays};
pub use rubygems::RubyGemsRegistry;
