//! Stale pull request detection.
//!
//! The pipeline runs per pull request in a fixed order: keyword filter,
//! approval evaluation, activity resolution, then staleness classification.
//! [`StaleDetector`] applies it across repositories and collects the results
//! in a [`StaleBatch`].

pub mod activity;
pub mod approval;
pub mod batch;
pub mod cycle;
pub mod keyword;
pub mod staleness;

pub use activity::{ActivityParseError, parse_activity, resolve_last_activity};
pub use approval::{ApprovalCount, approval_count, is_approved};
pub use batch::{StaleBatch, StalePullRequest};
pub use cycle::StaleDetector;
pub use keyword::{KeywordFilter, is_excluded};
pub use staleness::{elapsed_days, is_stale};
