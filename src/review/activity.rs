//! Last-activity resolution.
//!
//! The last activity of a pull request is the latest of its update time
//! (falling back to creation time) and the update times of its activity
//! records. It travels as an RFC 3339 string so it can be logged and rendered
//! verbatim, and is parsed back for classification.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::bitbucket::models::{Comment, EpochMillis, PullRequest};

/// Error returned when an activity timestamp cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid activity timestamp '{value}': {message}")]
pub struct ActivityParseError {
    /// Offending text.
    pub value: String,
    /// Parser error detail.
    pub message: String,
}

/// Resolves the most recent activity time of `pr`, formatted as RFC 3339 UTC
/// with millisecond precision.
///
/// Returns `None` when the pull request has neither an update nor a creation
/// time. Only the `updated_at` of each comment is considered.
#[must_use]
pub fn resolve_last_activity(pr: &PullRequest, comments: &[Comment]) -> Option<String> {
    let baseline = if pr.updated_at.is_absent() {
        pr.created_at
    } else {
        pr.updated_at
    };
    if baseline.is_absent() {
        return None;
    }

    let latest = comments
        .iter()
        .map(|comment| comment.updated_at)
        .fold(baseline, EpochMillis::max);

    latest.to_datetime().map(format_activity)
}

/// Formats an instant the way [`resolve_last_activity`] does.
#[must_use]
pub fn format_activity(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns [`ActivityParseError`] when `text` is not valid RFC 3339.
pub fn parse_activity(text: &str) -> Result<DateTime<Utc>, ActivityParseError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| ActivityParseError {
            value: text.to_owned(),
            message: error.to_string(),
        })
}
