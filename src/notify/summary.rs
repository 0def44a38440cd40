//! Channel-neutral view of a stale batch.
//!
//! Both channels render from [`NotificationSummary`]: the email template
//! receives it as its context and the Teams card is assembled from it.
//! Repositories are sorted by name; pull requests keep discovery order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::bitbucket::models::EpochMillis;
use crate::review::batch::{StaleBatch, StalePullRequest};

/// Summary of one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    /// Number of stale pull requests.
    pub total_prs: usize,
    /// Staleness threshold in days.
    pub stale_days: i64,
    /// When the summary was produced (RFC 3339).
    pub generated_at: String,
    /// Stale pull requests grouped by repository.
    pub repositories: Vec<RepositorySummary>,
}

/// Stale pull requests of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    /// Repository slug.
    pub name: String,
    /// Stale pull requests in discovery order.
    pub pull_requests: Vec<PullRequestSummary>,
}

/// Display fields of one stale pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSummary {
    /// Pull request identifier.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Author display name.
    pub author_name: String,
    /// Author login.
    pub author_username: String,
    /// Web link, empty when unknown.
    pub link: String,
    /// Creation time (RFC 3339), empty when unknown.
    pub created: String,
    /// Last update time (RFC 3339), empty when unknown.
    pub updated: String,
    /// Last activity including comments (RFC 3339).
    pub last_activity: String,
    /// Whole days since the last activity.
    pub inactive_days: i64,
    /// Reviewers who approved.
    pub approved: usize,
    /// All reviewers.
    pub reviewers: usize,
}

impl NotificationSummary {
    /// Builds the summary of `batch` stamped with `generated_at`.
    #[must_use]
    pub fn from_batch(batch: &StaleBatch, generated_at: DateTime<Utc>) -> Self {
        let repositories = batch
            .by_repository()
            .into_iter()
            .map(|(name, stale)| RepositorySummary {
                name: name.to_owned(),
                pull_requests: stale
                    .into_iter()
                    .map(|entry| PullRequestSummary::from_stale(batch, entry))
                    .collect(),
            })
            .collect();

        Self {
            total_prs: batch.len(),
            stale_days: batch.stale_after_days(),
            generated_at: format_instant(generated_at),
            repositories,
        }
    }
}

impl PullRequestSummary {
    fn from_stale(batch: &StaleBatch, stale: &StalePullRequest) -> Self {
        let pr = &stale.pull_request;
        let approvals = batch.approval_counts(&stale.key());
        Self {
            id: pr.id.value(),
            title: pr.title.clone(),
            author_name: pr.author.display_name.clone(),
            author_username: pr.author.username.clone(),
            link: pr.link.clone().unwrap_or_default(),
            created: format_millis(pr.created_at),
            updated: format_millis(pr.updated_at),
            last_activity: format_instant(stale.last_activity),
            inactive_days: stale.inactive_days,
            approved: approvals.approved,
            reviewers: approvals.total,
        }
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_millis(millis: EpochMillis) -> String {
    millis.to_datetime().map(format_instant).unwrap_or_default()
}
