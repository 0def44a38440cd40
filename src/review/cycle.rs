//! One check cycle across the monitored repositories.
//!
//! Repositories are processed sequentially. Within a repository the keyword
//! filter runs first, then each surviving pull request goes through approval,
//! activity resolution, and staleness classification. A failure affects only
//! the repository or pull request it occurred on; it is recorded as an event
//! and the cycle moves on.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bitbucket::gateway::PullRequestSource;
use crate::bitbucket::models::{PullRequest, PullRequestKey};
use crate::telemetry::{EventSink, MonitorEvent};

use super::activity::{parse_activity, resolve_last_activity};
use super::approval::is_approved;
use super::batch::{StaleBatch, StalePullRequest};
use super::keyword::KeywordFilter;
use super::staleness::{elapsed_days, is_stale};

/// Runs the stale pull request detection pipeline.
#[derive(Clone)]
pub struct StaleDetector {
    source: Arc<dyn PullRequestSource>,
    filter: KeywordFilter,
    stale_after_days: i64,
    events: Arc<dyn EventSink>,
}

impl StaleDetector {
    /// Creates a detector reading from `source` and reporting to `events`.
    #[must_use]
    pub fn new(
        source: Arc<dyn PullRequestSource>,
        filter: KeywordFilter,
        stale_after_days: i64,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source,
            filter,
            stale_after_days,
            events,
        }
    }

    /// Staleness threshold in days.
    #[must_use]
    pub const fn stale_after_days(&self) -> i64 {
        self.stale_after_days
    }

    /// Scans every repository and returns the stale pull requests found.
    ///
    /// Never fails: fetch errors and unusable timestamps are recorded as
    /// events and the affected unit is skipped.
    pub async fn run_cycle(&self, repositories: &[String], now: DateTime<Utc>) -> StaleBatch {
        self.events.record(MonitorEvent::CycleStarted {
            repositories: repositories.len(),
            stale_after_days: self.stale_after_days,
        });

        let mut batch = StaleBatch::new(self.stale_after_days);
        for repository in repositories {
            self.scan_repository(repository, now, &mut batch).await;
        }
        batch
    }

    async fn scan_repository(&self, repository: &str, now: DateTime<Utc>, batch: &mut StaleBatch) {
        let pull_requests = match self.source.open_pull_requests(repository).await {
            Ok(pull_requests) => pull_requests,
            Err(error) => {
                self.events.record(MonitorEvent::RepositoryFetchFailed {
                    repository: repository.to_owned(),
                    message: error.to_string(),
                });
                return;
            }
        };

        let total = pull_requests.len();
        let eligible = self.filter.retain_eligible(pull_requests);
        self.events.record(MonitorEvent::RepositoryScanned {
            repository: repository.to_owned(),
            total,
            eligible: eligible.len(),
        });

        for pull_request in eligible {
            if let Some(stale) = self.evaluate(repository, pull_request, now, batch).await {
                self.events.record(MonitorEvent::StalePullRequestFound {
                    repository: stale.repository.clone(),
                    pull_request: stale.pull_request.id.value(),
                    title: stale.pull_request.title.clone(),
                    inactive_days: stale.inactive_days,
                });
                batch.push_stale(stale);
            }
        }
    }

    /// Classifies one pull request, recording its participants on the way.
    async fn evaluate(
        &self,
        repository: &str,
        pull_request: PullRequest,
        now: DateTime<Utc>,
        batch: &mut StaleBatch,
    ) -> Option<StalePullRequest> {
        let id = pull_request.id;

        let participants = match self.source.participants(repository, id).await {
            Ok(participants) => participants,
            Err(error) => {
                self.events.record(MonitorEvent::ParticipantsFetchFailed {
                    repository: repository.to_owned(),
                    pull_request: id.value(),
                    message: error.to_string(),
                });
                return None;
            }
        };
        let approved = is_approved(&participants);
        batch.record_participants(PullRequestKey::new(repository, id), participants);
        if approved {
            return None;
        }

        let comments = match self.source.comments(repository, id).await {
            Ok(comments) => comments,
            Err(error) => {
                self.events.record(MonitorEvent::CommentsFetchFailed {
                    repository: repository.to_owned(),
                    pull_request: id.value(),
                    message: error.to_string(),
                });
                return None;
            }
        };

        let Some(resolved) = resolve_last_activity(&pull_request, &comments) else {
            self.events.record(MonitorEvent::ActivityUnresolved {
                repository: repository.to_owned(),
                pull_request: id.value(),
            });
            return None;
        };

        let last_activity = match parse_activity(&resolved) {
            Ok(last_activity) => last_activity,
            Err(error) => {
                self.events.record(MonitorEvent::ActivityUnparseable {
                    repository: repository.to_owned(),
                    pull_request: id.value(),
                    value: error.value,
                    message: error.message,
                });
                return None;
            }
        };

        if !is_stale(last_activity, now, self.stale_after_days) {
            return None;
        }

        Some(StalePullRequest {
            repository: repository.to_owned(),
            pull_request,
            last_activity,
            inactive_days: elapsed_days(last_activity, now),
        })
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
