//! Monitor events and the sinks that record them.
//!
//! The review pipeline and the schedule loop never log through a global
//! logger. They receive an [`EventSink`] and record [`MonitorEvent`]s; the
//! binary installs a [`TracingEventSink`] that forwards events to `tracing`,
//! while tests capture them with a recording sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured event emitted while monitoring pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A check cycle began.
    CycleStarted {
        /// Number of repositories to scan.
        repositories: usize,
        /// Staleness threshold in days.
        stale_after_days: i64,
    },
    /// The checkpoint is younger than the interval, so no cycle ran.
    CycleSkipped {
        /// Time of the last notification dispatch.
        last_notified: DateTime<Utc>,
        /// Earliest time the next cycle may run.
        next_due: DateTime<Utc>,
    },
    /// Open pull requests of a repository were listed and filtered.
    RepositoryScanned {
        /// Repository slug.
        repository: String,
        /// Open pull requests returned by the server.
        total: usize,
        /// Pull requests left after keyword filtering.
        eligible: usize,
    },
    /// Listing the open pull requests of a repository failed.
    RepositoryFetchFailed {
        /// Repository slug.
        repository: String,
        /// Error detail.
        message: String,
    },
    /// Fetching the participants of a pull request failed.
    ParticipantsFetchFailed {
        /// Repository slug.
        repository: String,
        /// Pull request identifier.
        pull_request: u64,
        /// Error detail.
        message: String,
    },
    /// Fetching the activities of a pull request failed.
    CommentsFetchFailed {
        /// Repository slug.
        repository: String,
        /// Pull request identifier.
        pull_request: u64,
        /// Error detail.
        message: String,
    },
    /// A pull request carries no usable timestamps.
    ActivityUnresolved {
        /// Repository slug.
        repository: String,
        /// Pull request identifier.
        pull_request: u64,
    },
    /// A resolved activity timestamp could not be parsed back.
    ActivityUnparseable {
        /// Repository slug.
        repository: String,
        /// Pull request identifier.
        pull_request: u64,
        /// Offending timestamp text.
        value: String,
        /// Parser error detail.
        message: String,
    },
    /// A pull request was classified as stale.
    StalePullRequestFound {
        /// Repository slug.
        repository: String,
        /// Pull request identifier.
        pull_request: u64,
        /// Pull request title.
        title: String,
        /// Whole days since the last activity.
        inactive_days: i64,
    },
    /// The cycle found no stale pull requests; the checkpoint is unchanged.
    NothingToNotify,
    /// A notification channel delivered the batch.
    NotificationSent {
        /// Channel name.
        channel: String,
        /// Number of stale pull requests in the batch.
        stale_count: usize,
    },
    /// A notification channel failed to deliver the batch.
    NotificationFailed {
        /// Channel name.
        channel: String,
        /// Error detail.
        message: String,
    },
    /// The notification checkpoint was advanced.
    CheckpointRecorded {
        /// New checkpoint value.
        notified_at: DateTime<Utc>,
    },
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260301000000`).
        schema_version: String,
    },
}

/// A sink that can record monitor events.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: MonitorEvent);
}

/// Event sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: MonitorEvent) {}
}

/// Forwards events to `tracing` with structured fields.
///
/// Fetch and delivery failures are logged at `error`, unusable timestamps at
/// `warn`, and everything else at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::CycleStarted {
                repositories,
                stale_after_days,
            } => tracing::info!(repositories, stale_after_days, "starting stale PR check"),
            MonitorEvent::CycleSkipped {
                last_notified,
                next_due,
            } => tracing::info!(
                %last_notified,
                %next_due,
                "skipping check, last notification is within the interval"
            ),
            MonitorEvent::RepositoryScanned {
                repository,
                total,
                eligible,
            } => tracing::info!(%repository, total, eligible, "scanned open pull requests"),
            MonitorEvent::RepositoryFetchFailed {
                repository,
                message,
            } => tracing::error!(%repository, error = %message, "failed to list pull requests"),
            MonitorEvent::ParticipantsFetchFailed {
                repository,
                pull_request,
                message,
            } => tracing::error!(
                %repository,
                pull_request,
                error = %message,
                "failed to fetch participants"
            ),
            MonitorEvent::CommentsFetchFailed {
                repository,
                pull_request,
                message,
            } => tracing::error!(
                %repository,
                pull_request,
                error = %message,
                "failed to fetch activities"
            ),
            MonitorEvent::ActivityUnresolved {
                repository,
                pull_request,
            } => tracing::warn!(%repository, pull_request, "pull request has no usable timestamps"),
            MonitorEvent::ActivityUnparseable {
                repository,
                pull_request,
                value,
                message,
            } => tracing::warn!(
                %repository,
                pull_request,
                %value,
                error = %message,
                "could not parse last activity timestamp"
            ),
            MonitorEvent::StalePullRequestFound {
                repository,
                pull_request,
                title,
                inactive_days,
            } => tracing::info!(
                %repository,
                pull_request,
                %title,
                inactive_days,
                "found stale pull request"
            ),
            MonitorEvent::NothingToNotify => {
                tracing::info!("no stale pull requests, checkpoint unchanged");
            }
            MonitorEvent::NotificationSent {
                channel,
                stale_count,
            } => tracing::info!(%channel, stale_count, "notification sent"),
            MonitorEvent::NotificationFailed { channel, message } => {
                tracing::error!(%channel, error = %message, "notification failed");
            }
            MonitorEvent::CheckpointRecorded { notified_at } => {
                tracing::info!(%notified_at, "notification checkpoint recorded");
            }
            MonitorEvent::SchemaVersionRecorded { schema_version } => {
                tracing::info!(%schema_version, "database schema is up to date");
            }
        }
    }
}

/// Event sinks for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::Mutex;

    use super::{EventSink, MonitorEvent};

    /// Sink that keeps every recorded event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<MonitorEvent>>,
    }

    impl RecordingSink {
        /// Removes and returns the recorded events.
        ///
        /// # Panics
        ///
        /// Panics if the events mutex is poisoned.
        #[must_use]
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        pub fn take(&self) -> Vec<MonitorEvent> {
            self.events
                .lock()
                .expect("events mutex should be available")
                .drain(..)
                .collect()
        }

        /// Returns a copy of the recorded events without clearing them.
        ///
        /// # Panics
        ///
        /// Panics if the events mutex is poisoned.
        #[must_use]
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        pub fn snapshot(&self) -> Vec<MonitorEvent> {
            self.events
                .lock()
                .expect("events mutex should be available")
                .clone()
        }
    }

    impl EventSink for RecordingSink {
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        fn record(&self, event: MonitorEvent) {
            self.events
                .lock()
                .expect("events mutex should be available")
                .push(event);
        }
    }
}
