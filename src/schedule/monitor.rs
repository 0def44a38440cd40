//! The long-running schedule loop.
//!
//! Each iteration reads the checkpoint, runs a cycle when the gate allows
//! it, dispatches a non-empty batch to every notifier, and advances the
//! checkpoint. The loop then waits for the interval or for cancellation.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::notify::Notifier;
use crate::review::StaleDetector;
use crate::review::batch::StaleBatch;
use crate::telemetry::{EventSink, MonitorEvent};

use super::checkpoint::CheckpointStore;
use super::gate::{next_due, should_run_cycle};

/// What one iteration of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The interval had not elapsed; nothing was fetched.
    Skipped,
    /// The cycle ran and found nothing stale; the checkpoint is unchanged.
    NothingToNotify,
    /// Stale pull requests were dispatched and the checkpoint advanced.
    Notified {
        /// Number of stale pull requests.
        stale: usize,
        /// Channels whose delivery failed.
        failed_channels: Vec<String>,
    },
}

/// Source of the current time for each iteration.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives detection cycles on a fixed interval.
pub struct Monitor {
    detector: StaleDetector,
    repositories: Vec<String>,
    notifiers: Vec<Arc<dyn Notifier>>,
    checkpoint: Arc<dyn CheckpointStore>,
    events: Arc<dyn EventSink>,
    interval: StdDuration,
    gate_interval: Duration,
    clock: Clock,
}

impl Monitor {
    /// Creates a monitor without notification channels.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Configuration`] when `interval` is zero or too
    /// large to represent.
    pub fn new(
        detector: StaleDetector,
        repositories: Vec<String>,
        checkpoint: Arc<dyn CheckpointStore>,
        events: Arc<dyn EventSink>,
        interval: StdDuration,
    ) -> Result<Self, MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::Configuration {
                message: "check interval must be greater than zero".to_owned(),
            });
        }
        let gate_interval =
            Duration::from_std(interval).map_err(|error| MonitorError::Configuration {
                message: format!("check interval is out of range: {error}"),
            })?;
        Ok(Self {
            detector,
            repositories,
            notifiers: Vec::new(),
            checkpoint,
            events,
            interval,
            gate_interval,
            clock: Arc::new(Utc::now),
        })
    }

    /// Adds a notification channel.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Replaces the wall clock used by [`Monitor::run`].
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Number of configured notification channels.
    #[must_use]
    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Runs iterations until `cancel` fires.
    ///
    /// Cancellation is observed before each iteration and during the wait
    /// between iterations; a started cycle always completes.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Checkpoint`] when the checkpoint cannot be
    /// read or written.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MonitorError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            self.run_once((self.clock)()).await?;

            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Runs one iteration at `now` without waiting afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Checkpoint`] when the checkpoint cannot be
    /// read or written.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<CycleOutcome, MonitorError> {
        let last_notified = self.checkpoint.last_notified()?;
        if !should_run_cycle(last_notified, now, self.gate_interval) {
            if let Some(last) = last_notified {
                self.events.record(MonitorEvent::CycleSkipped {
                    last_notified: last,
                    next_due: next_due(last, self.gate_interval),
                });
            }
            return Ok(CycleOutcome::Skipped);
        }

        let batch = self.detector.run_cycle(&self.repositories, now).await;
        if batch.is_empty() {
            self.events.record(MonitorEvent::NothingToNotify);
            return Ok(CycleOutcome::NothingToNotify);
        }

        let failed_channels = self.dispatch(&batch).await;

        self.checkpoint.record_notification(now)?;
        self.events
            .record(MonitorEvent::CheckpointRecorded { notified_at: now });

        Ok(CycleOutcome::Notified {
            stale: batch.len(),
            failed_channels,
        })
    }

    async fn dispatch(&self, batch: &StaleBatch) -> Vec<String> {
        let mut failed = Vec::new();
        for notifier in &self.notifiers {
            let channel = notifier.channel().to_owned();
            match notifier.notify(batch).await {
                Ok(()) => self.events.record(MonitorEvent::NotificationSent {
                    channel,
                    stale_count: batch.len(),
                }),
                Err(error) => {
                    self.events.record(MonitorEvent::NotificationFailed {
                        channel: channel.clone(),
                        message: error.to_string(),
                    });
                    failed.push(channel);
                }
            }
        }
        failed
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
