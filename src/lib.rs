//! Stalewatch library crate for stale pull request detection on Bitbucket
//! Server.
//!
//! The library polls the configured repositories, keeps the pull requests
//! that are neither excluded by title keywords nor fully approved, classifies
//! them by days since their last activity, and reports the stale ones through
//! email and Microsoft Teams. A persisted checkpoint limits notifications to
//! one per interval.

pub mod bitbucket;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod review;
pub mod schedule;
pub mod shutdown;
pub mod telemetry;

pub use bitbucket::{BitbucketError, BitbucketGateway, PullRequestSource, ServerLocator};
pub use config::StalewatchConfig;
pub use error::MonitorError;
pub use notify::{EmailNotifier, Notifier, NotifyError, TeamsNotifier};
pub use review::{StaleBatch, StaleDetector};
pub use schedule::{CheckpointStore, CycleOutcome, FileCheckpointStore, Monitor};
pub use telemetry::{EventSink, MonitorEvent, TracingEventSink};
