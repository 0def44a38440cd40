//! Notification channels for stale pull request batches.
//!
//! Each channel implements [`Notifier`]. The schedule loop calls every
//! configured channel independently, so one failing channel never prevents
//! delivery through the others.

pub mod email;
pub mod summary;
pub mod teams;

use async_trait::async_trait;
use thiserror::Error;

use crate::review::batch::StaleBatch;

pub use email::{EmailNotifier, SmtpSettings, TlsMode};
pub use summary::NotificationSummary;
pub use teams::TeamsNotifier;

/// Errors raised while building or delivering a notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The channel is misconfigured.
    #[error("notifier configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// The message body could not be rendered.
    #[error("failed to render notification: {message}")]
    Render {
        /// Renderer error detail.
        message: String,
    },

    /// The message could not be handed to the remote service.
    #[error("failed to deliver notification: {message}")]
    Delivery {
        /// Transport error detail.
        message: String,
    },

    /// The remote service refused the message.
    #[error("notification rejected: {message}")]
    Rejected {
        /// Status and response detail.
        message: String,
    },
}

/// A channel that delivers stale pull request batches.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in events (for example `email`).
    fn channel(&self) -> &str;

    /// Delivers `batch`. An empty batch succeeds without any I/O.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when rendering or delivery fails.
    async fn notify(&self, batch: &StaleBatch) -> Result<(), NotifyError>;
}

/// Notifiers for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{Notifier, NotifyError};
    use crate::review::batch::StaleBatch;

    /// Records every batch it receives and optionally fails.
    #[derive(Debug)]
    pub struct RecordingNotifier {
        channel: String,
        failure: Option<NotifyError>,
        delivered: Mutex<Vec<StaleBatch>>,
    }

    impl RecordingNotifier {
        /// A notifier that always succeeds.
        #[must_use]
        pub fn succeeding(channel: &str) -> Self {
            Self {
                channel: channel.to_owned(),
                failure: None,
                delivered: Mutex::new(Vec::new()),
            }
        }

        /// A notifier that always fails with `error`.
        #[must_use]
        pub fn failing(channel: &str, error: NotifyError) -> Self {
            Self {
                channel: channel.to_owned(),
                failure: Some(error),
                delivered: Mutex::new(Vec::new()),
            }
        }

        /// Batches passed to [`Notifier::notify`], including failed attempts.
        ///
        /// # Panics
        ///
        /// Panics if the mutex is poisoned.
        #[must_use]
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        pub fn delivered(&self) -> Vec<StaleBatch> {
            self.delivered
                .lock()
                .expect("delivered mutex should be available")
                .clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn channel(&self) -> &str {
            &self.channel
        }

        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        async fn notify(&self, batch: &StaleBatch) -> Result<(), NotifyError> {
            self.delivered
                .lock()
                .expect("delivered mutex should be available")
                .push(batch.clone());
            self.failure.clone().map_or(Ok(()), Err)
        }
    }
}
