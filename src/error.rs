//! Top-level error type for the monitor.

use thiserror::Error;

use crate::bitbucket::BitbucketError;
use crate::notify::NotifyError;
use crate::persistence::PersistenceError;

/// Errors that stop the monitor or prevent it from starting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// Configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// The notification checkpoint could not be read or written.
    #[error(transparent)]
    Checkpoint(#[from] PersistenceError),

    /// Bitbucket could not be reached or rejected the credentials at startup.
    #[error(transparent)]
    Bitbucket(#[from] BitbucketError),

    /// A notification channel could not be constructed.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The logging subscriber could not be installed.
    #[error("failed to initialise logging: {message}")]
    Logging {
        /// Error detail.
        message: String,
    },

    /// A local file could not be opened.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail.
        message: String,
    },
}
