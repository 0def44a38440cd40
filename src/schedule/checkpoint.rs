//! The notification checkpoint and its file-backed store.
//!
//! The checkpoint is the time of the last notification dispatch. An absent
//! checkpoint means "never notified" and always lets the next cycle run.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};

use crate::persistence::PersistenceError;

/// Default location of the file checkpoint.
pub const DEFAULT_CHECKPOINT_PATH: &str = "tmp/last_notification.json";

/// Persists the time of the last notification dispatch.
#[cfg_attr(test, mockall::automock)]
pub trait CheckpointStore: Send + Sync {
    /// Reads the checkpoint; `None` when nothing was ever recorded.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the stored value cannot be read or
    /// decoded.
    fn last_notified(&self) -> Result<Option<DateTime<Utc>>, PersistenceError>;

    /// Replaces the checkpoint with `at`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the value cannot be written.
    fn record_notification(&self, at: DateTime<Utc>) -> Result<(), PersistenceError>;
}

/// Checkpoint stored as a JSON-encoded RFC 3339 timestamp in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheckpointStore {
    path: Utf8PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store for `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn file_name(&self) -> Result<&str, PersistenceError> {
        self.path
            .file_name()
            .ok_or_else(|| PersistenceError::QueryFailed {
                message: format!("checkpoint path '{}' has no file name", self.path),
            })
    }

    fn parent(&self) -> &Utf8Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."))
    }

    /// Opens the parent directory, creating it (and its ancestors) first.
    fn create_parent(&self) -> Result<Dir, PersistenceError> {
        let parent = self.parent();
        let (base, relative) = if parent.is_absolute() {
            let relative = parent
                .strip_prefix("/")
                .map_err(|_| PersistenceError::WriteFailed {
                    message: format!("failed to normalise checkpoint directory '{parent}'"),
                })?;
            (Self::open_ambient("/")?, relative)
        } else {
            (Self::open_ambient(".")?, parent)
        };

        if relative.as_str().is_empty() || relative == Utf8Path::new(".") {
            return Ok(base);
        }
        base.create_dir_all(relative)
            .map_err(|error| PersistenceError::WriteFailed {
                message: format!("failed to create checkpoint directory '{parent}': {error}"),
            })?;
        base.open_dir(relative)
            .map_err(|error| PersistenceError::WriteFailed {
                message: format!("failed to open checkpoint directory '{parent}': {error}"),
            })
    }

    fn open_ambient(path: &str) -> Result<Dir, PersistenceError> {
        Dir::open_ambient_dir(path, ambient_authority()).map_err(|error| {
            PersistenceError::WriteFailed {
                message: format!("failed to open directory '{path}': {error}"),
            }
        })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn last_notified(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let file_name = self.file_name()?;
        let parent = self.parent();
        let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(PersistenceError::QueryFailed {
                    message: format!("failed to open checkpoint directory '{parent}': {error}"),
                });
            }
        };

        let contents = match dir.read_to_string(file_name) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(PersistenceError::QueryFailed {
                    message: format!("failed to read checkpoint '{}': {error}", self.path),
                });
            }
        };

        serde_json::from_str::<DateTime<Utc>>(contents.trim())
            .map(Some)
            .map_err(|error| PersistenceError::Corrupt {
                message: format!("'{}': {error}", self.path),
            })
    }

    fn record_notification(&self, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let file_name = self.file_name()?;
        let encoded = serde_json::to_string(&at).map_err(|error| PersistenceError::WriteFailed {
            message: format!("failed to encode checkpoint: {error}"),
        })?;

        let dir = self.create_parent()?;
        dir.write(file_name, encoded.as_bytes())
            .map_err(|error| PersistenceError::WriteFailed {
                message: format!("failed to write checkpoint '{}': {error}", self.path),
            })
    }
}

/// In-memory checkpoint stores for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::CheckpointStore;
    use crate::persistence::PersistenceError;

    /// Checkpoint kept in memory, optionally seeded.
    #[derive(Debug, Default)]
    pub struct InMemoryCheckpointStore {
        value: Mutex<Option<DateTime<Utc>>>,
        writes: Mutex<Vec<DateTime<Utc>>>,
    }

    impl InMemoryCheckpointStore {
        /// Creates a store holding `value`.
        #[must_use]
        pub fn with_value(value: Option<DateTime<Utc>>) -> Self {
            Self {
                value: Mutex::new(value),
                writes: Mutex::new(Vec::new()),
            }
        }

        /// Current checkpoint value.
        ///
        /// # Panics
        ///
        /// Panics if the mutex is poisoned.
        #[must_use]
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        pub fn current(&self) -> Option<DateTime<Utc>> {
            *self.value.lock().expect("checkpoint mutex should be available")
        }

        /// Every value written through [`CheckpointStore::record_notification`].
        ///
        /// # Panics
        ///
        /// Panics if the mutex is poisoned.
        #[must_use]
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        pub fn writes(&self) -> Vec<DateTime<Utc>> {
            self.writes
                .lock()
                .expect("writes mutex should be available")
                .clone()
        }
    }

    impl CheckpointStore for InMemoryCheckpointStore {
        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        fn last_notified(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
            Ok(*self.value.lock().expect("checkpoint mutex should be available"))
        }

        #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
        fn record_notification(&self, at: DateTime<Utc>) -> Result<(), PersistenceError> {
            *self.value.lock().expect("checkpoint mutex should be available") = Some(at);
            self.writes
                .lock()
                .expect("writes mutex should be available")
                .push(at);
            Ok(())
        }
    }
}
