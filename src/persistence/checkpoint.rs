//! Notification checkpoint backed by `SQLite`.
//!
//! The checkpoint lives in a single-row table created by the embedded
//! migrations. Reads against a database that was never migrated report
//! [`PersistenceError::SchemaNotInitialised`] rather than a generic query
//! failure so the binary can point the operator at `--migrate-db`.

use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;

use crate::schedule::checkpoint::CheckpointStore;

use super::PersistenceError;

const CHECKPOINT_TABLE: &str = "notification_checkpoint";

/// SQLite-backed [`CheckpointStore`].
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    database_url: String,
}

impl SqliteCheckpointStore {
    /// Create a store targeting the configured `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        let trimmed = database_url_string.trim();
        if trimmed.is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: trimmed.to_owned(),
        })
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })
    }

    fn checkpoint_table_exists(
        connection: &mut SqliteConnection,
    ) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            #[expect(dead_code, reason = "only row presence matters")]
            one: i64,
        }

        let exists: Option<Row> = sql_query(
            "SELECT 1 AS one FROM sqlite_master WHERE type = 'table' AND name = ? LIMIT 1;",
        )
        .bind::<Text, _>(CHECKPOINT_TABLE)
        .get_result(connection)
        .optional()?;

        Ok(exists.is_some())
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        match Self::checkpoint_table_exists(connection) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn last_notified(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            notified_at_unix_ms: i64,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> = sql_query(
            "SELECT notified_at_unix_ms FROM notification_checkpoint WHERE id = 1 LIMIT 1;",
        )
        .get_result(&mut connection)
        .optional()
        .map_err(|error| {
            Self::map_error_with_schema_check(&mut connection, &error, |message| {
                PersistenceError::QueryFailed { message }
            })
        })?;

        let Some(row) = result else {
            return Ok(None);
        };
        DateTime::from_timestamp_millis(row.notified_at_unix_ms)
            .map(Some)
            .ok_or_else(|| PersistenceError::Corrupt {
                message: format!(
                    "checkpoint value {} is out of range",
                    row.notified_at_unix_ms
                ),
            })
    }

    fn record_notification(&self, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO notification_checkpoint (id, notified_at_unix_ms) \
             VALUES (1, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               notified_at_unix_ms = excluded.notified_at_unix_ms, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<BigInt, _>(at.timestamp_millis())
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| {
            Self::map_error_with_schema_check(&mut connection, &error, |message| {
                PersistenceError::WriteFailed { message }
            })
        })
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
