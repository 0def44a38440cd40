//! Error types for checkpoint persistence.

use thiserror::Error;

/// Errors returned while reading or writing the notification checkpoint, or
/// while migrating the `SQLite` database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// No database URL/path was provided.
    #[error("database URL is required (use --database-url or STALEWATCH_DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// The checkpoint table does not exist yet.
    #[error("database schema is not initialised (run with --migrate-db)")]
    SchemaNotInitialised,

    /// A checkpoint query failed.
    #[error("failed to read checkpoint: {message}")]
    QueryFailed {
        /// Error detail from the store.
        message: String,
    },

    /// A checkpoint write failed.
    #[error("failed to write checkpoint: {message}")]
    WriteFailed {
        /// Error detail from the store.
        message: String,
    },

    /// The stored checkpoint could not be decoded.
    #[error("checkpoint is corrupt: {message}")]
    Corrupt {
        /// Decoder error detail.
        message: String,
    },
}
