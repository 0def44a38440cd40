//! Checkpoint persistence and database migrations.
//!
//! When a database URL is configured the notification checkpoint is kept in
//! a local `SQLite` database instead of a JSON file. The schema is managed
//! with Diesel migrations embedded in the binary.

mod checkpoint;
mod error;
mod migrator;

pub use checkpoint::SqliteCheckpointStore;
pub use error::PersistenceError;
pub use migrator::{CURRENT_SCHEMA_VERSION, MIGRATIONS, SchemaVersion, migrate_database};
