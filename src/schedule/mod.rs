//! Scheduling of check cycles.
//!
//! A [`Monitor`] repeatedly consults the notification checkpoint, runs the
//! detection cycle when the interval has elapsed, fans the batch out to the
//! notification channels, and waits for the next iteration or cancellation.

pub mod checkpoint;
pub mod gate;
pub mod monitor;

pub use checkpoint::{CheckpointStore, DEFAULT_CHECKPOINT_PATH, FileCheckpointStore};
pub use gate::{next_due, should_run_cycle};
pub use monitor::{Clock, CycleOutcome, Monitor};
