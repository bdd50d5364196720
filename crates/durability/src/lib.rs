//! Crash-recovery persistence for a running keyspace: a framed record
//! format shared by a point-in-time snapshot and an append-only log of
//! incremental mutations.
//!
//! This crate knows nothing about [`ember_storage::Store`] — it only
//! knows how to frame and persist [`record::LogRecord`]s. Walking a
//! live store into records (and replaying records back into one) is
//! `ember-engine`'s job, keeping the dependency graph one-directional.

pub mod aof;
pub mod config;
mod error;
pub mod format;
pub mod record;
pub mod snapshot;

pub use aof::{AppendLog, FsyncPolicy};
pub use config::DurabilityConfig;
pub use error::DurabilityError;
pub use record::{DurableValue, LogRecord};
pub use snapshot::{SnapshotReader, SnapshotWriter};
