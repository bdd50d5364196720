//! Multi-database keyspace storage: the key→value maps, TTL sweeping,
//! and memory-bound eviction that sit beneath the command dispatcher.
//!
//! This crate owns "what is stored and for how long"; it knows nothing
//! about the wire protocol or command parsing above it, and nothing
//! about durability (snapshotting/append-only logging) below it.

pub mod config;
pub mod entry;
pub mod eviction;
pub mod governor;
pub mod keyspace;
pub mod replication;
pub mod ttl;

pub use config::StorageConfig;
pub use entry::KeyEntry;
pub use governor::MemoryGovernor;
pub use keyspace::Store;
pub use replication::{NullReplicationSink, ReplicationSink, WriteEvent};
