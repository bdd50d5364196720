//! # Ember
//!
//! An in-memory, Redis-protocol-compatible keyspace engine: typed
//! containers (strings, lists, sets, hashes, sorted sets), TTL-driven
//! expiration, configurable eviction under a memory ceiling, and an
//! append-only-log-plus-snapshot durability substrate.
//!
//! # Quick start
//!
//! ```no_run
//! use ember::{Engine, Reply};
//! use ember_storage::StorageConfig;
//! use bytes::Bytes;
//!
//! let engine = Engine::in_memory(StorageConfig::default());
//! let mut conn = engine.embedded_connection();
//!
//! let reply = engine.dispatch(&mut conn, &[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap();
//! assert_eq!(reply, Reply::ok());
//!
//! let reply = engine.dispatch(&mut conn, &[Bytes::from_static(b"GET"), Bytes::from_static(b"k")]).unwrap();
//! assert_eq!(reply, Reply::Bulk(Bytes::from_static(b"v")));
//! ```
//!
//! # Architecture
//!
//! [`Engine`] is the entry point: it owns the keyspace store, the
//! command registry, the write-serialization gate, and (when opened
//! against a data directory rather than built in-memory) the
//! durability substrate. Everything dispatches through
//! [`Engine::dispatch`], which resolves a command, checks access,
//! mutates the store, and durably logs the result.
//!
//! Internal crates (`ember-storage`, `ember-concurrency`,
//! `ember-durability`) are not re-exported — this crate's public
//! surface is `ember-core`'s and `ember-engine`'s.

pub use ember_engine::*;
