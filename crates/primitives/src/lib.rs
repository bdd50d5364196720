//! Typed value containers backing every key in the keyspace.
//!
//! This crate has no notion of a key, a database, or a TTL clock beyond
//! what [`hash::Hash`]'s per-field expiry needs — it is pure data
//! structures. Keyspace-wide concerns (whole-key expiry, memory
//! accounting across keys, eviction ordering) live in the storage crate.

pub mod hash;
pub mod list;
pub mod set;
pub mod sorted_set;
pub mod value;

pub use hash::Hash;
pub use list::List;
pub use set::Set;
pub use sorted_set::SortedSet;
pub use value::{Value, ValueType};
