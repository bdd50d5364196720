//! Shared types for the Ember keyspace engine.
//!
//! This crate defines the vocabulary every other crate builds on: the
//! binary-safe [`Key`] and [`DbIndex`] newtypes, the error taxonomy at
//! the command boundary, and the [`Clock`] seam used to keep eviction
//! and TTL bookkeeping deterministic under test.

mod clock;
mod error;
mod key;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use key::{DbIndex, Key};

#[cfg(any(test, feature = "test-util"))]
pub use clock::FakeClock;
