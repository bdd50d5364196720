//! Coordination between command dispatch and the durability engine's
//! copy-on-write snapshot and log-rewrite paths.

mod gate;

pub use gate::{CopyGuard, GateTimeout, WriteGate, WriteGuard};
