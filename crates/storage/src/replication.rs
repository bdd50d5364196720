//! Replication is out of scope beyond this seam: a write-path hook that
//! a real implementation would use to ship mutations to replicas or a
//! cluster leader. The engine calls [`ReplicationSink::on_write`] after
//! every successful mutation and otherwise never refers to replication.

use ember_core::{DbIndex, Key};

/// A single logical mutation, emitted for whatever replication transport
/// is plugged in. `command` and `args` are the verbatim dispatched
/// command, which is enough for a simple command-replication scheme.
#[derive(Debug, Clone)]
pub struct WriteEvent {
    pub db: DbIndex,
    pub key: Key,
    pub command: String,
}

pub trait ReplicationSink: Send + Sync {
    fn on_write(&self, event: &WriteEvent);
}

/// Default sink: replication is not wired up, so writes are dropped.
#[derive(Debug, Default)]
pub struct NullReplicationSink;

impl ReplicationSink for NullReplicationSink {
    fn on_write(&self, _event: &WriteEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_events_without_panicking() {
        let sink = NullReplicationSink;
        sink.on_write(&WriteEvent { db: DbIndex::new(0), key: Key::from("k"), command: "SET".into() });
    }
}
