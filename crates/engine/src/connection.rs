//! Per-connection state tracked across a sequence of dispatched commands.
//!
//! There is always at least one connection: the embedded connection
//! created alongside the engine itself, used by callers that drive the
//! engine in-process rather than over a (currently out-of-scope) wire
//! listener.

use ember_core::DbIndex;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the always-present connection created with the engine.
/// Never relabeled by `SWAPDB`.
pub const EMBEDDED_CONNECTION_ID: u64 = 0;

#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    name: Option<String>,
    protocol_version: u8,
    database_index: DbIndex,
}

impl Connection {
    /// Creates the always-present embedded connection (id 0).
    pub fn embedded() -> Self {
        Connection { id: EMBEDDED_CONNECTION_ID, name: None, protocol_version: 2, database_index: DbIndex::default() }
    }

    /// Creates a new, independently addressable connection.
    pub fn new() -> Self {
        Connection {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            name: None,
            protocol_version: 2,
            database_index: DbIndex::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    pub fn set_protocol_version(&mut self, version: u8) {
        self.protocol_version = version;
    }

    pub fn database_index(&self) -> DbIndex {
        self.database_index
    }

    pub fn select(&mut self, index: DbIndex) {
        self.database_index = index;
    }

    /// `true` for the connection created alongside the engine, which
    /// `SWAPDB` never relabels even though it swaps the underlying data.
    pub fn is_embedded(&self) -> bool {
        self.id == EMBEDDED_CONNECTION_ID
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_connection_has_fixed_id() {
        let c = Connection::embedded();
        assert_eq!(c.id(), EMBEDDED_CONNECTION_ID);
        assert!(c.is_embedded());
    }

    #[test]
    fn new_connections_get_distinct_ids() {
        let a = Connection::new();
        let b = Connection::new();
        assert_ne!(a.id(), b.id());
        assert!(!a.is_embedded());
    }

    #[test]
    fn select_changes_database_index() {
        let mut c = Connection::new();
        c.select(DbIndex::new(3));
        assert_eq!(c.database_index(), DbIndex::new(3));
    }
}
