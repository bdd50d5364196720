//! Converts between live [`Store`] state and durable [`LogRecord`]s.
//!
//! `ember-durability` deliberately doesn't depend on `ember-storage`
//! (see that crate's module doc), so this glue lives here instead —
//! the one place in the workspace allowed to know about both.

use crate::connection::Connection;
use crate::engine::Engine;
use ember_core::{DbIndex, Key, Result};
use ember_durability::LogRecord;
use ember_storage::Store;
use std::time::Instant;

/// A full point-in-time dump: one `Set` record per live key across
/// every database, used for `SAVE`/`BGSAVE` and for append-only-log
/// rewrite/compaction.
pub fn snapshot_records(store: &Store, now: Instant) -> Vec<LogRecord> {
    let mut records = Vec::new();
    for i in 0..store.num_databases() {
        let db = DbIndex::new(i as u16);
        for key in store.keys(db) {
            if let Some(value) = store.get(db, &key) {
                let ttl_remaining = store.ttl(db, &key).flatten();
                records.push(LogRecord::set(db, key.into_bytes(), &value, ttl_remaining, now));
            }
        }
    }
    records
}

/// Replays one state-based record into `store` directly: the form a
/// log rewrite or a snapshot produces. Never used for a `Command`
/// record — those go through [`replay_aof`] instead, which re-runs the
/// original request through the dispatcher rather than poking the
/// store.
pub fn apply_record(store: &Store, record: LogRecord, now: Instant) {
    match record {
        LogRecord::Command { .. } => unreachable!("Command records replay through the dispatcher, not apply_record"),
        LogRecord::Set { db, key, value, ttl_remaining } => {
            let db = DbIndex::new(db);
            let k = Key::from(key);
            let value = value.into_value(now);
            match ttl_remaining {
                Some(d) => store.set_with_expiry(db, k, value, now + d),
                None => store.set(db, k, value),
            }
        }
        LogRecord::Delete { db, key } => {
            store.delete(DbIndex::new(db), &Key::from(key));
        }
        LogRecord::Expire { db, key, ttl_remaining } => {
            store.set_expiry(DbIndex::new(db), &Key::from(key), now + ttl_remaining);
        }
        LogRecord::Persist { db, key } => {
            store.persist(DbIndex::new(db), &Key::from(key));
        }
        LogRecord::FlushDb { db } => store.flush_db(DbIndex::new(db)),
        LogRecord::FlushAll => store.flush_all(),
    }
}

/// Replays `records` (state-based only, e.g. a snapshot) in order into
/// `store`.
pub fn apply_all(store: &Store, records: Vec<LogRecord>, now: Instant) {
    for record in records {
        apply_record(store, record, now);
    }
}

/// Replays append-only log records against `engine`: a `Command` record
/// is re-dispatched verbatim (so handlers, not this module, decide how
/// to apply it), while the state-based variants a log rewrite can also
/// produce are applied directly to the store. Durability logging is a
/// no-op for the duration of this call since `engine.open` hasn't yet
/// installed the append-only log handle, which is what suppresses
/// rewrites during replay.
pub fn replay_aof(engine: &Engine, records: Vec<LogRecord>) -> Result<()> {
    let now = engine.clock().now();
    for record in records {
        match record {
            LogRecord::Command { db, args } => {
                let mut conn = Connection::new();
                conn.select(DbIndex::new(db));
                engine.dispatch(&mut conn, &args)?;
            }
            other => apply_record(engine.store(), other, now),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ember_core::{Clock, SystemClock};
    use ember_primitives::Value;
    use std::sync::Arc;

    #[test]
    fn snapshot_then_apply_round_trips() {
        let clock = Arc::new(SystemClock::new());
        let store = Store::new(2, clock.clone());
        store.set(DbIndex::new(0), Key::from("a"), Value::Str(Bytes::from_static(b"1")));
        store.set(DbIndex::new(1), Key::from("b"), Value::Str(Bytes::from_static(b"2")));

        let records = snapshot_records(&store, clock.now());
        let restored = Store::new(2, clock.clone());
        apply_all(&restored, records, clock.now());

        assert_eq!(restored.get(DbIndex::new(0), &Key::from("a")).unwrap().as_str(), Some(&Bytes::from_static(b"1")));
        assert_eq!(restored.get(DbIndex::new(1), &Key::from("b")).unwrap().as_str(), Some(&Bytes::from_static(b"2")));
    }

    #[test]
    fn replay_aof_re_dispatches_command_records() {
        let engine = Engine::in_memory(ember_storage::StorageConfig::default());
        let records = vec![LogRecord::Command {
            db: 0,
            args: vec![Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")],
        }];
        replay_aof(&engine, records).unwrap();
        assert_eq!(engine.store().get(DbIndex::new(0), &Key::from("k")).unwrap().as_str(), Some(&Bytes::from_static(b"v")));
    }
}
