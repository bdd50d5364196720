//! The typed record written to both the snapshot file and the
//! append-only log.
//!
//! `Instant` is never serialized — TTLs cross the wire as the
//! remaining [`Duration`] as of the moment the record was built, and
//! are reattached to a fresh `Instant::now()` on load. A snapshot is
//! simply a sequence of `Set` records, one per live key. The append-only
//! log instead carries `Command` records: the original request frame
//! (command name plus arguments) for every standalone write, appended
//! verbatim after the handler succeeds, so replay re-runs the command
//! rather than re-deriving it from post-mutation state. `Delete`/
//! `Expire`/`Persist`/`FlushDb`/`FlushAll` remain for the state-based
//! records a log rewrite synthesizes from the live keyspace.

use bytes::Bytes;
use ember_core::DbIndex;
use ember_primitives::{Hash, List, Set, SortedSet, Value};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DurableValue {
    Str(Bytes),
    List(List),
    Set(Set),
    Hash(Vec<(Bytes, Bytes, Option<Duration>)>),
    SortedSet(Vec<(Bytes, f64)>),
}

impl DurableValue {
    pub fn from_value(value: &Value, now: Instant) -> Self {
        match value {
            Value::Str(s) => DurableValue::Str(s.clone()),
            Value::List(l) => DurableValue::List(l.clone()),
            Value::Set(s) => DurableValue::Set(s.clone()),
            Value::Hash(h) => DurableValue::Hash(h.to_plain(now)),
            Value::SortedSet(z) => DurableValue::SortedSet(z.snapshot()),
        }
    }

    pub fn into_value(self, now: Instant) -> Value {
        match self {
            DurableValue::Str(s) => Value::Str(s),
            DurableValue::List(l) => Value::List(l),
            DurableValue::Set(s) => Value::Set(s),
            DurableValue::Hash(fields) => Value::Hash(Hash::from_plain(fields, now)),
            DurableValue::SortedSet(pairs) => Value::SortedSet(SortedSet::from_pairs(pairs)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    /// The original request frame for one standalone write: the command
    /// name followed by its arguments, exactly as dispatched. This is
    /// the only variant the append-only log gets from an ordinary write;
    /// replaying it means re-running the command, not restoring a value.
    Command { db: u16, args: Vec<Bytes> },
    Set { db: u16, key: Bytes, value: DurableValue, ttl_remaining: Option<Duration> },
    Delete { db: u16, key: Bytes },
    Expire { db: u16, key: Bytes, ttl_remaining: Duration },
    Persist { db: u16, key: Bytes },
    FlushDb { db: u16 },
    FlushAll,
}

impl LogRecord {
    pub fn set(db: DbIndex, key: Bytes, value: &Value, ttl_remaining: Option<Duration>, now: Instant) -> Self {
        LogRecord::Set { db: db.as_u16(), key, value: DurableValue::from_value(value, now), ttl_remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_record_carries_the_full_argument_frame() {
        let record = LogRecord::Command { db: 0, args: vec![Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")] };
        match record {
            LogRecord::Command { args, .. } => assert_eq!(args, vec![Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]),
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn hash_ttl_survives_round_trip_through_duration() {
        let now = Instant::now();
        let mut h = Hash::new();
        h.set(Bytes::from_static(b"f"), Bytes::from_static(b"v"));
        h.expire_field(b"f", now + Duration::from_secs(10));
        let durable = DurableValue::from_value(&Value::Hash(h), now);
        let restored = durable.into_value(now);
        match restored {
            Value::Hash(h) => assert!(h.field_ttl(b"f", now).unwrap().is_some()),
            _ => panic!("expected hash"),
        }
    }

    #[test]
    fn sorted_set_round_trips() {
        let now = Instant::now();
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(1.0, Bytes::from_static(b"a"))],
            ember_primitives::sorted_set::UpdatePolicy::None,
            ember_primitives::sorted_set::Comparison::None,
            false,
            false,
        )
        .unwrap();
        let durable = DurableValue::from_value(&Value::SortedSet(z), now);
        match durable.into_value(now) {
            Value::SortedSet(z) => assert_eq!(z.score(b"a"), Some(1.0)),
            _ => panic!("expected zset"),
        }
    }
}
