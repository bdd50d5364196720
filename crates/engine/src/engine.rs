//! Top-level orchestration: wires the keyspace store, the write gate,
//! durability, the command registry, and the background ticker into a
//! single embeddable object. No singletons — every caller constructs
//! and owns its own `Engine`.

use crate::acl::{AclEnforcer, NoopAcl};
use crate::background::BackgroundTicker;
use crate::bridge;
use crate::config::EngineConfig;
use crate::connection::Connection;
use crate::pubsub::{NoopPubSub, PubSubSink};
use crate::registry::Registry;
use crate::reply::DispatchResult;
use bytes::Bytes;
use ember_concurrency::WriteGate;
use ember_core::{Clock, DbIndex, Error, Key, Result, SystemClock};
use ember_durability::{AppendLog, DurabilityConfig, SnapshotReader, SnapshotWriter};
use ember_storage::{MemoryGovernor, NullReplicationSink, ReplicationSink, Store, StorageConfig, WriteEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// Bundles durability's moving parts: the append-only log itself plus
/// the config governing rewrite thresholds and file locations.
struct Durability {
    config: DurabilityConfig,
    aof: Arc<AppendLog>,
    writes_since_rewrite: AtomicU64,
}

fn durability_err(err: ember_durability::DurabilityError) -> Error {
    Error::Internal(err.to_string())
}

pub struct Engine {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    gate: WriteGate,
    governor: Arc<MemoryGovernor>,
    durability: Option<Durability>,
    registry: Registry,
    acl: Box<dyn AclEnforcer>,
    pubsub: Box<dyn PubSubSink>,
    replication: Box<dyn ReplicationSink>,
    last_save_ms: AtomicU64,
    ticker: Option<BackgroundTicker>,
    ticker_handle: Option<JoinHandle<()>>,
}

impl Engine {
    /// Builds an in-memory-only engine: no data directory, no append-only
    /// log, no background ticker. Useful for tests and for an embedded
    /// cache use case that never needs to survive a restart.
    pub fn in_memory(storage: StorageConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let store = Arc::new(Store::new(storage.databases, Arc::clone(&clock)));
        let governor = Arc::new(MemoryGovernor::new(storage.max_memory, storage.eviction_policy));
        Engine {
            store,
            clock,
            gate: WriteGate::new(),
            governor,
            durability: None,
            registry: Registry::build(),
            acl: Box::new(NoopAcl),
            pubsub: Box::new(NoopPubSub),
            replication: Box::new(NullReplicationSink),
            last_save_ms: AtomicU64::new(0),
            ticker: None,
            ticker_handle: None,
        }
    }

    /// Opens (or creates) an engine backed by `data_dir`: reads
    /// `ember.toml` (writing the default if missing), replays the last
    /// snapshot plus any append-only log records written after it, and
    /// starts the background ticker.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let config_path = data_dir.join(crate::config::CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&config_path)?;
        let mut config = EngineConfig::from_file(&config_path)?;
        config.durability.data_dir = data_dir;

        let mut engine = Self::in_memory(config.storage.clone());

        let snapshot_path = config.durability.snapshot_path();
        let snapshot_records = SnapshotReader::read_all(&snapshot_path).map_err(durability_err)?;
        let now = engine.clock.now();
        info!(count = snapshot_records.len(), "replaying snapshot");
        bridge::apply_all(&engine.store, snapshot_records, now);

        let aof = Arc::new(AppendLog::open(config.durability.aof_path(), config.durability.fsync_policy).map_err(durability_err)?);
        let aof_records = AppendLog::replay(&config.durability.aof_path()).map_err(durability_err)?;
        info!(count = aof_records.len(), "replaying append-only log");
        // `engine.durability` is still `None` here, so the dispatch this
        // triggers for each `Command` record logs nothing and schedules
        // no rewrite — replay never re-appends what it's replaying.
        bridge::replay_aof(&engine, aof_records)?;

        engine.durability = Some(Durability { config: config.durability.clone(), aof: Arc::clone(&aof), writes_since_rewrite: AtomicU64::new(0) });

        let (ticker, handle) = BackgroundTicker::start(
            Arc::clone(&engine.store),
            Arc::clone(&engine.governor),
            Some(aof),
            std::time::Duration::from_millis(config.background_tick_ms),
        );
        engine.ticker = Some(ticker);
        engine.ticker_handle = Some(handle);

        Ok(engine)
    }

    pub fn new_connection(&self) -> Connection {
        Connection::new()
    }

    pub fn embedded_connection(&self) -> Connection {
        Connection::embedded()
    }

    pub fn dispatch(&self, connection: &mut Connection, args: &[Bytes]) -> DispatchResult {
        crate::dispatch::dispatch(self, connection, args)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn gate(&self) -> &WriteGate {
        &self.gate
    }

    pub(crate) fn governor(&self) -> &MemoryGovernor {
        &self.governor
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn acl(&self) -> &dyn AclEnforcer {
        self.acl.as_ref()
    }

    pub(crate) fn pubsub(&self) -> &dyn PubSubSink {
        self.pubsub.as_ref()
    }

    /// Appends a durability record carrying the original request frame
    /// (`raw_args`, command name included) that just ran, then forwards
    /// the write to the replication sink once per touched key. A no-op
    /// when the engine was built with [`Self::in_memory`]. `SWAPDB` is
    /// special-cased: rather than log itself, it triggers an immediate
    /// rewrite of the whole log from post-swap state, since the command
    /// itself has no meaningful per-database replay target once the
    /// swap has happened.
    pub(crate) fn record_write(&self, db: DbIndex, command: &'static str, touched_keys: &[&[u8]], raw_args: &[Bytes]) {
        for raw_key in touched_keys {
            let key = Key::from(Bytes::copy_from_slice(raw_key));
            self.replication.on_write(&WriteEvent { db, key, command: command.to_string() });
        }
        let Some(durability) = &self.durability else { return };
        if command == "SWAPDB" {
            if let Err(err) = self.bgrewriteaof() {
                tracing::warn!(%err, "background append-only log rewrite failed after SWAPDB");
            }
            return;
        }
        let record = ember_durability::LogRecord::Command { db: db.as_u16(), args: raw_args.to_vec() };
        if let Err(err) = durability.aof.append(&record) {
            tracing::warn!(%err, command, "failed to append durability record");
            return;
        }
        let total = durability.writes_since_rewrite.fetch_add(1, Ordering::Relaxed) + 1;
        if durability.config.rewrite_after_writes.is_some_and(|t| total >= t) {
            durability.writes_since_rewrite.store(0, Ordering::Relaxed);
            if let Err(err) = self.bgrewriteaof() {
                tracing::warn!(%err, "background append-only log rewrite failed");
            }
        }
    }

    /// `SAVE`/`BGSAVE`: writes a fresh snapshot of the entire keyspace.
    /// Enters the copy side of the write gate for the in-memory walk,
    /// then writes to disk outside the gate.
    pub fn save(&self) -> Result<()> {
        let Some(durability) = &self.durability else {
            return Ok(());
        };
        let now = self.clock.now();
        let records = {
            let _copy_guard = self.gate.enter_copy();
            bridge::snapshot_records(&self.store, now)
        };
        SnapshotWriter::write_all(&durability.config.snapshot_path(), records.into_iter()).map_err(durability_err)?;
        self.last_save_ms.store(ember_durability::snapshot::now_ms(), Ordering::Relaxed);
        Ok(())
    }

    pub fn last_save_unix_ms(&self) -> u64 {
        self.last_save_ms.load(Ordering::Relaxed)
    }

    /// `BGREWRITEAOF`: compacts the append-only log down to the current
    /// live state, discarding superseded mutations.
    pub fn bgrewriteaof(&self) -> Result<()> {
        let Some(durability) = &self.durability else {
            return Ok(());
        };
        let now = self.clock.now();
        let records = {
            let _copy_guard = self.gate.enter_copy();
            bridge::snapshot_records(&self.store, now)
        };
        AppendLog::rewrite(&durability.config.aof_path(), records.into_iter()).map_err(durability_err)?;
        Ok(())
    }

    pub fn shutdown(&self) {
        if let Some(ticker) = &self.ticker {
            ticker.shutdown();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.ticker_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_storage::StorageConfig;

    #[test]
    fn in_memory_engine_dispatches_set_and_get() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut conn = engine.embedded_connection();
        let set = engine.dispatch(&mut conn, &[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap();
        assert_eq!(set, crate::reply::Reply::ok());
        let get = engine.dispatch(&mut conn, &[Bytes::from_static(b"GET"), Bytes::from_static(b"k")]).unwrap();
        assert_eq!(get, crate::reply::Reply::Bulk(Bytes::from_static(b"v")));
    }

    #[test]
    fn open_then_reopen_recovers_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            engine.dispatch(&mut conn, &[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap();
            engine.save().unwrap();
        }
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            let got = engine.dispatch(&mut conn, &[Bytes::from_static(b"GET"), Bytes::from_static(b"k")]).unwrap();
            assert_eq!(got, crate::reply::Reply::Bulk(Bytes::from_static(b"v")));
        }
    }

    fn set(engine: &Engine, conn: &mut Connection, k: &str, v: &str) {
        engine.dispatch(conn, &[Bytes::from_static(b"SET"), Bytes::copy_from_slice(k.as_bytes()), Bytes::copy_from_slice(v.as_bytes())]).unwrap();
    }

    fn get(engine: &Engine, conn: &mut Connection, k: &str) -> crate::reply::Reply {
        engine.dispatch(conn, &[Bytes::from_static(b"GET"), Bytes::copy_from_slice(k.as_bytes())]).unwrap()
    }

    /// A rewrite followed by further writes and a restart must yield the
    /// union of pre- and post-rewrite state, with later writes to the
    /// same key winning.
    #[test]
    fn aof_rewrite_then_further_writes_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            for i in 1..=4 {
                set(&engine, &mut conn, &format!("k{i}"), &format!("w1-{i}"));
            }
            engine.bgrewriteaof().unwrap();

            set(&engine, &mut conn, "k3", "w2-3");
            set(&engine, &mut conn, "k4", "w2-4");
            set(&engine, &mut conn, "k5", "w2-5");
            set(&engine, &mut conn, "k6", "w2-6");
        }
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            assert_eq!(get(&engine, &mut conn, "k1"), crate::reply::Reply::Bulk(Bytes::from_static(b"w1-1")));
            assert_eq!(get(&engine, &mut conn, "k2"), crate::reply::Reply::Bulk(Bytes::from_static(b"w1-2")));
            assert_eq!(get(&engine, &mut conn, "k3"), crate::reply::Reply::Bulk(Bytes::from_static(b"w2-3")));
            assert_eq!(get(&engine, &mut conn, "k4"), crate::reply::Reply::Bulk(Bytes::from_static(b"w2-4")));
            assert_eq!(get(&engine, &mut conn, "k5"), crate::reply::Reply::Bulk(Bytes::from_static(b"w2-5")));
            assert_eq!(get(&engine, &mut conn, "k6"), crate::reply::Reply::Bulk(Bytes::from_static(b"w2-6")));
        }
    }

    /// `MSET`'s durability record must carry the original request, not a
    /// record per touched-index: a value that happens to look like an
    /// unrelated key (`k2`, used here as the value of `k1`) must never
    /// surface as a key of its own after replay.
    #[test]
    fn mset_value_that_looks_like_a_key_is_not_logged_as_one() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            set(&engine, &mut conn, "k2", "real-k2-value");
            engine.dispatch(&mut conn, &[Bytes::from_static(b"MSET"), Bytes::from_static(b"k1"), Bytes::from_static(b"k2"), Bytes::from_static(b"k3"), Bytes::from_static(b"v3")]).unwrap();
        }
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut conn = engine.embedded_connection();
            assert_eq!(get(&engine, &mut conn, "k1"), crate::reply::Reply::Bulk(Bytes::from_static(b"k2")));
            assert_eq!(get(&engine, &mut conn, "k2"), crate::reply::Reply::Bulk(Bytes::from_static(b"real-k2-value")));
            assert_eq!(get(&engine, &mut conn, "k3"), crate::reply::Reply::Bulk(Bytes::from_static(b"v3")));
        }
    }
}
