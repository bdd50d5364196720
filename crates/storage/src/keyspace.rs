//! The multi-database keyspace: one key→value map per logical database
//! index, all guarded by a single process-wide read/write lock. Reads
//! take the shared variant, writes the exclusive variant; there is
//! exactly one lock for the whole store, not one per database, so a
//! write to database 3 does serialize against a read of database 0 —
//! matching the single-lock ordering guarantee the rest of the engine
//! (the write gate, the snapshot copier) is built around.

use crate::entry::KeyEntry;
use crate::eviction::EvictionTrackers;
use crate::ttl::{active_expire_cycle, SweepStats, VolatileKeys};
use ember_core::{Clock, DbIndex, Key};
use ember_primitives::Value;
use indexmap::IndexMap;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::seq::IteratorRandom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// How many keys to sample per round of the active expiration cycle.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

#[derive(Default)]
struct Database {
    entries: IndexMap<Key, KeyEntry>,
    volatile: VolatileKeys,
}

impl Database {
    fn lazily_expired(&self, key: &Key, now: Instant) -> bool {
        self.entries.get(key).is_some_and(|e| e.is_expired(now))
    }
}

/// The full set of logical databases plus shared eviction bookkeeping
/// and an approximate running memory total. `databases` is the single
/// process-wide lock: every accessor goes through [`Self::db_read`] or
/// [`Self::db_write`], which lock the whole vector and hand back a
/// guard mapped down to the one database addressed.
pub struct Store {
    databases: RwLock<Vec<Database>>,
    num_databases: usize,
    clock: Arc<dyn Clock>,
    eviction: EvictionTrackers,
    used_memory: AtomicUsize,
}

impl Store {
    pub fn new(num_databases: u16, clock: Arc<dyn Clock>) -> Self {
        let count = num_databases.max(1) as usize;
        let databases = (0..count).map(|_| Database::default()).collect();
        Store { databases: RwLock::new(databases), num_databases: count, clock, eviction: EvictionTrackers::new(), used_memory: AtomicUsize::new(0) }
    }

    fn db_write(&self, index: DbIndex) -> MappedRwLockWriteGuard<'_, Database> {
        let n = self.num_databases;
        RwLockWriteGuard::map(self.databases.write(), move |dbs| &mut dbs[index.as_usize() % n])
    }

    fn db_read(&self, index: DbIndex) -> MappedRwLockReadGuard<'_, Database> {
        let n = self.num_databases;
        RwLockReadGuard::map(self.databases.read(), move |dbs| &dbs[index.as_usize() % n])
    }

    pub fn num_databases(&self) -> usize {
        self.num_databases
    }

    pub fn used_memory(&self) -> usize {
        self.used_memory.load(Ordering::Relaxed)
    }

    fn track_grow(&self, bytes: usize) {
        self.used_memory.fetch_add(bytes, Ordering::Relaxed);
    }

    fn track_shrink(&self, bytes: usize) {
        self.used_memory.fetch_sub(bytes.min(self.used_memory.load(Ordering::Relaxed)), Ordering::Relaxed);
    }

    /// Reads a value, applying lazy expiration and recording the access
    /// for the LRU/LFU trackers. Returns `None` for an absent or
    /// logically expired key.
    pub fn get(&self, db: DbIndex, key: &Key) -> Option<Value> {
        let now = self.clock.now();
        let mut guard = self.db_write(db);
        if guard.lazily_expired(key, now) {
            self.remove_expired(&mut guard, key);
            return None;
        }
        let tick = self.clock.tick();
        let entry = guard.entries.get_mut(key)?;
        entry.touch(tick);
        self.eviction.lru.update(key.clone(), tick);
        self.eviction.lfu.update(key.clone(), entry.lfu.counter);
        Some(entry.value.clone())
    }

    /// Runs `f` against the live, mutable value for `key` if present and
    /// not expired, without cloning it out. Used by in-place mutators
    /// (list pushes, hash field sets, sorted-set updates).
    pub fn with_value_mut<T>(&self, db: DbIndex, key: &Key, f: impl FnOnce(&mut Value) -> T) -> Option<T> {
        let now = self.clock.now();
        let mut guard = self.db_write(db);
        if guard.lazily_expired(key, now) {
            self.remove_expired(&mut guard, key);
            return None;
        }
        let tick = self.clock.tick();
        let entry = guard.entries.get_mut(key)?;
        entry.touch(tick);
        let result = f(&mut entry.value);
        Some(result)
    }

    /// Unconditionally stores `value` at `key`, clearing any prior TTL
    /// (callers that must preserve TTL use `set_keep_ttl`).
    pub fn set(&self, db: DbIndex, key: Key, value: Value) {
        self.set_impl(db, key, value, None, false);
    }

    pub fn set_keep_ttl(&self, db: DbIndex, key: Key, value: Value) {
        self.set_impl(db, key, value, None, true);
    }

    pub fn set_with_expiry(&self, db: DbIndex, key: Key, value: Value, expires_at: Instant) {
        self.set_impl(db, key, value, Some(expires_at), false);
    }

    fn set_impl(&self, db: DbIndex, key: Key, value: Value, expires_at: Option<Instant>, keep_ttl: bool) {
        let tick = self.clock.tick();
        let new_size = value.memory_usage();
        let mut guard = self.db_write(db);
        let old_size = guard.entries.get(&key).map(|e| e.memory_usage()).unwrap_or(0);
        let mut entry = KeyEntry::new(value, tick);
        entry.expires_at = if keep_ttl { guard.entries.get(&key).and_then(|e| e.expires_at) } else { expires_at };
        match entry.expires_at {
            Some(_) => guard.volatile.insert(key.clone()),
            None => guard.volatile.remove(&key),
        }
        guard.entries.insert(key.clone(), entry);
        drop(guard);
        self.eviction.lru.update(key.clone(), tick);
        self.eviction.lfu.update(key, tick as u8);
        if new_size > old_size {
            self.track_grow(new_size - old_size);
        } else {
            self.track_shrink(old_size - new_size);
        }
    }

    pub fn exists(&self, db: DbIndex, key: &Key) -> bool {
        self.get(db, key).is_some()
    }

    pub fn delete(&self, db: DbIndex, key: &Key) -> bool {
        let mut guard = self.db_write(db);
        self.remove_expired_unconditionally(&mut guard, key)
    }

    fn remove_expired(&self, guard: &mut Database, key: &Key) {
        self.remove_expired_unconditionally(guard, key);
    }

    fn remove_expired_unconditionally(&self, guard: &mut Database, key: &Key) -> bool {
        guard.volatile.remove(key);
        match guard.entries.shift_remove(key) {
            Some(entry) => {
                self.track_shrink(entry.memory_usage());
                self.eviction.delete(key);
                true
            }
            None => false,
        }
    }

    pub fn set_expiry(&self, db: DbIndex, key: &Key, at: Instant) -> bool {
        let mut guard = self.db_write(db);
        if guard.lazily_expired(key, self.clock.now()) {
            self.remove_expired(&mut guard, key);
            return false;
        }
        match guard.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(at);
                guard.volatile.insert(key.clone());
                true
            }
            None => false,
        }
    }

    pub fn persist(&self, db: DbIndex, key: &Key) -> bool {
        let mut guard = self.db_write(db);
        match guard.entries.get_mut(key) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                guard.volatile.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn ttl(&self, db: DbIndex, key: &Key) -> Option<Option<std::time::Duration>> {
        let now = self.clock.now();
        let guard = self.db_read(db);
        let entry = guard.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(entry.expires_at.map(|at| at.saturating_duration_since(now)))
    }

    pub fn key_type(&self, db: DbIndex, key: &Key) -> Option<ember_primitives::ValueType> {
        self.get(db, key).map(|v| v.type_tag())
    }

    pub fn dbsize(&self, db: DbIndex) -> usize {
        self.db_read(db).entries.len()
    }

    pub fn flush_db(&self, db: DbIndex) {
        let mut guard = self.db_write(db);
        let freed: usize = guard.entries.values().map(|e| e.memory_usage()).sum();
        guard.entries.clear();
        guard.volatile = VolatileKeys::new();
        self.track_shrink(freed);
    }

    pub fn flush_all(&self) {
        for i in 0..self.num_databases {
            self.flush_db(DbIndex::new(i as u16));
        }
        self.eviction.flush();
    }

    pub fn swap_databases(&self, a: DbIndex, b: DbIndex) {
        if a == b {
            return;
        }
        let n = self.num_databases;
        let mut guard = self.databases.write();
        guard.swap(a.as_usize() % n, b.as_usize() % n);
    }

    pub fn random_key(&self, db: DbIndex) -> Option<Key> {
        let guard = self.db_read(db);
        guard.entries.keys().choose(&mut rand::thread_rng()).cloned()
    }

    pub fn keys(&self, db: DbIndex) -> Vec<Key> {
        let now = self.clock.now();
        self.db_read(db).entries.iter().filter(|(_, e)| !e.is_expired(now)).map(|(k, _)| k.clone()).collect()
    }

    pub fn object_idle_time(&self, db: DbIndex, key: &Key) -> Option<std::time::Duration> {
        let current_tick = self.clock.tick();
        let guard = self.db_read(db);
        let entry = guard.entries.get(key)?;
        let idle_ticks = current_tick.saturating_sub(entry.last_accessed_tick);
        Some(std::time::Duration::from_millis(idle_ticks))
    }

    pub fn object_freq(&self, db: DbIndex, key: &Key) -> Option<u8> {
        let guard = self.db_read(db);
        guard.entries.get(key).map(|e| e.lfu.counter)
    }

    /// Runs one active-expiration sweep over every database, under a
    /// single acquisition of the store-wide lock.
    pub fn active_expire_all(&self) -> Vec<SweepStats> {
        let now = self.clock.now();
        let mut guard = self.databases.write();
        guard
            .iter_mut()
            .map(|db| {
                let entries = &db.entries;
                let expired_check = |k: &Key| entries.get(k).is_some_and(|e| e.is_expired(now));
                let mut removed = Vec::new();
                let stats = {
                    let volatile = &mut db.volatile;
                    active_expire_cycle(volatile, DEFAULT_SAMPLE_SIZE, expired_check, |k| removed.push(k.clone()))
                };
                for key in &removed {
                    if let Some(entry) = db.entries.shift_remove(key) {
                        self.track_shrink(entry.memory_usage());
                        self.eviction.delete(key);
                    }
                }
                stats
            })
            .collect()
    }

    /// Sweeps expired hash fields across every hash-typed key, returning
    /// the total number of fields removed. One acquisition of the
    /// store-wide lock covers every database.
    pub fn sweep_hash_fields(&self) -> usize {
        let mut total = 0;
        let mut guard = self.databases.write();
        for db in guard.iter_mut() {
            for entry in db.entries.values_mut() {
                if let Value::Hash(h) = &mut entry.value {
                    total += h.sweep_expired_fields(self.clock.as_ref());
                }
            }
        }
        total
    }

    pub fn eviction(&self) -> &EvictionTrackers {
        &self.eviction
    }

    /// Iterates `(key, expires_at)` for every live key in `db`, for the
    /// memory governor's random/TTL eviction candidate pools.
    pub fn snapshot_expiries(&self, db: DbIndex, volatile_only: bool) -> Vec<(Key, Option<Instant>)> {
        let guard = self.db_read(db);
        guard
            .entries
            .iter()
            .filter(|(_, e)| !volatile_only || e.expires_at.is_some())
            .map(|(k, e)| (k.clone(), e.expires_at))
            .collect()
    }

    /// Same as [`Self::snapshot_expiries`] but across every database,
    /// since the LRU/LFU trackers and the memory governor's random/TTL
    /// fallback both operate on a single, store-wide eviction pool.
    pub fn snapshot_expiries_all(&self, volatile_only: bool) -> Vec<(Key, Option<Instant>)> {
        (0..self.num_databases)
            .flat_map(|i| self.snapshot_expiries(DbIndex::new(i as u16), volatile_only))
            .collect()
    }

    /// Deletes `key` from whichever database it lives in. Used by the
    /// memory governor, whose eviction trackers are store-wide rather
    /// than scoped to one database.
    pub fn delete_anywhere(&self, key: &Key) -> bool {
        for i in 0..self.num_databases {
            if self.delete(DbIndex::new(i as u16), key) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::SystemClock;
    use bytes::Bytes;

    fn store() -> Store {
        Store::new(4, Arc::new(SystemClock::new()))
    }

    #[test]
    fn set_then_get_roundtrips() {
        let s = store();
        let db = DbIndex::new(0);
        s.set(db, Key::from("k"), Value::Str(Bytes::from_static(b"v")));
        let got = s.get(db, &Key::from("k")).unwrap();
        assert_eq!(got.as_str(), Some(&Bytes::from_static(b"v")));
    }

    #[test]
    fn expired_key_reads_as_absent() {
        let s = store();
        let db = DbIndex::new(0);
        let key = Key::from("k");
        s.set(db, key.clone(), Value::Str(Bytes::from_static(b"v")));
        s.set_expiry(db, &key, Instant::now() - std::time::Duration::from_secs(1));
        assert!(s.get(db, &key).is_none());
        assert_eq!(s.dbsize(db), 0);
    }

    #[test]
    fn databases_are_independent() {
        let s = store();
        s.set(DbIndex::new(0), Key::from("k"), Value::Str(Bytes::from_static(b"a")));
        assert!(s.get(DbIndex::new(1), &Key::from("k")).is_none());
    }

    #[test]
    fn swap_databases_exchanges_contents() {
        let s = store();
        s.set(DbIndex::new(0), Key::from("only-in-0"), Value::Str(Bytes::from_static(b"x")));
        s.swap_databases(DbIndex::new(0), DbIndex::new(1));
        assert!(s.get(DbIndex::new(0), &Key::from("only-in-0")).is_none());
        assert!(s.get(DbIndex::new(1), &Key::from("only-in-0")).is_some());
    }

    #[test]
    fn flush_db_only_clears_target() {
        let s = store();
        s.set(DbIndex::new(0), Key::from("a"), Value::Str(Bytes::from_static(b"1")));
        s.set(DbIndex::new(1), Key::from("b"), Value::Str(Bytes::from_static(b"2")));
        s.flush_db(DbIndex::new(0));
        assert_eq!(s.dbsize(DbIndex::new(0)), 0);
        assert_eq!(s.dbsize(DbIndex::new(1)), 1);
    }

    #[test]
    fn delete_returns_whether_present() {
        let s = store();
        let db = DbIndex::new(0);
        assert!(!s.delete(db, &Key::from("ghost")));
        s.set(db, Key::from("k"), Value::Str(Bytes::from_static(b"v")));
        assert!(s.delete(db, &Key::from("k")));
        assert!(!s.delete(db, &Key::from("k")));
    }

    #[test]
    fn persist_clears_ttl() {
        let s = store();
        let db = DbIndex::new(0);
        let key = Key::from("k");
        s.set(db, key.clone(), Value::Str(Bytes::from_static(b"v")));
        s.set_expiry(db, &key, Instant::now() + std::time::Duration::from_secs(60));
        assert!(s.persist(db, &key));
        assert_eq!(s.ttl(db, &key), Some(None));
    }

    /// `used_memory()` tracks exactly the surviving entries: sets,
    /// overwrites, and deletes across several keys all keep it in sync
    /// with a hand-summed total.
    #[test]
    fn used_memory_matches_sum_of_surviving_entries() {
        let s = store();
        let db = DbIndex::new(0);

        s.set(db, Key::from("a"), Value::Str(Bytes::from(vec![0u8; 10])));
        s.set(db, Key::from("b"), Value::Str(Bytes::from(vec![0u8; 20])));
        s.set(db, Key::from("c"), Value::Str(Bytes::from(vec![0u8; 30])));
        let expected: usize = [Key::from("a"), Key::from("b"), Key::from("c")]
            .iter()
            .map(|k| {
                let mut guard = s.db_write(db);
                guard.entries.get_mut(k).unwrap().memory_usage()
            })
            .sum();
        assert_eq!(s.used_memory(), expected);

        s.delete(db, &Key::from("b"));
        let expected_after_delete: usize = [Key::from("a"), Key::from("c")]
            .iter()
            .map(|k| {
                let mut guard = s.db_write(db);
                guard.entries.get_mut(k).unwrap().memory_usage()
            })
            .sum();
        assert_eq!(s.used_memory(), expected_after_delete);

        s.set(db, Key::from("a"), Value::Str(Bytes::from(vec![0u8; 5])));
        let expected_after_overwrite: usize = {
            let mut guard = s.db_write(db);
            guard.entries.get_mut(&Key::from("a")).unwrap().memory_usage() + guard.entries.get_mut(&Key::from("c")).unwrap().memory_usage()
        };
        assert_eq!(s.used_memory(), expected_after_overwrite);
    }
}
