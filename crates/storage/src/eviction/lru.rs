//! Least-recently-used tracking for `allkeys-lru` / `volatile-lru`.
//!
//! A binary heap ordered by logical access tick gives `O(log n)` updates
//! and eviction candidate selection without walking every key. Heap
//! entries are not removed on update or delete — they go stale and are
//! skipped lazily on `pop()` — so `current` is the source of truth for
//! "is this key still tracked" and `len()`.

use ember_core::Key;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Default)]
pub struct LruTracker {
    heap: Mutex<BinaryHeap<Reverse<(u64, Key)>>>,
    current: Mutex<HashMap<Key, u64>>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `key` was accessed at logical tick `tick`.
    pub fn update(&self, key: Key, tick: u64) {
        self.current.lock().insert(key.clone(), tick);
        self.heap.lock().push(Reverse((tick, key)));
    }

    pub fn delete(&self, key: &Key) {
        self.current.lock().remove(key);
    }

    pub fn get_time(&self, key: &Key) -> Option<u64> {
        self.current.lock().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.current.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush(&self) {
        self.heap.lock().clear();
        self.current.lock().clear();
    }

    /// Removes and returns the least-recently-used tracked key, skipping
    /// stale heap entries whose tick no longer matches `current`.
    pub fn pop(&self) -> Option<Key> {
        let mut heap = self.heap.lock();
        let mut current = self.current.lock();
        loop {
            let Reverse((tick, key)) = heap.pop()?;
            match current.get(&key) {
                Some(&live_tick) if live_tick == tick => {
                    current.remove(&key);
                    return Some(key);
                }
                _ => continue,
            }
        }
    }

    /// Like [`pop`](Self::pop) but restricted to `candidates` — used by
    /// `volatile-lru`, which must never evict a key with no TTL.
    pub fn pop_among<'a>(&self, candidates: impl Iterator<Item = &'a Key>) -> Option<Key> {
        let current = self.current.lock();
        let picked = candidates.filter_map(|k| current.get(k).map(|&tick| (tick, k.clone()))).min_by_key(|(tick, _)| *tick).map(|(_, k)| k);
        drop(current);
        if let Some(key) = &picked {
            self.current.lock().remove(key);
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_oldest_first() {
        let t = LruTracker::new();
        t.update(Key::from("a"), 1);
        t.update(Key::from("b"), 2);
        t.update(Key::from("c"), 3);
        assert_eq!(t.pop(), Some(Key::from("a")));
        assert_eq!(t.pop(), Some(Key::from("b")));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn update_replaces_ordering() {
        let t = LruTracker::new();
        t.update(Key::from("a"), 1);
        t.update(Key::from("b"), 2);
        t.update(Key::from("a"), 10);
        assert_eq!(t.pop(), Some(Key::from("b")));
        assert_eq!(t.pop(), Some(Key::from("a")));
    }

    #[test]
    fn delete_removes_from_tracking() {
        let t = LruTracker::new();
        t.update(Key::from("a"), 1);
        t.delete(&Key::from("a"));
        assert_eq!(t.pop(), None);
        assert!(t.is_empty());
    }
}
