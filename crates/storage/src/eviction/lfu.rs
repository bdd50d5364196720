//! Least-frequently-used tracking for `allkeys-lfu` / `volatile-lfu`.
//!
//! Same lazy-deletion heap shape as [`super::lru::LruTracker`], ordered
//! by the probabilistic access counter instead of the access tick.

use ember_core::Key;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Default)]
pub struct LfuTracker {
    heap: Mutex<BinaryHeap<Reverse<(u8, Key)>>>,
    current: Mutex<HashMap<Key, u8>>,
}

impl LfuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, key: Key, counter: u8) {
        self.current.lock().insert(key.clone(), counter);
        self.heap.lock().push(Reverse((counter, key)));
    }

    pub fn delete(&self, key: &Key) {
        self.current.lock().remove(key);
    }

    pub fn get_count(&self, key: &Key) -> Option<u8> {
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

    /// Removes and returns the least-frequently-used tracked key.
    pub fn pop(&self) -> Option<Key> {
        let mut heap = self.heap.lock();
        let mut current = self.current.lock();
        loop {
            let Reverse((counter, key)) = heap.pop()?;
            match current.get(&key) {
                Some(&live_counter) if live_counter == counter => {
                    current.remove(&key);
                    return Some(key);
                }
                _ => continue,
            }
        }
    }

    /// Like [`pop`](Self::pop) but restricted to `candidates` — used by
    /// `volatile-lfu`, which must never evict a key with no TTL.
    pub fn pop_among<'a>(&self, candidates: impl Iterator<Item = &'a Key>) -> Option<Key> {
        let current = self.current.lock();
        let picked = candidates.filter_map(|k| current.get(k).map(|&counter| (counter, k.clone()))).min_by_key(|(counter, _)| *counter).map(|(_, k)| k);
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
    fn pop_returns_least_frequent_first() {
        let t = LfuTracker::new();
        t.update(Key::from("hot"), 200);
        t.update(Key::from("cold"), 1);
        t.update(Key::from("warm"), 50);
        assert_eq!(t.pop(), Some(Key::from("cold")));
        assert_eq!(t.pop(), Some(Key::from("warm")));
    }

    #[test]
    fn flush_clears_everything() {
        let t = LfuTracker::new();
        t.update(Key::from("a"), 5);
        t.flush();
        assert!(t.is_empty());
        assert_eq!(t.pop(), None);
    }
}
