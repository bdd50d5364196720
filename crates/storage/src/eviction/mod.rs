//! Eviction candidate tracking and policy selection.

mod lfu;
mod lru;
mod policy;

pub use lfu::LfuTracker;
pub use lru::LruTracker;
pub use policy::EvictionPolicy;

use ember_core::Key;
use rand::seq::IteratorRandom;
use std::time::Instant;

/// Holds whichever trackers the configured [`EvictionPolicy`] needs.
/// Both trackers are always maintained so a `CONFIG SET maxmemory-policy`
/// at runtime never has to rebuild eviction history from scratch.
#[derive(Debug, Default)]
pub struct EvictionTrackers {
    pub lru: LruTracker,
    pub lfu: LfuTracker,
}

impl EvictionTrackers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&self, key: &Key) {
        self.lru.delete(key);
        self.lfu.delete(key);
    }

    pub fn flush(&self) {
        self.lru.flush();
        self.lfu.flush();
    }

    /// Picks the next key to evict per `policy`. `candidates` is a
    /// pool of `(key, expires_at)` already filtered to "volatile" keys
    /// if the policy demands it; only [`EvictionPolicy::VolatileTtl`]
    /// and the random policies consult the expiry/iterate-all path,
    /// the LRU/LFU policies consult their own trackers instead.
    pub fn select_candidate<'a>(
        &self,
        policy: EvictionPolicy,
        candidates: impl Iterator<Item = (&'a Key, Option<Instant>)>,
    ) -> Option<Key> {
        match policy {
            EvictionPolicy::NoEviction => None,
            EvictionPolicy::AllKeysLru => self.lru.pop(),
            EvictionPolicy::VolatileLru => self.lru.pop_among(candidates.map(|(k, _)| k)),
            EvictionPolicy::AllKeysLfu => self.lfu.pop(),
            EvictionPolicy::VolatileLfu => self.lfu.pop_among(candidates.map(|(k, _)| k)),
            EvictionPolicy::AllKeysRandom | EvictionPolicy::VolatileRandom => {
                candidates.map(|(k, _)| k).choose(&mut rand::thread_rng()).cloned()
            }
            EvictionPolicy::VolatileTtl => candidates
                .filter_map(|(k, exp)| exp.map(|e| (e, k)))
                .min_by_key(|(e, _)| *e)
                .map(|(_, k)| k.clone()),
        }
    }
}
