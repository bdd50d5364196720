//! Enforces `max_memory` by evicting keys per the configured policy
//! before a write is allowed to proceed.

use crate::eviction::EvictionPolicy;
use crate::keyspace::Store;
use ember_core::{DbIndex, Error, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MemoryGovernor {
    pub max_memory: Option<usize>,
    pub policy: EvictionPolicy,
}

impl Default for MemoryGovernor {
    fn default() -> Self {
        MemoryGovernor { max_memory: None, policy: EvictionPolicy::NoEviction }
    }
}

impl MemoryGovernor {
    pub fn new(max_memory: Option<usize>, policy: EvictionPolicy) -> Self {
        MemoryGovernor { max_memory, policy }
    }

    /// Evicts keys from `store` until `used_memory()` is back under
    /// `max_memory`, or returns `Err(Error::MaxMemory)` if the policy is
    /// `NoEviction` (or there is nothing left worth evicting).
    pub fn enforce(&self, store: &Store) -> Result<()> {
        let Some(limit) = self.max_memory else {
            return Ok(());
        };
        let mut guard_rounds = 0;
        while store.used_memory() > limit {
            if self.policy.is_noeviction() {
                return Err(Error::MaxMemory);
            }
            let candidates = store.snapshot_expiries_all(self.policy.volatile_only());
            let picked = store.eviction().select_candidate(self.policy, candidates.iter().map(|(k, e)| (k, *e)));
            let Some(key) = picked else {
                return Err(Error::MaxMemory);
            };
            debug!(?key, "evicting key under memory pressure");
            store.delete_anywhere(&key);
            guard_rounds += 1;
            if guard_rounds > 10_000 {
                return Err(Error::MaxMemory);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ember_core::{Key, SystemClock};
    use ember_primitives::Value;
    use std::sync::Arc;

    fn filled_store(max_memory: usize, policy: EvictionPolicy) -> (Store, MemoryGovernor) {
        let store = Store::new(1, Arc::new(SystemClock::new()));
        for i in 0..50 {
            store.set(DbIndex::new(0), Key::from(format!("k{i}")), Value::Str(Bytes::from(vec![0u8; 100])));
        }
        (store, MemoryGovernor::new(Some(max_memory), policy))
    }

    #[test]
    fn noeviction_rejects_when_over_limit() {
        let (store, governor) = filled_store(100, EvictionPolicy::NoEviction);
        assert!(governor.enforce(&store).is_err());
    }

    #[test]
    fn allkeys_random_evicts_until_under_limit() {
        let (store, governor) = filled_store(1000, EvictionPolicy::AllKeysRandom);
        assert!(governor.enforce(&store).is_ok());
        assert!(store.used_memory() <= 1000);
    }

    #[test]
    fn no_limit_never_evicts() {
        let (store, governor) = filled_store(0, EvictionPolicy::NoEviction);
        let governor = MemoryGovernor { max_memory: None, ..governor };
        assert_eq!(store.dbsize(DbIndex::new(0)), 50);
        assert!(governor.enforce(&store).is_ok());
        assert_eq!(store.dbsize(DbIndex::new(0)), 50);
    }

    /// Volatile-LFU eviction drops the least-accessed volatile key and
    /// leaves non-volatile keys untouched.
    #[test]
    fn volatile_lfu_evicts_least_frequently_used_volatile_key() {
        let store = Store::new(1, Arc::new(SystemClock::new()));
        let db = DbIndex::new(0);
        let far_future = std::time::Instant::now() + std::time::Duration::from_secs(3600);

        store.set(db, Key::from("persistent"), Value::Str(Bytes::from(vec![0u8; 100])));
        store.set_with_expiry(db, Key::from("cold"), Value::Str(Bytes::from(vec![0u8; 100])), far_future);
        store.set_with_expiry(db, Key::from("hot"), Value::Str(Bytes::from(vec![0u8; 100])), far_future);

        for _ in 0..50 {
            store.get(db, &Key::from("hot"));
        }

        let governor = MemoryGovernor::new(Some(250), EvictionPolicy::VolatileLfu);
        assert!(governor.enforce(&store).is_ok());

        assert!(store.used_memory() <= 250);
        assert!(store.exists(db, &Key::from("persistent")));
        assert!(!store.exists(db, &Key::from("cold")));
    }
}
