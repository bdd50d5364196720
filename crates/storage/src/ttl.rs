//! Active expiration: random-sample sweeping of keys carrying a TTL.
//!
//! Unlike an earliest-first index, `volatile_keys` supports the
//! constant-time random draw the sampling algorithm needs: each pass
//! samples a slice of the set, deletes whichever sampled keys have
//! actually expired, and repeats while at least 20% of the last sample
//! was expired (the assumption being there's more to find).

use ember_core::Key;
use indexmap::IndexSet;
use rand::Rng;

/// Stop re-sampling once fewer than this fraction of a sample is expired.
const RESAMPLE_THRESHOLD_PERCENT: u64 = 20;

/// The set of keys in one database that carry a TTL, kept separately
/// from the main key map so sampling never has to skip over
/// non-volatile keys.
#[derive(Debug, Default)]
pub struct VolatileKeys {
    keys: IndexSet<Key>,
}

impl VolatileKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Key) {
        self.keys.insert(key);
    }

    pub fn remove(&mut self, key: &Key) {
        self.keys.shift_remove(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Draws up to `sample_size` keys at random in `O(sample_size)` via
    /// index positions, rather than copying the whole set.
    pub fn sample(&self, sample_size: usize) -> Vec<Key> {
        if self.keys.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::thread_rng();
        let n = sample_size.min(self.keys.len());
        let mut seen = std::collections::HashSet::with_capacity(n);
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let idx = rng.gen_range(0..self.keys.len());
            if seen.insert(idx) {
                out.push(self.keys[idx].clone());
            }
        }
        out
    }
}

/// Result of one active-expiration pass over a single database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub sampled: usize,
    pub expired: usize,
    pub rounds: usize,
}

/// Runs the sample-delete-resample loop, calling `is_expired` to test
/// each sampled key and `delete` to remove the ones that are. Returns
/// once a round finds fewer than [`RESAMPLE_THRESHOLD_PERCENT`] expired,
/// or the volatile set is empty.
pub fn active_expire_cycle<IsExpired, Delete>(
    volatile: &mut VolatileKeys,
    sample_size: usize,
    mut is_expired: IsExpired,
    mut delete: Delete,
) -> SweepStats
where
    IsExpired: FnMut(&Key) -> bool,
    Delete: FnMut(&Key),
{
    let mut stats = SweepStats::default();
    loop {
        if volatile.is_empty() {
            break;
        }
        let sample = volatile.sample(sample_size);
        if sample.is_empty() {
            break;
        }
        stats.rounds += 1;
        stats.sampled += sample.len();
        let mut expired_this_round = 0;
        for key in &sample {
            if is_expired(key) {
                delete(key);
                volatile.remove(key);
                expired_this_round += 1;
            }
        }
        stats.expired += expired_this_round;
        let pct = (expired_this_round as u64 * 100) / sample.len() as u64;
        if pct < RESAMPLE_THRESHOLD_PERCENT {
            break;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_never_exceeds_set_size() {
        let mut v = VolatileKeys::new();
        v.insert(Key::from("a"));
        v.insert(Key::from("b"));
        assert_eq!(v.sample(10).len(), 2);
    }

    #[test]
    fn active_cycle_stops_below_threshold() {
        let mut v = VolatileKeys::new();
        for i in 0..10 {
            v.insert(Key::from(format!("k{i}")));
        }
        let mut deleted = Vec::new();
        let stats = active_expire_cycle(
            &mut v,
            10,
            |k| k.as_bytes() == b"k0" || k.as_bytes() == b"k1",
            |k| deleted.push(k.clone()),
        );
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.expired, 2);
        assert_eq!(deleted.len(), 2);
    }

    #[test]
    fn active_cycle_resamples_when_above_threshold() {
        let mut v = VolatileKeys::new();
        for i in 0..10 {
            v.insert(Key::from(format!("k{i}")));
        }
        let mut remaining: std::collections::HashSet<Key> = v.iter().cloned().collect();
        let stats = active_expire_cycle(
            &mut v,
            10,
            |_| true,
            |k| {
                remaining.remove(k);
            },
        );
        assert_eq!(stats.expired, 10);
        assert!(stats.rounds >= 1);
    }

    #[test]
    fn empty_set_does_nothing() {
        let mut v = VolatileKeys::new();
        let stats = active_expire_cycle(&mut v, 20, |_| true, |_| {});
        assert_eq!(stats.sampled, 0);
    }
}
