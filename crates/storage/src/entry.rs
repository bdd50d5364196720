//! The per-key record stored in a database: a value plus the bookkeeping
//! the eviction caches and TTL sweeper need without touching the value
//! itself.

use ember_primitives::Value;
use std::time::Instant;

/// Minutes-since-epoch-style counter used by the LFU decay curve, kept
/// as a logical tick (via [`ember_core::Clock::tick`]) rather than wall
/// clock so tests don't depend on real time passing.
pub const LFU_INIT_VAL: u8 = 5;

/// Probabilistic access-frequency counter, incremented with diminishing
/// probability as the counter grows and decayed on a logical clock so
/// that "frequently used a long time ago" eventually loses to "used a
/// little, recently".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfuCounter {
    pub counter: u8,
    pub last_tick: u64,
}

impl Default for LfuCounter {
    fn default() -> Self {
        LfuCounter { counter: LFU_INIT_VAL, last_tick: 0 }
    }
}

impl LfuCounter {
    /// Logarithmic increment: a counter of 0 always increments, a
    /// counter near 255 almost never does.
    pub fn increment(&mut self, now_tick: u64) {
        let decayed = self.decay(now_tick);
        let p = 1.0 / ((decayed as f64) * 10.0 + 1.0);
        if rand::random::<f64>() < p && decayed < u8::MAX {
            self.counter = decayed + 1;
        } else {
            self.counter = decayed;
        }
        self.last_tick = now_tick;
    }

    fn decay(&self, now_tick: u64) -> u8 {
        let elapsed = now_tick.saturating_sub(self.last_tick);
        let decrements = (elapsed / 100) as u8;
        self.counter.saturating_sub(decrements)
    }
}

#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub value: Value,
    pub expires_at: Option<Instant>,
    pub lfu: LfuCounter,
    pub last_accessed_tick: u64,
}

impl KeyEntry {
    pub fn new(value: Value, now_tick: u64) -> Self {
        KeyEntry { value, expires_at: None, lfu: LfuCounter::default(), last_accessed_tick: now_tick }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn touch(&mut self, now_tick: u64) {
        self.last_accessed_tick = now_tick;
        self.lfu.increment(now_tick);
    }

    pub fn memory_usage(&self) -> usize {
        self.value.memory_usage() + std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_never_exceeds_max() {
        let mut c = LfuCounter { counter: 255, last_tick: 0 };
        c.increment(1);
        assert_eq!(c.counter, 255);
    }

    #[test]
    fn decay_reduces_counter_over_elapsed_ticks() {
        let c = LfuCounter { counter: 10, last_tick: 0 };
        assert_eq!(c.decay(1000), 0);
        assert_eq!(c.decay(50), 10);
    }
}
