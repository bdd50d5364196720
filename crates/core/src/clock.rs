//! Time seam used by TTL bookkeeping and the eviction caches.
//!
//! Production code always uses [`SystemClock`]. Tests substitute a
//! fake clock so that TTL and idle-time assertions don't race real
//! wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of the current instant plus a monotonic logical tick.
///
/// The logical tick backs the LFU/LRU heaps' tie-breaking order: it
/// increments on every `tick()` call and is cheaper and more
/// deterministic under test than resampling `Instant::now()` on every
/// cache touch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn tick(&self) -> u64;
}

/// The real wall-clock, backed by `Instant::now()` and an atomic counter.
#[derive(Debug, Default)]
pub struct SystemClock {
    counter: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            counter: AtomicU64::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

/// A fake clock for deterministic tests: `now()` only advances when
/// `advance()` is called, and `tick()` is a separate counter so test
/// assertions about ordering don't depend on wall-clock resolution.
#[cfg(any(test, feature = "test-util"))]
pub struct FakeClock {
    base: Instant,
    offset: std::sync::Mutex<Duration>,
    counter: AtomicU64,
}

#[cfg(any(test, feature = "test-util"))]
impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            base: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
            counter: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += by;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_ticks_are_monotonic() {
        let clock = SystemClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b > a);
    }

    #[test]
    fn fake_clock_advances_only_on_request() {
        let clock = FakeClock::new();
        let t0 = clock.now();
        let t1 = clock.now();
        assert_eq!(t0, t1);
        clock.advance(Duration::from_secs(5));
        assert!(clock.now() > t0);
    }
}
