//! The two-flag CAS gate coordinating command dispatch with the
//! durability engine's copy-on-write snapshot/rewrite path.
//!
//! A write command must not mutate the keyspace while a snapshot or log
//! rewrite is mid-copy (it would see a torn, half-copied structure); a
//! copier must not start copying while any mutation is in flight (same
//! problem, other direction). Neither side is ever held across I/O —
//! the copier clears its flag as soon as the in-memory copy finishes,
//! before it touches disk, so a write blocked behind it only waits for
//! a memory copy, never a fsync.
//!
//! Mutation is a count, not a single bool, because multiple write
//! commands run concurrently on different connections/databases; the
//! copy side stays a single bool since only one snapshot or rewrite
//! runs at a time. Each side re-checks the other *after* staking its
//! own claim, because "check copy flag, then increment count" alone
//! has a window between the check and the increment where a copier
//! could slip in and start copying concurrently with the write it
//! should have been blocked by — the same TOCTOU shape as an
//! unsynchronized validate-then-apply. The recheck-and-retry below
//! closes that window on both sides.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Returned by a spin-wait that gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateTimeout;

#[derive(Debug, Default)]
pub struct WriteGate {
    copy_in_progress: AtomicBool,
    mutation_count: AtomicUsize,
}

/// Releases one writer's claim on the mutation side when dropped.
pub struct WriteGuard<'a> {
    count: &'a AtomicUsize,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Releases the copy-in-progress claim when dropped.
pub struct CopyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CopyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

const SPIN_SLEEP: Duration = Duration::from_micros(10);

fn spin_until<F: Fn() -> bool>(timeout: Option<Duration>, condition: F) -> Result<(), GateTimeout> {
    let start = Instant::now();
    while !condition() {
        if timeout.is_some_and(|t| start.elapsed() > t) {
            return Err(GateTimeout);
        }
        std::thread::sleep(SPIN_SLEEP);
    }
    Ok(())
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no copy is in progress, then marks a mutation as
    /// in flight. Drop the returned guard when the mutation completes.
    pub fn enter_write(&self) -> WriteGuard<'_> {
        self.try_enter_write(None).expect("unbounded wait never times out")
    }

    pub fn try_enter_write(&self, timeout: Option<Duration>) -> Result<WriteGuard<'_>, GateTimeout> {
        loop {
            spin_until(timeout, || !self.copy_in_progress.load(Ordering::Acquire))?;
            self.mutation_count.fetch_add(1, Ordering::AcqRel);
            if !self.copy_in_progress.load(Ordering::Acquire) {
                return Ok(WriteGuard { count: &self.mutation_count });
            }
            // A copy slipped in between our check and our claim; back off and retry.
            trace!("write claim lost the race to a copy, retrying");
            self.mutation_count.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Blocks until no mutation is in progress, then marks a copy as
    /// in flight. Drop the returned guard as soon as the in-memory copy
    /// is complete — never hold it across a disk write.
    pub fn enter_copy(&self) -> CopyGuard<'_> {
        self.try_enter_copy(None).expect("unbounded wait never times out")
    }

    pub fn try_enter_copy(&self, timeout: Option<Duration>) -> Result<CopyGuard<'_>, GateTimeout> {
        loop {
            spin_until(timeout, || self.mutation_count.load(Ordering::Acquire) == 0)?;
            if self.copy_in_progress.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
                continue;
            }
            if self.mutation_count.load(Ordering::Acquire) == 0 {
                return Ok(CopyGuard { flag: &self.copy_in_progress });
            }
            // A mutation slipped in between our check and our claim; back off and retry.
            trace!("copy claim lost the race to a write, retrying");
            self.copy_in_progress.store(false, Ordering::Release);
        }
    }

    pub fn is_copy_in_progress(&self) -> bool {
        self.copy_in_progress.load(Ordering::Acquire)
    }

    pub fn is_mutation_in_progress(&self) -> bool {
        self.mutation_count.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn guard_release_clears_flag_on_drop() {
        let gate = WriteGate::new();
        {
            let _g = gate.enter_write();
            assert!(gate.is_mutation_in_progress());
        }
        assert!(!gate.is_mutation_in_progress());
    }

    #[test]
    fn write_blocks_while_copy_in_progress() {
        let gate = WriteGate::new();
        let copy_guard = gate.enter_copy();
        assert!(gate.try_enter_write(Some(Duration::from_millis(20))).is_err());
        drop(copy_guard);
        assert!(gate.try_enter_write(Some(Duration::from_millis(50))).is_ok());
    }

    #[test]
    fn copy_blocks_while_mutation_in_progress() {
        let gate = WriteGate::new();
        let write_guard = gate.enter_write();
        assert!(gate.try_enter_copy(Some(Duration::from_millis(20))).is_err());
        drop(write_guard);
        assert!(gate.try_enter_copy(Some(Duration::from_millis(50))).is_ok());
    }

    #[test]
    fn multiple_writers_coexist() {
        let gate = WriteGate::new();
        let a = gate.enter_write();
        let b = gate.enter_write();
        assert!(gate.try_enter_copy(Some(Duration::from_millis(20))).is_err());
        drop(a);
        assert!(gate.try_enter_copy(Some(Duration::from_millis(20))).is_err());
        drop(b);
        assert!(gate.try_enter_copy(Some(Duration::from_millis(50))).is_ok());
    }

    #[test]
    fn concurrent_writers_do_not_deadlock_each_other() {
        let gate = Arc::new(WriteGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _g = gate.enter_write();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(!gate.is_mutation_in_progress());
    }

    #[test]
    fn panic_during_write_releases_the_gate() {
        let gate = Arc::new(WriteGate::new());
        let gate2 = Arc::clone(&gate);
        let result = std::panic::catch_unwind(move || {
            let _g = gate2.enter_write();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!gate.is_mutation_in_progress());
    }
}
