//! A single scheduled background task handling active TTL expiration,
//! hash-field sweeping, memory-governor enforcement, and the
//! append-only log's periodic fsync — one thread, not a free-running
//! goroutine per database.

use ember_storage::{MemoryGovernor, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub struct BackgroundTicker {
    shutdown: Arc<AtomicBool>,
}

impl BackgroundTicker {
    /// Starts the ticker thread, running every `interval`. Returns the
    /// ticker (for `shutdown()`) and the join handle.
    pub fn start(
        store: Arc<Store>,
        governor: Arc<MemoryGovernor>,
        aof: Option<Arc<ember_durability::AppendLog>>,
        interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("ember-bg".into())
            .spawn(move || {
                while !shutdown_clone.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if shutdown_clone.load(Ordering::Relaxed) {
                        return;
                    }
                    let stats = store.active_expire_all();
                    let swept_fields = store.sweep_hash_fields();
                    debug!(?stats, swept_fields, "active expiration sweep");

                    if let Err(err) = governor.enforce(&store) {
                        warn!(%err, "memory governor could not bring usage under the limit");
                    }

                    if let Some(aof) = &aof {
                        if let Err(err) = aof.fsync_if_due() {
                            warn!(%err, "append-only log fsync failed");
                        }
                    }
                }
            })
            .expect("failed to spawn background ticker thread");

        (Self { shutdown }, handle)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
