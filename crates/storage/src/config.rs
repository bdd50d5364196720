//! Storage-layer configuration, deserializable from the engine's TOML file.

use crate::eviction::EvictionPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of logical databases created at startup (`SELECT` may
    /// address any of `0..databases`).
    pub databases: u16,
    /// Soft memory ceiling in bytes. `None` disables the memory governor.
    pub max_memory: Option<usize>,
    pub eviction_policy: EvictionPolicy,
    /// Keys sampled per round of the active-expiration cycle.
    pub active_expire_sample_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            databases: 16,
            max_memory: None,
            eviction_policy: EvictionPolicy::NoEviction,
            active_expire_sample_size: crate::keyspace::DEFAULT_SAMPLE_SIZE,
        }
    }
}
