//! Eviction policy selection, mirroring the `maxmemory-policy` knob.

use serde::{Deserialize, Serialize};

/// Which keys are eligible and by which order they are evicted when
/// `max_memory` is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Reject writes instead of evicting.
    #[default]
    NoEviction,
    AllKeysLru,
    AllKeysLfu,
    AllKeysRandom,
    VolatileLru,
    VolatileLfu,
    VolatileRandom,
    /// Evict the key with the nearest expiration first.
    VolatileTtl,
}

impl EvictionPolicy {
    /// Whether this policy only considers keys that carry a TTL.
    pub fn volatile_only(self) -> bool {
        matches!(
            self,
            EvictionPolicy::VolatileLru
                | EvictionPolicy::VolatileLfu
                | EvictionPolicy::VolatileRandom
                | EvictionPolicy::VolatileTtl
        )
    }

    pub fn is_noeviction(self) -> bool {
        matches!(self, EvictionPolicy::NoEviction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_policies_are_flagged() {
        assert!(EvictionPolicy::VolatileLru.volatile_only());
        assert!(!EvictionPolicy::AllKeysLru.volatile_only());
    }
}
