//! Durability knobs, deserialized from the engine's top-level config file.

use crate::aof::FsyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

impl<'de> Deserialize<'de> for FsyncPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "always" => Ok(FsyncPolicy::Always),
            "everysec" => Ok(FsyncPolicy::EverySec),
            "no" => Ok(FsyncPolicy::No),
            other => Err(serde::de::Error::custom(format!("unknown fsync policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DurabilityConfig {
    /// Directory holding `dump.rdb` and `ember.aof`.
    pub data_dir: PathBuf,
    pub fsync_policy: FsyncPolicy,
    /// Take a fresh snapshot and truncate the append-only log after this
    /// many writes have accumulated since the last one. `None` disables
    /// count-based rewriting.
    pub rewrite_after_writes: Option<u64>,
    /// Minimum time between automatic rewrites, regardless of write
    /// volume, to avoid thrashing under a write-heavy workload.
    #[serde(with = "duration_secs")]
    pub min_rewrite_interval: Duration,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            fsync_policy: FsyncPolicy::EverySec,
            rewrite_after_writes: Some(10_000),
            min_rewrite_interval: Duration::from_secs(60),
        }
    }
}

impl DurabilityConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("dump.rdb")
    }

    pub fn aof_path(&self) -> PathBuf {
        self.data_dir.join("ember.aof")
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_join_data_dir() {
        let cfg = DurabilityConfig { data_dir: PathBuf::from("/var/ember"), ..Default::default() };
        assert_eq!(cfg.snapshot_path(), PathBuf::from("/var/ember/dump.rdb"));
        assert_eq!(cfg.aof_path(), PathBuf::from("/var/ember/ember.aof"));
    }
}
