//! Top-level engine configuration, loaded from `ember.toml` in the data
//! directory. Replaces a builder with a config file on disk, same
//! model as Redis's `redis.conf` — edit and restart to change settings.

use ember_durability::DurabilityConfig;
use ember_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "ember.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub durability: DurabilityConfig,
    /// How often the active-expiration and fsync-due background sweep
    /// runs, in milliseconds.
    pub background_tick_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { storage: StorageConfig::default(), durability: DurabilityConfig::default(), background_tick_ms: 100 }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ember_core::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ember_core::Error::Internal(format!("invalid config: {e}")))
    }

    pub fn write_default_if_missing(path: &Path) -> Result<(), ember_core::Error> {
        if !path.exists() {
            let default = EngineConfig::default();
            let content = toml::to_string_pretty(&default)
                .map_err(|e| ember_core::Error::Internal(format!("failed to serialize default config: {e}")))?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_default_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&path).unwrap();
        let cfg = EngineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.storage.databases, 16);
    }

    #[test]
    fn write_default_does_not_overwrite_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "background_tick_ms = 5\n").unwrap();
        EngineConfig::write_default_if_missing(&path).unwrap();
        let cfg = EngineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.background_tick_ms, 5);
    }
}
