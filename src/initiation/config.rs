//! Engine configuration
//!
//! Growth parameters, memory defaults, storage location and log filter,
//! read from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::demiurge::growth::GrowthSettings;
use crate::demiurge::GrowthConfiguration;
use crate::error::ConfigurationError;
use crate::totems::memory::{DEFAULT_CAPACITY, DEFAULT_PRUNE_THRESHOLD};

pub const DEFAULT_CONFIG_PATH: &str = "config/chronicle.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Capacity given to new characters' memory stores
    pub capacity: usize,
    /// Drop memories that decay below `prune_threshold` during evolution
    pub prune_enabled: bool,
    pub prune_threshold: f64,
}

impl MemorySettings {
    pub fn effective_prune_threshold(&self) -> Option<f64> {
        self.prune_enabled.then_some(self.prune_threshold)
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            prune_enabled: true,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/characters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub growth: GrowthSettings,
    pub memory: MemorySettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Read `path`, or defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Like [`EngineConfig::load`], but writes the defaults to `path` when absent.
    pub fn load_or_init(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let default_config = Self::default();
        std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
        info!(path = %path.display(), "wrote default configuration");
        Ok(default_config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        GrowthConfiguration::new(self.growth.clone())?;
        if self.memory.capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&self.memory.prune_threshold) {
            return Err(ConfigurationError::PruneThreshold(self.memory.prune_threshold));
        }
        Ok(())
    }

    /// The validated growth configuration.
    pub fn growth_configuration(&self) -> Result<GrowthConfiguration, ConfigurationError> {
        GrowthConfiguration::new(self.growth.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = EngineConfig::load(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(!temp_dir.path().join("absent.toml").exists());
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config/chronicle.toml");
        let written = EngineConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(EngineConfig::load(&path).unwrap(), written);
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [growth]
            decay_rate = 0.2
            weighting = "configured"

            [growth.maturity_thresholds]
            growing = 0.1
            mature = 0.5
            transcendent = 0.9

            [memory]
            capacity = 12
            "#,
        )
        .unwrap();

        let growth = config.growth_configuration().unwrap();
        assert_eq!(growth.decay_rate(), 0.2);
        assert_eq!(growth.thresholds().mature, 0.5);
        assert_eq!(config.memory.capacity, 12);
        assert_eq!(
            config.memory.effective_prune_threshold(),
            Some(DEFAULT_PRUNE_THRESHOLD)
        );
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_invalid_growth_rejected() {
        let result = EngineConfig::from_toml(
            r#"
            [growth]
            knowledge_weight = 0.9
            "#,
        );
        assert!(result.is_err());

        let result = EngineConfig::from_toml("[memory]\ncapacity = 0\n");
        assert!(result.is_err());

        let config = EngineConfig::from_toml("[memory]\nprune_enabled = false\n").unwrap();
        assert_eq!(config.memory.effective_prune_threshold(), None);
    }
}
