//! Initiation Level - Startup Wiring
//!
//! Loads the configuration and assembles the evolution engine and the
//! character repository from it.

pub mod config;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::demiurge::{CharacterDraft, EvolutionEngine, EvolveOptions, Identity};
use crate::totems::memory::MemoryStore;
use crate::totems::persistence::JsonFileRepository;

pub use config::EngineConfig;

/// Loaded configuration plus optional overrides, ready to assemble a system.
pub struct InitiationManager {
    config: EngineConfig,
}

impl InitiationManager {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Load the configuration at `path` (defaults when absent).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        Ok(Self::new(config))
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.config.storage.data_dir = data_dir;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the engine and repository from the configuration.
    pub fn init_system(&self) -> Result<SystemComponents> {
        let growth = self
            .config
            .growth_configuration()
            .context("invalid growth configuration")?;

        let repository = JsonFileRepository::new(&self.config.storage.data_dir);
        repository
            .initialize()
            .with_context(|| {
                format!(
                    "failed to initialize data directory {}",
                    self.config.storage.data_dir.display()
                )
            })?;

        info!(
            data_dir = %self.config.storage.data_dir.display(),
            decay_rate = growth.decay_rate(),
            "initialized chronicle"
        );

        Ok(SystemComponents {
            engine: EvolutionEngine::new(growth),
            repository,
            config: self.config.clone(),
        })
    }
}

/// Everything a caller needs after startup.
pub struct SystemComponents {
    pub engine: EvolutionEngine,
    pub repository: JsonFileRepository,
    pub config: EngineConfig,
}

impl SystemComponents {
    /// Draft for a new character with the configured memory capacity.
    pub fn draft(&self, identity: Identity) -> Result<CharacterDraft> {
        let mut draft = CharacterDraft::new(identity);
        draft.memory_store = MemoryStore::new(self.config.memory.capacity)?;
        Ok(draft)
    }

    /// Evolve options carrying the configured prune threshold.
    pub fn evolve_options(&self) -> EvolveOptions {
        EvolveOptions {
            prune_threshold: self.config.memory.effective_prune_threshold(),
            ..EvolveOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totems::persistence::CharacterRepository;
    use tempfile::TempDir;

    #[test]
    fn test_init_system_uses_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.memory.capacity = 7;
        config.memory.prune_enabled = false;

        let system = InitiationManager::new(config)
            .with_data_dir(temp_dir.path().join("characters"))
            .init_system()
            .unwrap();

        let character = system
            .draft(Identity::named("Aruru"))
            .unwrap()
            .build(system.engine.config())
            .unwrap();
        assert_eq!(character.memory_store().capacity(), 7);
        assert_eq!(system.evolve_options().prune_threshold, None);

        system.repository.save(&character).unwrap();
        assert_eq!(system.repository.list_ids().unwrap(), vec![character.id()]);
    }
}
