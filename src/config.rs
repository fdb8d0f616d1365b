use crate::error::RankGraphError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

const DEFAULT_BATCH: usize = 100;

fn default_batch() -> usize {
    DEFAULT_BATCH
}

/// Tunables for [crate::engine::PreferenceEngine]. Every field has a default, so an empty TOML
/// table is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on pending comparisons created by one `populate_queued_compares` call when the caller
    /// doesn't give one.
    #[serde(default = "default_batch")]
    pub populate_batch: usize,
    /// Default `limit` for `random_possible_queued_compares`.
    #[serde(default = "default_batch")]
    pub random_sample_limit: usize,
    /// Default `limit` for `list_undefined_items`.
    #[serde(default = "default_batch")]
    pub undefined_items_limit: usize,
    /// Seed for the engine's random number generator. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Where the CLI reads and writes its store snapshot.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            populate_batch: DEFAULT_BATCH,
            random_sample_limit: DEFAULT_BATCH,
            undefined_items_limit: DEFAULT_BATCH,
            rng_seed: None,
            snapshot_path: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), RankGraphError> {
        if self.populate_batch == 0 {
            return Err(RankGraphError::Config(
                "populate_batch must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<EngineConfig, RankGraphError>;
    fn set_config(&self, config: &EngineConfig) -> Result<(), RankGraphError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<EngineConfig, RankGraphError> {
        tracing::debug!("Attempting to read engine config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using default engine config.");
            return Ok(EngineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn set_config(&self, config: &EngineConfig) -> Result<(), RankGraphError> {
        tracing::debug!("Attempting to write engine config to: {:?}", &self.path);
        config.validate()?;
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
