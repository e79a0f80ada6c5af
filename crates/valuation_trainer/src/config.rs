//! Pipeline configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `RENTVAL_*` environment variables. Nested keys use a double
//! underscore, e.g. `RENTVAL_FOREST__N_ESTIMATORS=50`.

use config::{Config, Environment, File as ConfigFile};
use rentval_core::MARKET_WINDOWS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{Result, TrainerError};
use crate::forest::ForestConfig;
use crate::window::WindowDatasetBuilder;

pub const ENV_PREFIX: &str = "RENTVAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    pub bootstrap: bool,
}

impl Default for ForestSettings {
    fn default() -> Self {
        let defaults = ForestConfig::default();
        Self {
            n_estimators: defaults.n_estimators,
            min_samples_leaf: defaults.min_samples_leaf,
            max_depth: defaults.max_depth,
            bootstrap: defaults.bootstrap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `{active,inactive}_listings_{period}.json`
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Fetch history written by the retrieval job
    pub fetch_history: PathBuf,
    /// Market windows in days
    pub windows: Vec<u32>,
    pub test_fraction: f64,
    /// Seed for the train/test split and the forest
    pub seed: u64,
    pub min_window_rows: usize,
    pub forest: ForestSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            models_dir: PathBuf::from("models"),
            fetch_history: PathBuf::from("data/.fetch_history.json"),
            windows: MARKET_WINDOWS.to_vec(),
            test_fraction: 0.2,
            seed: 42,
            min_window_rows: 10,
            forest: ForestSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, the optional config file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(TrainerError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("windows"),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(TrainerError::Config("no market windows configured".to_string()));
        }
        if self.windows.contains(&0) {
            return Err(TrainerError::Config("market windows must be positive".to_string()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainerError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.min_window_rows < 2 {
            return Err(TrainerError::Config(
                "min_window_rows must be at least 2".to_string(),
            ));
        }
        if self.forest.n_estimators == 0 {
            return Err(TrainerError::Config(
                "forest.n_estimators must be at least 1".to_string(),
            ));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(TrainerError::Config(
                "forest.min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            n_estimators: self.forest.n_estimators,
            min_samples_leaf: self.forest.min_samples_leaf,
            max_depth: self.forest.max_depth,
            bootstrap: self.forest.bootstrap,
            seed: self.seed,
        }
    }

    pub fn window_builder(&self) -> WindowDatasetBuilder {
        WindowDatasetBuilder {
            test_fraction: self.test_fraction,
            seed: self.seed,
            min_rows: self.min_window_rows,
        }
    }
}
