//! Batch pipeline stages
//!
//! `process` turns the raw snapshots of a fetch period into the cleaned
//! dataset; `train` fits one artifact per market window from it; `predict`
//! values a listing against the stored artifacts. Every stage takes the fetch
//! period explicitly.

use rentval_core::{
    predict_all, DatasetStore, FetchPeriod, FsArtifactStore, FsDatasetStore, NewListing,
    Valuation,
};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::{load_raw_listings, merge_active_inactive, parse_records};
use crate::errors::Result;
use crate::imputation::{impute_listings, CleanedDataset};
use crate::trainer::{TrainingReport, WindowTrainer};

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset_store(&self) -> FsDatasetStore {
        FsDatasetStore::new(&self.config.processed_dir)
    }

    pub fn artifact_store(&self) -> FsArtifactStore {
        FsArtifactStore::new(&self.config.models_dir)
    }

    /// Raw snapshots -> cleaned dataset on disk
    pub fn process(&self, period: FetchPeriod) -> Result<CleanedDataset> {
        info!(
            "Processing raw listings for {} from {}",
            period,
            self.config.raw_dir.display()
        );

        let (active, inactive) = load_raw_listings(&self.config.raw_dir, period)?;
        let merged = merge_active_inactive(active, inactive);
        let records = parse_records(&merged)?;
        let cleaned = impute_listings(&records)?;

        self.dataset_store()
            .save_dataset(period, &cleaned.rows, &cleaned.stats)?;
        Ok(cleaned)
    }

    /// Cleaned dataset on disk -> one artifact per configured window
    pub fn train(&self, period: FetchPeriod) -> Result<TrainingReport> {
        let (rows, stats) = self.dataset_store().load_dataset(period)?;
        info!("Loaded {} cleaned listings for {}", rows.len(), period);

        let trainer = WindowTrainer::from_config(&self.config);
        Ok(trainer.train_all(
            &rows,
            &stats,
            &self.config.windows,
            period,
            &self.artifact_store(),
        ))
    }

    /// Process then train
    pub fn run(&self, period: FetchPeriod) -> Result<TrainingReport> {
        let cleaned = self.process(period)?;
        let trainer = WindowTrainer::from_config(&self.config);
        Ok(trainer.train_all(
            &cleaned.rows,
            &cleaned.stats,
            &self.config.windows,
            period,
            &self.artifact_store(),
        ))
    }

    /// Value a listing with every configured window's model
    pub fn predict(
        &self,
        listing: &NewListing,
        period: FetchPeriod,
    ) -> Result<BTreeMap<u32, Valuation>> {
        Ok(predict_all(
            listing,
            &self.artifact_store(),
            &self.config.windows,
            period,
        )?)
    }
}
