//! Per-window model trainer
//!
//! Each market window is trained independently: split, fit the zip encoding
//! on the training rows only, fit the forest on log price, score the held-out
//! rows and package everything prediction needs into one artifact.

use rentval_core::features::{build_feature_matrix, default_feature_order};
use rentval_core::{
    ArtifactMetadata, ArtifactStore, CleanedListing, EvaluationMetrics, FetchPeriod,
    ImputationStats, ModelArtifact, ZipTargetEncoder,
};
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::forest::{ForestConfig, ForestTrainer};
use crate::metrics::evaluate;
use crate::window::{zip_column, WindowDatasetBuilder, WindowSplit};

/// Fit the zip encoding on the training partition of a split
pub fn fit_zip_encoding(split: &WindowSplit) -> Result<ZipTargetEncoder> {
    Ok(ZipTargetEncoder::fit(
        &zip_column(&split.train),
        &split.train_targets(),
    )?)
}

/// Artifact and metadata produced for one window
#[derive(Debug, Clone)]
pub struct TrainedWindow {
    pub artifact: ModelArtifact,
    pub metadata: ArtifactMetadata,
}

/// Outcome of training every configured window for one period
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub period: FetchPeriod,
    pub completed: Vec<(u32, EvaluationMetrics)>,
    pub failed: Vec<(u32, String)>,
}

impl TrainingReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct WindowTrainer {
    builder: WindowDatasetBuilder,
    forest: ForestTrainer,
}

impl WindowTrainer {
    pub fn new(builder: WindowDatasetBuilder, forest: ForestConfig) -> Self {
        Self {
            builder,
            forest: ForestTrainer::new(forest),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.window_builder(), config.forest_config())
    }

    /// Train the model for one window of the cleaned dataset
    pub fn train_window(
        &self,
        rows: &[CleanedListing],
        stats: &ImputationStats,
        window_days: u32,
        period: FetchPeriod,
    ) -> Result<TrainedWindow> {
        let split = self.builder.build(rows, window_days, period)?;
        let encoder = fit_zip_encoding(&split)?;
        let features = default_feature_order();

        let x_train = build_feature_matrix(&split.train, &encoder, stats, &features)?;
        let model = self.forest.fit(&x_train, &split.train_targets())?;

        let x_test = build_feature_matrix(&split.test, &encoder, stats, &features)?;
        let predictions = model.predict_batch(&x_test)?;
        let metrics = evaluate(&split.test_targets(), &predictions)?;

        info!(
            "{}d model for {}: RMSE {:.4}, R² {:.4}",
            window_days, period, metrics.rmse, metrics.r2
        );

        let artifact = ModelArtifact::new(window_days, period, model, encoder, *stats, features);
        artifact.validate()?;
        let metadata =
            ArtifactMetadata::describe(&artifact, metrics, split.train.len(), split.test.len())?;

        Ok(TrainedWindow { artifact, metadata })
    }

    /// Train and persist every window; a failing window does not stop the rest
    pub fn train_all<S: ArtifactStore + ?Sized>(
        &self,
        rows: &[CleanedListing],
        stats: &ImputationStats,
        windows: &[u32],
        period: FetchPeriod,
        store: &S,
    ) -> TrainingReport {
        let mut report = TrainingReport {
            period,
            completed: Vec::new(),
            failed: Vec::new(),
        };

        for &window in windows {
            info!("Training {}d model for {}", window, period);

            let outcome = self.train_window(rows, stats, window, period).and_then(|trained| {
                store.save_artifact(&trained.artifact, &trained.metadata)?;
                Ok(trained.metadata.metrics)
            });

            match outcome {
                Ok(metrics) => report.completed.push((window, metrics)),
                Err(err) => {
                    error!("Training {}d model for {} failed: {}", window, period, err);
                    report.failed.push((window, err.to_string()));
                }
            }
        }

        info!(
            "Trained {}/{} windows for {}",
            report.completed.len(),
            windows.len(),
            period
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TrainerError;
    use crate::window::filter_window;
    use rentval_core::FsArtifactStore;

    const ZIPS: [&str; 3] = ["10009", "11211", "10451"];

    /// Rent driven by bedrooms and zip, spread over 0..=199 days since seen
    fn rows(n: usize) -> Vec<CleanedListing> {
        (0..n)
            .map(|i| {
                let zip = ZIPS[i % 3];
                let bedrooms = (i % 4) as u32;
                let zip_premium = [900.0, 500.0, 0.0][i % 3];
                CleanedListing {
                    id: format!("L{i}"),
                    zip_code: zip.to_string(),
                    bedrooms,
                    bathrooms: 1.0 + (i % 2) as f64,
                    square_footage: 450.0 + 150.0 * bedrooms as f64,
                    price: 1800.0 + 700.0 * bedrooms as f64 + zip_premium,
                    days_since_seen: (i * 13 % 200) as i64,
                    year_built: 1920 + (i % 80) as i32,
                }
            })
            .collect()
    }

    fn stats() -> ImputationStats {
        ImputationStats {
            bathrooms_median: 1.0,
            square_footage_median: 675.0,
            year_built_median: 1960.0,
        }
    }

    fn period() -> FetchPeriod {
        "2025-03".parse().unwrap()
    }

    fn trainer() -> WindowTrainer {
        WindowTrainer::new(
            WindowDatasetBuilder::default(),
            ForestConfig {
                n_estimators: 15,
                min_samples_leaf: 2,
                ..ForestConfig::default()
            },
        )
    }

    #[test]
    fn test_encoding_ignores_held_out_prices() -> anyhow::Result<()> {
        let split = WindowDatasetBuilder::default().build(&rows(60), 180, period())?;
        let before = fit_zip_encoding(&split)?;

        let mut mutated = split.clone();
        for row in &mut mutated.test {
            row.price *= 10.0;
        }
        let after = fit_zip_encoding(&mutated)?;

        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn test_train_window_produces_valid_artifact() -> anyhow::Result<()> {
        let data = rows(120);
        let trained = trainer().train_window(&data, &stats(), 180, period())?;

        assert!(trained.artifact.validate().is_ok());
        assert_eq!(trained.artifact.features, default_feature_order());
        assert_eq!(trained.artifact.imputation, stats());
        // Rows seen more than 180 days ago stay out of the window
        let windowed = filter_window(&data, 180).len();
        assert!(windowed < data.len());
        assert_eq!(trained.metadata.train_rows + trained.metadata.test_rows, windowed);
        assert_eq!(trained.metadata.model_hash, trained.artifact.model.hash_hex()?);
        assert!(trained.metadata.metrics.rmse.is_finite());
        assert!(trained.metadata.metrics.r2 > 0.5);
        Ok(())
    }

    #[test]
    fn test_training_is_deterministic() -> anyhow::Result<()> {
        let a = trainer().train_window(&rows(80), &stats(), 90, period())?;
        let b = trainer().train_window(&rows(80), &stats(), 90, period())?;
        assert_eq!(a.metadata.model_hash, b.metadata.model_hash);
        assert_eq!(a.metadata.metrics, b.metadata.metrics);
        Ok(())
    }

    #[test]
    fn test_small_window_fails_without_blocking_others() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsArtifactStore::new(dir.path());

        // 30 rows: only a handful land in the 30-day window
        let trainer = WindowTrainer::new(
            WindowDatasetBuilder {
                min_rows: 20,
                ..WindowDatasetBuilder::default()
            },
            ForestConfig {
                n_estimators: 5,
                ..ForestConfig::default()
            },
        );
        let report = trainer.train_all(&rows(30), &stats(), &[30, 180], period(), &store);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 30);
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].0, 180);
        assert!(!report.all_succeeded());

        assert!(store.artifact_path(180, period()).exists());
        assert!(!store.artifact_path(30, period()).exists());
        Ok(())
    }

    #[test]
    fn test_too_small_window_is_data_sufficiency_error() {
        let err = trainer()
            .train_window(&rows(8), &stats(), 180, period())
            .unwrap_err();
        assert!(matches!(err, TrainerError::DataSufficiency { .. }));
    }
}
