//! Per-window model artifacts
//!
//! An artifact bundles a fitted forest with every statistic needed to rebuild
//! its input features: the frozen zip encoding, the imputation fallbacks and
//! the feature order. Predicting with it needs nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::encoding::ZipTargetEncoder;
use crate::errors::{Result, ValuationError};
use crate::features::{validate_feature_order, ImputationStats};
use crate::forest::RandomForest;
use crate::period::FetchPeriod;

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// Trained state for one (window, fetch period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub window_days: u32,
    pub fetch_period: FetchPeriod,
    pub model: RandomForest,
    pub zip_encoding: ZipTargetEncoder,
    pub imputation: ImputationStats,
    /// Feature names in the order the model consumes them
    pub features: Vec<String>,
}

impl ModelArtifact {
    pub fn new(
        window_days: u32,
        fetch_period: FetchPeriod,
        model: RandomForest,
        zip_encoding: ZipTargetEncoder,
        imputation: ImputationStats,
        features: Vec<String>,
    ) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            window_days,
            fetch_period,
            model,
            zip_encoding,
            imputation,
            features,
        }
    }

    /// Structural checks run before an artifact is written or used
    pub fn validate(&self) -> Result<()> {
        let context = |msg: String| {
            ValuationError::InvalidArtifact(format!(
                "{}d/{}: {msg}",
                self.window_days, self.fetch_period
            ))
        };

        if self.version != ARTIFACT_VERSION {
            return Err(context(format!("unsupported artifact version {}", self.version)));
        }

        self.model.validate()?;
        validate_feature_order(&self.features)?;

        if self.features.len() != self.model.n_features {
            return Err(ValuationError::Schema(format!(
                "{}d/{}: artifact lists {} features but model expects {}",
                self.window_days,
                self.fetch_period,
                self.features.len(),
                self.model.n_features
            )));
        }

        let stats = [
            self.zip_encoding.global_mean,
            self.imputation.bathrooms_median,
            self.imputation.square_footage_median,
            self.imputation.year_built_median,
        ];
        if stats.iter().any(|value| !value.is_finite()) {
            return Err(context("non-finite frozen statistic".to_string()));
        }
        if self.zip_encoding.mean_by_zip.values().any(|v| !v.is_finite()) {
            return Err(context("non-finite zip encoding".to_string()));
        }

        Ok(())
    }
}

/// Held-out evaluation in log-price space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub rmse: f64,
    pub r2: f64,
}

/// Audit record stored next to each artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub window_days: u32,
    pub fetch_period: FetchPeriod,
    pub global_rent_mean: f64,
    pub mean_rent_by_zip: BTreeMap<String, f64>,
    pub metrics: EvaluationMetrics,
    pub model_hash: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    pub fn describe(
        artifact: &ModelArtifact,
        metrics: EvaluationMetrics,
        train_rows: usize,
        test_rows: usize,
    ) -> Result<Self> {
        Ok(Self {
            window_days: artifact.window_days,
            fetch_period: artifact.fetch_period,
            global_rent_mean: artifact.zip_encoding.global_mean,
            mean_rent_by_zip: artifact.zip_encoding.mean_by_zip.clone(),
            metrics,
            model_hash: artifact.model.hash_hex()?,
            train_rows,
            test_rows,
            trained_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::default_feature_order;
    use crate::forest::{Node, Tree};

    fn artifact() -> ModelArtifact {
        let forest = RandomForest::new(
            vec![Tree::new(vec![
                Node::internal(0, 4, 8.0, 1, 2),
                Node::leaf(1, 7.5),
                Node::leaf(2, 8.5),
            ])],
            5,
        );
        ModelArtifact::new(
            30,
            "2025-01".parse().unwrap(),
            forest,
            ZipTargetEncoder {
                mean_by_zip: BTreeMap::from([("10009".to_string(), 8.3)]),
                global_mean: 8.1,
            },
            ImputationStats {
                bathrooms_median: 1.0,
                square_footage_median: 650.0,
                year_built_median: 1931.0,
            },
            default_feature_order(),
        )
    }

    #[test]
    fn test_valid_artifact() {
        assert!(artifact().validate().is_ok());
    }

    #[test]
    fn test_feature_count_must_match_model() {
        let mut bad = artifact();
        bad.features.pop();
        assert!(matches!(bad.validate(), Err(ValuationError::Schema(_))));
    }

    #[test]
    fn test_non_finite_statistic_rejected() {
        let mut bad = artifact();
        bad.imputation.square_footage_median = f64::NAN;
        assert!(matches!(bad.validate(), Err(ValuationError::InvalidArtifact(_))));
    }

    #[test]
    fn test_metadata_mirrors_encoding() {
        let artifact = artifact();
        let meta = ArtifactMetadata::describe(
            &artifact,
            EvaluationMetrics { rmse: 0.2, r2: 0.7 },
            80,
            20,
        )
        .unwrap();

        assert_eq!(meta.window_days, 30);
        assert_eq!(meta.global_rent_mean, 8.1);
        assert_eq!(meta.mean_rent_by_zip.get("10009"), Some(&8.3));
        assert_eq!(meta.model_hash, artifact.model.hash_hex().unwrap());
    }
}
