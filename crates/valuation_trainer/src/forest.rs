//! Random forest regressor training
//!
//! Bagged CART trees fitted in parallel. Each tree draws its bootstrap sample
//! from its own RNG stream derived from `(seed, tree_index)`, so the fitted
//! forest does not depend on thread scheduling.

use rayon::prelude::*;
use rentval_core::forest::{RandomForest, Tree};
use tracing::{debug, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            min_samples_leaf: 5,
            max_depth: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

pub struct ForestTrainer {
    config: ForestConfig,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit a forest on a feature matrix and regression targets
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<RandomForest> {
        let n_features = validate_inputs(features, targets)?;
        if self.config.n_estimators == 0 {
            return Err(TrainerError::Training(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        info!(
            "Fitting {} trees on {} rows x {} features",
            self.config.n_estimators,
            features.len(),
            n_features
        );

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        let builder = CartBuilder::new(features, targets, tree_config);
        let n = features.len();

        let trees: Vec<Tree> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let sample = if self.config.bootstrap {
                    LcgRng::derive(self.config.seed, tree_idx as u64).bootstrap(n)
                } else {
                    (0..n).collect()
                };
                builder.build(&sample)
            })
            .collect();

        let total_nodes: usize = trees.iter().map(|t| t.nodes.len()).sum();
        debug!(total_nodes, "forest fitted");

        let forest = RandomForest::new(trees, n_features);
        forest.validate()?;
        Ok(forest)
    }
}

fn validate_inputs(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.is_empty() {
        return Err(TrainerError::Training("no training rows".to_string()));
    }
    if features.len() != targets.len() {
        return Err(TrainerError::Training(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }

    let n_features = features[0].len();
    if n_features == 0 {
        return Err(TrainerError::Training("feature rows are empty".to_string()));
    }
    for (i, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(TrainerError::Training(format!(
                "row {i} has {} features, expected {n_features}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(TrainerError::Training(format!(
                "row {i} contains a non-finite feature"
            )));
        }
    }
    if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
        return Err(TrainerError::Training(format!(
            "target {i} is not finite"
        )));
    }

    Ok(n_features)
}
