//! Random forest regressor used for inference
//!
//! A forest is the unweighted mean of its trees' outputs.

use super::tree::Tree;
use crate::errors::{Result, ValuationError};
use crate::serialization::hash_canonical_hex;
use serde::{Deserialize, Serialize};

/// Current forest format version
pub const FOREST_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    /// Format version
    pub version: i32,

    /// Width of the feature vector the trees were fit on
    pub n_features: usize,

    /// Trees in the ensemble
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>, n_features: usize) -> Self {
        Self {
            version: FOREST_VERSION,
            n_features,
            trees,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != FOREST_VERSION {
            return Err(ValuationError::InvalidArtifact(format!(
                "Unsupported forest version: {}",
                self.version
            )));
        }

        if self.trees.is_empty() {
            return Err(ValuationError::InvalidArtifact(
                "Forest has no trees".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                ValuationError::InvalidArtifact(format!("Tree {i} validation failed: {e}"))
            })?;

            if let Some(max_idx) = tree.max_feature_idx() {
                if max_idx >= self.n_features {
                    return Err(ValuationError::InvalidArtifact(format!(
                        "Tree {i} splits on feature {max_idx} but forest has {} features",
                        self.n_features
                    )));
                }
            }
        }

        Ok(())
    }

    /// Predict the target for one feature vector
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(ValuationError::Schema(format!(
                "model expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(ValuationError::Prediction("forest has no trees".to_string()));
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict every row of a feature matrix
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Blake3 hash of the canonical JSON form, hex encoded
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::tree::Node;

    fn create_test_forest() -> RandomForest {
        let tree1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::leaf(1, 100.0),
            Node::leaf(2, 200.0),
        ]);
        let tree2 = Tree::new(vec![
            Node::internal(0, 1, 30.0, 1, 2),
            Node::leaf(1, 0.0),
            Node::leaf(2, 50.0),
        ]);
        RandomForest::new(vec![tree1, tree2], 2)
    }

    #[test]
    fn test_forest_averages_trees() -> Result<()> {
        let forest = create_test_forest();
        // Tree 1 -> 100, tree 2 -> 0
        assert_eq!(forest.predict(&[30.0, 20.0])?, 50.0);
        // Tree 1 -> 200, tree 2 -> 50
        assert_eq!(forest.predict(&[60.0, 40.0])?, 125.0);
        Ok(())
    }

    #[test]
    fn test_feature_width_mismatch_is_schema_error() {
        let forest = create_test_forest();
        let err = forest.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, ValuationError::Schema(_)));
    }

    #[test]
    fn test_validation() {
        assert!(create_test_forest().validate().is_ok());

        let mut bad_version = create_test_forest();
        bad_version.version = 999;
        assert!(bad_version.validate().is_err());

        let mut too_narrow = create_test_forest();
        too_narrow.n_features = 1;
        assert!(too_narrow.validate().is_err());

        assert!(RandomForest::new(vec![], 2).validate().is_err());
    }

    #[test]
    fn test_hash_changes_with_model() -> Result<()> {
        let forest1 = create_test_forest();
        let mut forest2 = create_test_forest();
        forest2.trees[0].nodes[1].leaf = Some(999.0);

        assert_eq!(forest1.hash_hex()?, create_test_forest().hash_hex()?);
        assert_ne!(forest1.hash_hex()?, forest2.hash_hex()?);
        Ok(())
    }
}
