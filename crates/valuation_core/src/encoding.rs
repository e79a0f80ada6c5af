//! Zip code target encoding
//!
//! Replaces the zip code with the mean target of the training rows sharing it.
//! The statistics are fit once on a training split and then frozen: held-out
//! rows and new listings are encoded with the same mapping, and zips never
//! seen during fitting fall back to the training global mean.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Result, ValuationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipTargetEncoder {
    /// Mean target per zip code, training rows only
    pub mean_by_zip: BTreeMap<String, f64>,

    /// Mean target over all training rows
    pub global_mean: f64,
}

impl ZipTargetEncoder {
    /// Fit the encoder on a training split
    pub fn fit(zip_codes: &[String], targets: &[f64]) -> Result<Self> {
        if zip_codes.len() != targets.len() {
            return Err(ValuationError::Schema(format!(
                "zip column has {} rows but target has {}",
                zip_codes.len(),
                targets.len()
            )));
        }
        if targets.is_empty() {
            return Err(ValuationError::InsufficientData(
                "cannot fit zip encoding on an empty training split".to_string(),
            ));
        }

        let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for (zip, &target) in zip_codes.iter().zip(targets) {
            let entry = sums.entry(zip.as_str()).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }

        let mean_by_zip = sums
            .into_iter()
            .map(|(zip, (sum, count))| (zip.to_string(), sum / count as f64))
            .collect();
        let global_mean = targets.iter().sum::<f64>() / targets.len() as f64;

        Ok(Self {
            mean_by_zip,
            global_mean,
        })
    }

    /// Encoded value for one zip code
    pub fn encode(&self, zip_code: &str) -> f64 {
        self.mean_by_zip
            .get(zip_code)
            .copied()
            .unwrap_or(self.global_mean)
    }
}
