//! Window dataset builder
//!
//! Filters the cleaned dataset to one recency window and splits it into a
//! reproducible train/test partition. The window view is rebuilt on every
//! training run and never persisted.

use rentval_core::{CleanedListing, FetchPeriod};
use tracing::info;

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Rows with `daysSinceSeen <= window_days`
pub fn filter_window(rows: &[CleanedListing], window_days: u32) -> Vec<CleanedListing> {
    rows.iter()
        .filter(|row| row.days_since_seen <= i64::from(window_days))
        .cloned()
        .collect()
}

/// Model target: `ln(1 + price)`
pub fn log_target(rows: &[CleanedListing]) -> Vec<f64> {
    rows.iter().map(|row| row.price.ln_1p()).collect()
}

pub fn zip_column(rows: &[CleanedListing]) -> Vec<String> {
    rows.iter().map(|row| row.zip_code.clone()).collect()
}

/// Train/test partition of one window
#[derive(Debug, Clone)]
pub struct WindowSplit {
    pub window_days: u32,
    pub period: FetchPeriod,
    pub train: Vec<CleanedListing>,
    pub test: Vec<CleanedListing>,
}

impl WindowSplit {
    pub fn train_targets(&self) -> Vec<f64> {
        log_target(&self.train)
    }

    pub fn test_targets(&self) -> Vec<f64> {
        log_target(&self.test)
    }
}

#[derive(Debug, Clone)]
pub struct WindowDatasetBuilder {
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    pub seed: u64,
    /// Smallest window that is still trained
    pub min_rows: usize,
}

impl Default for WindowDatasetBuilder {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            min_rows: 10,
        }
    }
}

impl WindowDatasetBuilder {
    /// Filter `rows` to the window and split them
    pub fn build(
        &self,
        rows: &[CleanedListing],
        window_days: u32,
        period: FetchPeriod,
    ) -> Result<WindowSplit> {
        let windowed = filter_window(rows, window_days);
        let n = windowed.len();
        let n_test = (n as f64 * self.test_fraction).ceil() as usize;

        let insufficient = |required: usize| TrainerError::DataSufficiency {
            window_days,
            period,
            rows: n,
            required,
        };
        if n < self.min_rows {
            return Err(insufficient(self.min_rows));
        }
        if n_test == 0 || n_test >= n {
            return Err(insufficient(n + 1));
        }

        let mut order: Vec<usize> = (0..n).collect();
        LcgRng::new(self.seed).shuffle(&mut order);

        let mut test = Vec::with_capacity(n_test);
        let mut train = Vec::with_capacity(n - n_test);
        for (rank, &idx) in order.iter().enumerate() {
            if rank < n_test {
                test.push(windowed[idx].clone());
            } else {
                train.push(windowed[idx].clone());
            }
        }

        info!(
            "Window {}d ({}): {} rows, {} train / {} test",
            window_days,
            period,
            n,
            train.len(),
            test.len()
        );

        Ok(WindowSplit {
            window_days,
            period,
            train,
            test,
        })
    }
}
