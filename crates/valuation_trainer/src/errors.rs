use rentval_core::{FetchPeriod, ValuationError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the cleaning and training pipeline.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("window {window_days}d ({period}): {rows} rows after filtering, need at least {required}")]
    DataSufficiency {
        window_days: u32,
        period: FetchPeriod,
        rows: usize,
        required: usize,
    },

    #[error("cannot impute '{column}': no observed values to take a median of")]
    NoObservations { column: &'static str },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Valuation(#[from] ValuationError),
}

impl TrainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
