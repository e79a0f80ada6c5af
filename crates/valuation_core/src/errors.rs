//! Error types for the valuation core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building features, loading artifacts or predicting
#[derive(Error, Debug)]
pub enum ValuationError {
    /// Invalid or missing configuration value (e.g. fetch period marker)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expected column or feature is missing or out of order
    #[error("Schema error: {0}")]
    Schema(String),

    /// A statistic was requested over an empty set of observations
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Model evaluation produced an unusable value
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// Artifact failed structural validation
    #[error("Artifact validation failed: {0}")]
    InvalidArtifact(String),

    /// Requested artifact or dataset does not exist in the store
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error with the offending path
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV encoding/decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ValuationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for valuation core operations
pub type Result<T> = std::result::Result<T, ValuationError>;
