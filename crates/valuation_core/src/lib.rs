//! Market-window rent valuation core
//!
//! Everything needed to consume a trained per-window model: the artifact
//! format, the feature construction shared with the trainer, and the
//! predictor that labels a listing as over-, under- or fairly priced.
//!
//! Modules:
//! - `period`: Fetch periods and the configured recency windows
//! - `listing`: Cleaned dataset rows and prediction inputs
//! - `encoding`: Leakage-safe zip code target encoding
//! - `features`: Feature construction shared by training and serving
//! - `forest`: Random forest inference structures
//! - `artifact`: Self-contained per-window model artifacts and metadata
//! - `store`: Artifact and processed dataset stores
//! - `predictor`: Valuation and price classification
//! - `serialization`: Canonical JSON and model hashing

pub mod artifact;
pub mod encoding;
pub mod errors;
pub mod features;
pub mod forest;
pub mod listing;
pub mod period;
pub mod predictor;
pub mod serialization;
pub mod store;

pub use artifact::{ArtifactMetadata, EvaluationMetrics, ModelArtifact};
pub use encoding::ZipTargetEncoder;
pub use errors::{Result, ValuationError};
pub use features::{build_features, FeatureInput, ImputationStats, FEATURE_NAMES};
pub use forest::{Node, RandomForest, Tree};
pub use listing::{CleanedListing, NewListing};
pub use period::{FetchPeriod, MARKET_WINDOWS};
pub use predictor::{predict_all, predict_rent, PriceClass, Valuation};
pub use store::{ArtifactStore, DatasetStore, FsArtifactStore, FsDatasetStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
