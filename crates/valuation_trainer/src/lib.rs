//! Rentval trainer - listing cleaning and per-window model training
//!
//! Turns a period's raw listing snapshots into a cleaned dataset, then fits
//! one reproducible random forest per market window and stores it as a
//! self-contained artifact for the predictor in `rentval-core`.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod history;
pub mod imputation;
pub mod metrics;
pub mod pipeline;
pub mod trainer;
pub mod window;

pub use config::PipelineConfig;
pub use dataset::{ListingRecord, ListingStatus, MergedTable};
pub use deterministic::LcgRng;
pub use errors::TrainerError;
pub use forest::{ForestConfig, ForestTrainer};
pub use history::{resolve_period, FetchHistory, FetchRecord};
pub use imputation::{impute_listings, CleanedDataset};
pub use pipeline::Pipeline;
pub use trainer::{TrainedWindow, TrainingReport, WindowTrainer};
pub use window::{WindowDatasetBuilder, WindowSplit};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
