//! Random forest inference
//!
//! Flat-array regression trees averaged into a forest. The trainer crate
//! builds these; the predictor only ever reads them.

pub mod model;
pub mod tree;

pub use model::{RandomForest, FOREST_VERSION};
pub use tree::{Node, Tree};
