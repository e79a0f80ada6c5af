//! Feature construction shared by training and prediction
//!
//! Both the trainer (on historical rows) and the predictor (on a single new
//! listing) go through [`build_features`] with the statistics frozen into an
//! artifact, so the two paths cannot drift apart.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::encoding::ZipTargetEncoder;
use crate::errors::{Result, ValuationError};
use crate::listing::{CleanedListing, NewListing};

/// Model input columns, in the order the trainer emits them
pub const FEATURE_NAMES: [&str; 5] = [
    "bedrooms",
    "bathrooms",
    "squareFootage",
    "yearBuilt",
    "zipCodeEncoded",
];

/// Default feature order as owned strings, as stored in artifacts
pub fn default_feature_order() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Dataset-wide medians used as the last imputation fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    pub bathrooms_median: f64,
    pub square_footage_median: f64,
    pub year_built_median: f64,
}

/// Raw attributes of one listing before encoding and imputation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureInput<'a> {
    pub zip_code: &'a str,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_footage: Option<f64>,
    pub year_built: Option<f64>,
}

impl<'a> From<&'a CleanedListing> for FeatureInput<'a> {
    fn from(row: &'a CleanedListing) -> Self {
        Self {
            zip_code: &row.zip_code,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            square_footage: Some(row.square_footage),
            year_built: Some(f64::from(row.year_built)),
        }
    }
}

impl<'a> From<&'a NewListing> for FeatureInput<'a> {
    fn from(listing: &'a NewListing) -> Self {
        Self {
            zip_code: &listing.zip_code,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            square_footage: listing.sqft,
            year_built: listing.year_built.map(f64::from),
        }
    }
}

/// Check that a stored feature order only names known, distinct features
pub fn validate_feature_order(feature_names: &[String]) -> Result<()> {
    if feature_names.is_empty() {
        return Err(ValuationError::Schema("feature order is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for name in feature_names {
        if !FEATURE_NAMES.contains(&name.as_str()) {
            return Err(ValuationError::Schema(format!("unknown feature '{name}'")));
        }
        if !seen.insert(name.as_str()) {
            return Err(ValuationError::Schema(format!("duplicate feature '{name}'")));
        }
    }
    Ok(())
}

/// Build one feature row in exactly `feature_names` order
pub fn build_features(
    input: &FeatureInput<'_>,
    encoder: &ZipTargetEncoder,
    stats: &ImputationStats,
    feature_names: &[String],
) -> Result<Vec<f64>> {
    let square_footage = input.square_footage.unwrap_or(stats.square_footage_median);
    let year_built = input.year_built.unwrap_or(stats.year_built_median);

    feature_names
        .iter()
        .map(|name| match name.as_str() {
            "bedrooms" => Ok(f64::from(input.bedrooms)),
            "bathrooms" => Ok(input.bathrooms),
            "squareFootage" => Ok(square_footage),
            "yearBuilt" => Ok(year_built),
            "zipCodeEncoded" => Ok(encoder.encode(input.zip_code)),
            other => Err(ValuationError::Schema(format!("unknown feature '{other}'"))),
        })
        .collect()
}

/// Build the feature matrix for a slice of cleaned rows
pub fn build_feature_matrix(
    rows: &[CleanedListing],
    encoder: &ZipTargetEncoder,
    stats: &ImputationStats,
    feature_names: &[String],
) -> Result<Vec<Vec<f64>>> {
    rows.iter()
        .map(|row| build_features(&FeatureInput::from(row), encoder, stats, feature_names))
        .collect()
}
