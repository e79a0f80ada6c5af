//! Listing rows shared between the cleaning, training and prediction paths

use serde::{Deserialize, Serialize};

/// Columns kept in the cleaned dataset, in on-disk order
pub const ANALYSIS_COLUMNS: [&str; 8] = [
    "id",
    "zipCode",
    "bedrooms",
    "bathrooms",
    "squareFootage",
    "price",
    "daysSinceSeen",
    "yearBuilt",
];

/// One row of the cleaned dataset. Every attribute is present after imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedListing {
    pub id: String,
    pub zip_code: String,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_footage: f64,
    pub price: f64,
    pub days_since_seen: i64,
    pub year_built: i32,
}

/// A listing submitted for valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub bedrooms: u32,
    pub bathrooms: f64,
    #[serde(default)]
    pub sqft: Option<f64>,
    pub zip_code: String,
    #[serde(default)]
    pub year_built: Option<i32>,
    /// Asking rent
    pub rent: f64,
}
