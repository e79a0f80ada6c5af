//! Valuation predictor
//!
//! Rebuilds the training-time feature row for a new listing from an
//! artifact's frozen statistics, predicts a fair rent and classifies how far
//! the asking rent deviates from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::artifact::ModelArtifact;
use crate::errors::{Result, ValuationError};
use crate::features::{build_features, FeatureInput};
use crate::listing::NewListing;
use crate::period::FetchPeriod;
use crate::store::ArtifactStore;

/// Deviation (percent) beyond which a listing is over- or underpriced
pub const PRICE_BAND_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceClass {
    #[serde(rename = "Overpriced")]
    Overpriced,
    #[serde(rename = "Underpriced")]
    Underpriced,
    #[serde(rename = "Fairly Priced")]
    FairlyPriced,
}

impl PriceClass {
    /// Strict inequalities: exactly ±10% is still fairly priced
    pub fn from_percent_difference(pct_diff: f64) -> Self {
        if pct_diff > PRICE_BAND_PCT {
            Self::Overpriced
        } else if pct_diff < -PRICE_BAND_PCT {
            Self::Underpriced
        } else {
            Self::FairlyPriced
        }
    }
}

impl fmt::Display for PriceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Overpriced => "Overpriced",
            Self::Underpriced => "Underpriced",
            Self::FairlyPriced => "Fairly Priced",
        };
        f.write_str(label)
    }
}

/// Result of valuing one listing against one window's model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Predicted rent, rounded to cents
    pub predicted_rent: f64,
    pub classification: PriceClass,
    /// Asking vs predicted, percent, one decimal
    pub percent_difference: f64,
}

/// Round half to even at the given number of decimals
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Percent by which `asking` exceeds `predicted`
pub fn percent_difference(asking: f64, predicted: f64) -> Result<f64> {
    if !(predicted.is_finite() && predicted > 0.0) {
        return Err(ValuationError::Prediction(format!(
            "predicted rent {predicted} is not a positive amount"
        )));
    }
    Ok((asking - predicted) / predicted * 100.0)
}

/// Value one listing with one artifact
pub fn predict_rent(listing: &NewListing, artifact: &ModelArtifact) -> Result<Valuation> {
    let features = build_features(
        &FeatureInput::from(listing),
        &artifact.zip_encoding,
        &artifact.imputation,
        &artifact.features,
    )?;

    let log_pred = artifact.model.predict(&features)?;
    let rent_pred = log_pred.exp_m1();
    let pct_diff = percent_difference(listing.rent, rent_pred)?;

    debug!(
        window = artifact.window_days,
        period = %artifact.fetch_period,
        rent_pred,
        pct_diff,
        "valued listing"
    );

    Ok(Valuation {
        predicted_rent: round_to(rent_pred, 2),
        classification: PriceClass::from_percent_difference(pct_diff),
        percent_difference: round_to(pct_diff, 1),
    })
}

/// Value one listing against every window's artifact for a fetch period
pub fn predict_all<S: ArtifactStore + ?Sized>(
    listing: &NewListing,
    store: &S,
    windows: &[u32],
    period: FetchPeriod,
) -> Result<BTreeMap<u32, Valuation>> {
    let mut valuations = BTreeMap::new();

    for &window in windows {
        let artifact = store.load_artifact(window, period)?;
        let valuation = predict_rent(listing, &artifact).map_err(|err| match err {
            ValuationError::Schema(msg) => {
                ValuationError::Schema(format!("{window}d/{period}: {msg}"))
            }
            ValuationError::Prediction(msg) => {
                ValuationError::Prediction(format!("{window}d/{period}: {msg}"))
            }
            other => other,
        })?;
        valuations.insert(window, valuation);
    }

    Ok(valuations)
}
