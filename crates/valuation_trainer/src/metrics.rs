//! Held-out evaluation metrics

use rentval_core::EvaluationMetrics;

use crate::errors::{Result, TrainerError};

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(TrainerError::Training(
            "cannot evaluate on an empty test split".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(TrainerError::Training(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok((sse / actual.len() as f64).sqrt())
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: the score is 1.0 when it is
/// predicted exactly and 0.0 otherwise.
pub fn r2(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;

    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<EvaluationMetrics> {
    Ok(EvaluationMetrics {
        rmse: rmse(actual, predicted)?,
        r2: r2(actual, predicted)?,
    })
}
