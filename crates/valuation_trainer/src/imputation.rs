//! Imputation engine
//!
//! Produces the cleaned dataset from parsed listing records:
//!
//! 1. Missing bathrooms take the dataset-wide median.
//! 2. Missing floor area / construction year take the median of listings
//!    sharing (zip, bedrooms, bathrooms), falling back to the dataset-wide
//!    median when the group has no observed value.
//! 3. Construction year is rounded (ties to even) to an integer year.
//!
//! It also derives `daysSinceSeen` against the newest last-seen timestamp in
//! the batch. A median over zero observations is an error, never a silent NaN.

use rentval_core::{CleanedListing, ImputationStats};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::dataset::ListingRecord;
use crate::errors::{Result, TrainerError};

/// Median of the given values; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn global_median(values: impl Iterator<Item = Option<f64>>, column: &'static str) -> Result<f64> {
    let observed: Vec<f64> = values.flatten().collect();
    median(&observed).ok_or(TrainerError::NoObservations { column })
}

/// Grouping key for hierarchical imputation; bathrooms compared bitwise
type GroupKey<'a> = (&'a str, u32, u64);

fn group_medians<'a>(
    keys: &[GroupKey<'a>],
    values: &[Option<f64>],
) -> HashMap<GroupKey<'a>, f64> {
    let mut groups: HashMap<GroupKey<'a>, Vec<f64>> = HashMap::new();
    for (key, value) in keys.iter().zip(values) {
        if let Some(v) = value {
            groups.entry(*key).or_default().push(*v);
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, observed)| median(&observed).map(|m| (key, m)))
        .collect()
}

fn fill_hierarchical<'a>(
    keys: &[GroupKey<'a>],
    values: &[Option<f64>],
    fallback: f64,
) -> (Vec<f64>, usize, usize) {
    let medians = group_medians(keys, values);
    let mut from_group = 0;
    let mut from_global = 0;

    let filled = keys
        .iter()
        .zip(values)
        .map(|(key, value)| match value {
            Some(v) => *v,
            None => match medians.get(key) {
                Some(m) => {
                    from_group += 1;
                    *m
                }
                None => {
                    from_global += 1;
                    fallback
                }
            },
        })
        .collect();

    (filled, from_group, from_global)
}

/// Output of the imputation engine
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub rows: Vec<CleanedListing>,
    pub stats: ImputationStats,
}

/// Clean and impute parsed records. The input is not modified.
pub fn impute_listings(records: &[ListingRecord]) -> Result<CleanedDataset> {
    let Some(reference) = records.iter().map(|r| r.last_seen_date).max() else {
        return Err(TrainerError::Dataset("no listings to clean".to_string()));
    };

    let bathrooms_median = global_median(records.iter().map(|r| r.bathrooms), "bathrooms")?;
    let square_footage_median =
        global_median(records.iter().map(|r| r.square_footage), "squareFootage")?;
    let year_built_median = global_median(records.iter().map(|r| r.year_built), "yearBuilt")?;

    let bathrooms: Vec<f64> = records
        .iter()
        .map(|r| r.bathrooms.unwrap_or(bathrooms_median))
        .collect();

    let keys: Vec<GroupKey<'_>> = records
        .iter()
        .zip(&bathrooms)
        .map(|(r, baths)| (r.zip_code.as_str(), r.bedrooms, baths.to_bits()))
        .collect();

    let sqft_observed: Vec<Option<f64>> = records.iter().map(|r| r.square_footage).collect();
    let (square_footage, sqft_group, sqft_global) =
        fill_hierarchical(&keys, &sqft_observed, square_footage_median);

    let year_observed: Vec<Option<f64>> = records.iter().map(|r| r.year_built).collect();
    let (year_built, year_group, year_global) =
        fill_hierarchical(&keys, &year_observed, year_built_median);

    debug!(sqft_group, sqft_global, year_group, year_global, "imputation sources");

    let rows: Vec<CleanedListing> = records
        .iter()
        .enumerate()
        .map(|(i, r)| CleanedListing {
            id: r.id.clone(),
            zip_code: r.zip_code.clone(),
            bedrooms: r.bedrooms,
            bathrooms: bathrooms[i],
            square_footage: square_footage[i],
            price: r.price,
            days_since_seen: (reference - r.last_seen_date).num_days(),
            year_built: year_built[i].round_ties_even() as i32,
        })
        .collect();

    info!(
        "Cleaned {} listings (bathrooms median {}, sqft median {}, year median {})",
        rows.len(),
        bathrooms_median,
        square_footage_median,
        year_built_median
    );

    Ok(CleanedDataset {
        rows,
        stats: ImputationStats {
            bathrooms_median,
            square_footage_median,
            year_built_median,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ListingStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn record(
        id: &str,
        zip: &str,
        bedrooms: u32,
        bathrooms: Option<f64>,
        sqft: Option<f64>,
        year: Option<f64>,
        days_ago: i64,
    ) -> ListingRecord {
        let newest = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        ListingRecord {
            id: id.to_string(),
            zip_code: zip.to_string(),
            bedrooms,
            bathrooms,
            square_footage: sqft,
            year_built: year,
            price: 3000.0,
            listed_date: None,
            removed_date: None,
            created_date: None,
            last_seen_date: newest - Duration::days(days_ago),
            status: ListingStatus::Active,
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_group_median_fills_floor_area() -> Result<()> {
        let records = vec![
            record("a", "10009", 2, Some(1.0), Some(400.0), Some(1900.0), 0),
            record("b", "10009", 2, Some(1.0), Some(500.0), Some(1910.0), 0),
            record("c", "10009", 2, Some(1.0), None, Some(1920.0), 0),
            record("d", "11211", 1, Some(1.0), Some(900.0), Some(2000.0), 0),
        ];

        let cleaned = impute_listings(&records)?;
        // Group (10009, 2, 1) median = 450
        assert_eq!(cleaned.rows[2].square_footage, 450.0);
        Ok(())
    }

    #[test]
    fn test_observed_floor_area_unchanged() -> Result<()> {
        let records = vec![
            record("a", "10009", 2, Some(1.0), Some(401.5), None, 0),
            record("b", "10009", 2, None, None, Some(1910.0), 3),
            record("c", "11211", 0, Some(1.0), Some(333.0), Some(1950.0), 9),
        ];

        let cleaned = impute_listings(&records)?;
        for (original, row) in records.iter().zip(&cleaned.rows) {
            if let Some(sqft) = original.square_footage {
                assert_eq!(row.square_footage, sqft);
            }
        }
        Ok(())
    }

    #[test]
    fn test_empty_group_falls_back_to_global_median() -> Result<()> {
        let records = vec![
            record("a", "10009", 2, Some(1.0), Some(400.0), Some(1900.0), 0),
            record("b", "10009", 2, Some(1.0), Some(600.0), Some(1920.0), 0),
            record("c", "10451", 3, Some(2.0), None, None, 0),
        ];

        let cleaned = impute_listings(&records)?;
        assert_eq!(cleaned.stats.square_footage_median, 500.0);
        assert_eq!(cleaned.rows[2].square_footage, 500.0);
        // Year fallback uses the year median, not the floor-area median
        assert_eq!(cleaned.rows[2].year_built, 1910);
        Ok(())
    }

    #[test]
    fn test_bathrooms_use_global_median_before_grouping() -> Result<()> {
        let records = vec![
            record("a", "10009", 1, Some(1.0), Some(500.0), Some(1900.0), 0),
            record("b", "10009", 1, Some(1.0), Some(700.0), Some(1900.0), 0),
            record("c", "10009", 1, Some(2.0), Some(900.0), Some(1900.0), 0),
            record("d", "10009", 1, None, None, Some(1900.0), 0),
        ];

        let cleaned = impute_listings(&records)?;
        assert_eq!(cleaned.rows[3].bathrooms, 1.0);
        // Joins the (10009, 1, 1.0) group: median(500, 700)
        assert_eq!(cleaned.rows[3].square_footage, 600.0);
        Ok(())
    }

    #[test]
    fn test_year_rounds_ties_to_even() -> Result<()> {
        let records = vec![
            record("a", "10009", 1, Some(1.0), Some(500.0), Some(1920.0), 0),
            record("b", "10009", 1, Some(1.0), Some(500.0), Some(1925.0), 0),
            record("c", "10009", 1, Some(1.0), Some(500.0), None, 0),
            record("d", "10009", 1, Some(1.0), Some(500.0), Some(1931.0), 0),
        ];

        let cleaned = impute_listings(&records)?;
        // Group median of 1920, 1925, 1931 = 1925
        assert_eq!(cleaned.rows[2].year_built, 1925);

        let halves = vec![
            record("a", "10009", 1, Some(1.0), Some(500.0), Some(1920.0), 0),
            record("b", "10009", 1, Some(1.0), Some(500.0), Some(1925.0), 0),
            record("c", "10009", 1, Some(1.0), Some(500.0), None, 0),
        ];
        // median(1920, 1925) = 1922.5 -> 1922
        assert_eq!(impute_listings(&halves)?.rows[2].year_built, 1922);
        Ok(())
    }

    #[test]
    fn test_days_since_seen_anchor_to_newest_listing() -> Result<()> {
        let records = vec![
            record("a", "10009", 1, Some(1.0), Some(500.0), Some(1920.0), 0),
            record("b", "10009", 1, Some(1.0), Some(500.0), Some(1920.0), 31),
            record("c", "10009", 1, Some(1.0), Some(500.0), Some(1920.0), 200),
        ];

        let days: Vec<i64> = impute_listings(&records)?
            .rows
            .iter()
            .map(|r| r.days_since_seen)
            .collect();
        assert_eq!(days, vec![0, 31, 200]);
        Ok(())
    }

    #[test]
    fn test_all_missing_column_fails_loudly() {
        let records = vec![
            record("a", "10009", 1, Some(1.0), None, Some(1920.0), 0),
            record("b", "10009", 1, Some(1.0), None, Some(1930.0), 0),
        ];

        let err = impute_listings(&records).unwrap_err();
        assert!(matches!(
            err,
            TrainerError::NoObservations {
                column: "squareFootage"
            }
        ));
    }
}
