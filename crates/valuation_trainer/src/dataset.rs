//! Raw listing ingestion
//!
//! Reads the active and inactive JSON snapshots for a fetch period, aligns
//! their schemas and parses rows into typed [`ListingRecord`]s. Rows missing a
//! required attribute are dropped with a warning; a column missing from the
//! whole table is a schema error.

use chrono::{DateTime, Utc};
use rentval_core::FetchPeriod;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::{Result, TrainerError};

/// Columns the merged raw table must provide
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "zipCode",
    "bedrooms",
    "bathrooms",
    "squareFootage",
    "price",
    "lastSeenDate",
    "yearBuilt",
];

/// One raw listing object as delivered by the listings source
pub type RawRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    Active,
    Inactive,
}

impl ListingStatus {
    fn file_prefix(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("Active"),
            Self::Inactive => f.write_str("Inactive"),
        }
    }
}

/// A parsed listing observation
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub zip_code: String,
    pub bedrooms: u32,
    pub bathrooms: Option<f64>,
    pub square_footage: Option<f64>,
    pub year_built: Option<f64>,
    pub price: f64,
    pub listed_date: Option<DateTime<Utc>>,
    pub removed_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_seen_date: DateTime<Utc>,
    pub status: ListingStatus,
}

/// Active and inactive rows after schema alignment
#[derive(Debug, Clone, Default)]
pub struct MergedTable {
    pub rows: Vec<(ListingStatus, RawRow)>,
    /// Columns present in only one status subset, removed before the union
    pub dropped_columns: BTreeSet<String>,
}

impl MergedTable {
    /// Union of keys over all rows
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|(_, row)| row.keys().map(String::as_str))
            .collect()
    }
}

pub fn raw_listing_path(raw_dir: &Path, status: ListingStatus, period: FetchPeriod) -> PathBuf {
    raw_dir.join(format!("{}_listings_{period}.json", status.file_prefix()))
}

/// Read one JSON array of listing objects
pub fn load_raw_table(path: &Path) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path).map_err(|e| TrainerError::io(path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| TrainerError::json(path, e))?;

    let Value::Array(items) = value else {
        return Err(TrainerError::Schema(format!(
            "{}: expected a JSON array of listings",
            path.display()
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(TrainerError::Schema(format!(
                "{}: entry {idx} is not a listing object",
                path.display()
            ))),
        })
        .collect()
}

/// Load the active and inactive snapshots for a period
pub fn load_raw_listings(raw_dir: &Path, period: FetchPeriod) -> Result<(Vec<RawRow>, Vec<RawRow>)> {
    let active = load_raw_table(&raw_listing_path(raw_dir, ListingStatus::Active, period))?;
    let inactive = load_raw_table(&raw_listing_path(raw_dir, ListingStatus::Inactive, period))?;

    info!("Total active listings: {}", active.len());
    info!("Total inactive listings: {}", inactive.len());
    info!("Total listings: {}", active.len() + inactive.len());

    Ok((active, inactive))
}

fn key_set(rows: &[RawRow]) -> BTreeSet<String> {
    rows.iter().flat_map(|row| row.keys().cloned()).collect()
}

/// Union active and inactive rows, dropping columns only one subset carries.
///
/// When either subset is empty there is nothing to align against and all
/// columns are kept.
pub fn merge_active_inactive(active: Vec<RawRow>, inactive: Vec<RawRow>) -> MergedTable {
    let dropped_columns: BTreeSet<String> = if active.is_empty() || inactive.is_empty() {
        BTreeSet::new()
    } else {
        key_set(&active)
            .symmetric_difference(&key_set(&inactive))
            .cloned()
            .collect()
    };

    if !dropped_columns.is_empty() {
        info!("Dropping columns not shared by both subsets: {:?}", dropped_columns);
    }

    let rows = active
        .into_iter()
        .map(|row| (ListingStatus::Active, row))
        .chain(inactive.into_iter().map(|row| (ListingStatus::Inactive, row)))
        .map(|(status, mut row)| {
            row.retain(|key, _| !dropped_columns.contains(key));
            (status, row)
        })
        .collect();

    MergedTable {
        rows,
        dropped_columns,
    }
}

fn text_field(row: &RawRow, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(row: &RawRow, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Unparsable timestamps are treated as missing
fn date_field(row: &RawRow, key: &str) -> Option<DateTime<Utc>> {
    match row.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    }
}

fn parse_row(status: ListingStatus, row: &RawRow) -> std::result::Result<ListingRecord, String> {
    let id = text_field(row, "id").ok_or("missing id")?;
    let zip_code = text_field(row, "zipCode").ok_or("missing zipCode")?;

    let bedrooms = number_field(row, "bedrooms").ok_or("missing bedrooms")?;
    if bedrooms < 0.0 || bedrooms.fract() != 0.0 {
        return Err(format!("invalid bedroom count {bedrooms}"));
    }

    let price = number_field(row, "price").ok_or("missing price")?;
    if price <= 0.0 {
        return Err(format!("non-positive price {price}"));
    }

    let last_seen_date = date_field(row, "lastSeenDate").ok_or("missing lastSeenDate")?;

    Ok(ListingRecord {
        id,
        zip_code,
        bedrooms: bedrooms as u32,
        bathrooms: number_field(row, "bathrooms"),
        square_footage: number_field(row, "squareFootage"),
        year_built: number_field(row, "yearBuilt"),
        price,
        listed_date: date_field(row, "listedDate"),
        removed_date: date_field(row, "removedDate"),
        created_date: date_field(row, "createdDate"),
        last_seen_date,
        status,
    })
}

/// Parse the merged table, checking that every required column exists
pub fn parse_records(table: &MergedTable) -> Result<Vec<ListingRecord>> {
    let columns = table.columns();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !columns.contains(column))
        .collect();
    if !missing.is_empty() {
        return Err(TrainerError::Schema(format!(
            "raw listings are missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;

    for (idx, (status, row)) in table.rows.iter().enumerate() {
        match parse_row(*status, row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                let id = text_field(row, "id").unwrap_or_else(|| format!("#{idx}"));
                warn!(listing = %id, status = %status, "dropping listing: {reason}");
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {dropped} of {} raw listings", table.rows.len());
    }
    if records.is_empty() {
        return Err(TrainerError::Dataset(
            "no usable listings after parsing".to_string(),
        ));
    }

    Ok(records)
}
