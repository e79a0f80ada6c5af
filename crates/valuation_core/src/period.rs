//! Fetch periods and market recency windows
//!
//! A fetch period identifies the calendar month a batch of raw listings was
//! retrieved in. Every stage of the pipeline receives it explicitly.

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValuationError;

/// Recency windows (in days) a model is trained for
pub const MARKET_WINDOWS: [u32; 4] = [30, 60, 90, 180];

/// Calendar month of a listings snapshot, rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FetchPeriod {
    year: i32,
    month: u32,
}

impl FetchPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ValuationError> {
        if !(1..=12).contains(&month) {
            return Err(ValuationError::Config(format!(
                "fetch period month out of range: {year}-{month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Period containing the given timestamp
    pub fn from_datetime<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for FetchPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for FetchPeriod {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValuationError::Config(format!("invalid fetch period '{s}', expected YYYY-MM"));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for FetchPeriod {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FetchPeriod> for String {
    fn from(period: FetchPeriod) -> Self {
        period.to_string()
    }
}
