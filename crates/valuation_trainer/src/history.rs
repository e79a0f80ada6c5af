//! Fetch history
//!
//! The retrieval job appends one record per fetch to a JSON file. The most
//! recent record's date decides which fetch period the pipeline works on when
//! none is given explicitly.

use chrono::NaiveDateTime;
use rentval_core::FetchPeriod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::{Result, TrainerError};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRecord {
    #[serde(with = "date_format")]
    pub date: NaiveDateTime,
    pub num_requests: u32,
    pub num_listings: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchHistory {
    #[serde(default)]
    pub fetches: Vec<FetchRecord>,
}

impl FetchHistory {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| TrainerError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|e| TrainerError::json(path, e))
    }

    /// Most recent fetch by date, regardless of file order
    pub fn latest(&self) -> Option<&FetchRecord> {
        self.fetches.iter().max_by_key(|record| record.date)
    }

    pub fn latest_period(&self) -> Option<FetchPeriod> {
        self.latest()
            .map(|record| FetchPeriod::from_datetime(&record.date.and_utc()))
    }
}

/// Decide the fetch period for this run.
///
/// An explicit period wins. Otherwise the latest entry of the fetch history is
/// used; a missing or empty history is a configuration error.
pub fn resolve_period(explicit: Option<FetchPeriod>, history_path: &Path) -> Result<FetchPeriod> {
    if let Some(period) = explicit {
        return Ok(period);
    }

    if !history_path.exists() {
        return Err(TrainerError::Config(format!(
            "no fetch period given and no fetch history at {}",
            history_path.display()
        )));
    }

    let history = FetchHistory::load(history_path)?;
    let period = history.latest_period().ok_or_else(|| {
        TrainerError::Config(format!(
            "fetch history at {} has no entries",
            history_path.display()
        ))
    })?;

    info!(
        "Using fetch period {} from {}",
        period,
        history_path.display()
    );
    Ok(period)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_history(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join(".fetch_history.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_latest_entry_sets_period() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_history(
            dir.path(),
            r#"{"fetches": [
                {"date": "2025-03-02T09:15:00", "num_requests": 4, "num_listings": 1800},
                {"date": "2025-01-30T22:00:00", "num_requests": 3, "num_listings": 1500}
            ]}"#,
        );

        assert_eq!(resolve_period(None, &path)?, "2025-03".parse()?);
        Ok(())
    }

    #[test]
    fn test_explicit_period_wins() -> anyhow::Result<()> {
        let explicit: FetchPeriod = "2024-11".parse()?;
        let period = resolve_period(Some(explicit), Path::new("/nonexistent/history.json"))?;
        assert_eq!(period, explicit);
        Ok(())
    }

    #[test]
    fn test_missing_history_is_config_error() {
        let err = resolve_period(None, Path::new("/nonexistent/history.json")).unwrap_err();
        assert!(matches!(err, TrainerError::Config(_)));
    }

    #[test]
    fn test_empty_history_is_config_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_history(dir.path(), r#"{"fetches": []}"#);

        let err = resolve_period(None, &path).unwrap_err();
        assert!(matches!(err, TrainerError::Config(_)));
        Ok(())
    }

    #[test]
    fn test_record_date_format_roundtrip() -> anyhow::Result<()> {
        let record: FetchRecord = serde_json::from_str(
            r#"{"date": "2025-02-14T08:30:00", "num_requests": 2, "num_listings": 900}"#,
        )?;
        let json = serde_json::to_string(&record)?;
        assert!(json.contains("\"2025-02-14T08:30:00\""));
        Ok(())
    }
}
