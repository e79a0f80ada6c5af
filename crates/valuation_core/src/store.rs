//! Artifact and processed-dataset stores
//!
//! Both stores are keyed by fetch period (and window, for artifacts). The
//! filesystem implementations follow the on-disk naming the rest of the
//! tooling expects:
//!
//! - `rf-model_{w}d_{period}.json` / `rf-model_{w}d_meta_{period}.json`
//! - `listings_{period}.csv` / `listings_{period}.stats.json`

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact::{ArtifactMetadata, ModelArtifact};
use crate::errors::{Result, ValuationError};
use crate::features::ImputationStats;
use crate::listing::{CleanedListing, ANALYSIS_COLUMNS};
use crate::period::FetchPeriod;
use crate::serialization::{to_canonical_json, to_canonical_json_pretty};

/// Read/write access to trained artifacts
pub trait ArtifactStore {
    /// Persist an artifact and its metadata, replacing any previous run
    fn save_artifact(&self, artifact: &ModelArtifact, metadata: &ArtifactMetadata) -> Result<()>;

    /// Load and validate the artifact for (window, period)
    fn load_artifact(&self, window_days: u32, period: FetchPeriod) -> Result<ModelArtifact>;

    fn load_metadata(&self, window_days: u32, period: FetchPeriod) -> Result<ArtifactMetadata>;
}

/// Read/write access to cleaned datasets
pub trait DatasetStore {
    fn save_dataset(
        &self,
        period: FetchPeriod,
        rows: &[CleanedListing],
        stats: &ImputationStats,
    ) -> Result<()>;

    fn load_dataset(&self, period: FetchPeriod) -> Result<(Vec<CleanedListing>, ImputationStats)>;
}

/// Write `contents` next to `path` and rename it into place
fn write_replace(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ValuationError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| ValuationError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ValuationError::io(path, e))?;
    Ok(())
}

fn read_existing(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ValuationError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| ValuationError::io(path, e))
}

/// Artifacts stored as canonical JSON files in one directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, window_days: u32, period: FetchPeriod) -> PathBuf {
        self.dir.join(format!("rf-model_{window_days}d_{period}.json"))
    }

    pub fn metadata_path(&self, window_days: u32, period: FetchPeriod) -> PathBuf {
        self.dir
            .join(format!("rf-model_{window_days}d_meta_{period}.json"))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save_artifact(&self, artifact: &ModelArtifact, metadata: &ArtifactMetadata) -> Result<()> {
        artifact.validate()?;

        let window = artifact.window_days;
        let period = artifact.fetch_period;
        let artifact_path = self.artifact_path(window, period);
        let metadata_path = self.metadata_path(window, period);

        write_replace(&artifact_path, to_canonical_json(artifact)?.as_bytes())?;
        write_replace(&metadata_path, to_canonical_json_pretty(metadata)?.as_bytes())?;

        info!("Saved {}", artifact_path.display());
        Ok(())
    }

    fn load_artifact(&self, window_days: u32, period: FetchPeriod) -> Result<ModelArtifact> {
        let path = self.artifact_path(window_days, period);
        let artifact: ModelArtifact = serde_json::from_str(&read_existing(&path)?)?;

        if artifact.window_days != window_days || artifact.fetch_period != period {
            return Err(ValuationError::InvalidArtifact(format!(
                "{} holds {}d/{}, expected {window_days}d/{period}",
                path.display(),
                artifact.window_days,
                artifact.fetch_period
            )));
        }
        artifact.validate()?;
        Ok(artifact)
    }

    fn load_metadata(&self, window_days: u32, period: FetchPeriod) -> Result<ArtifactMetadata> {
        let path = self.metadata_path(window_days, period);
        Ok(serde_json::from_str(&read_existing(&path)?)?)
    }
}

/// Cleaned datasets stored as CSV with a JSON sidecar for imputation stats
#[derive(Debug, Clone)]
pub struct FsDatasetStore {
    dir: PathBuf,
}

impl FsDatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dataset_path(&self, period: FetchPeriod) -> PathBuf {
        self.dir.join(format!("listings_{period}.csv"))
    }

    pub fn stats_path(&self, period: FetchPeriod) -> PathBuf {
        self.dir.join(format!("listings_{period}.stats.json"))
    }
}

impl DatasetStore for FsDatasetStore {
    fn save_dataset(
        &self,
        period: FetchPeriod,
        rows: &[CleanedListing],
        stats: &ImputationStats,
    ) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ValuationError::io(self.dataset_path(period), e.into_error()))?;

        write_replace(&self.dataset_path(period), &bytes)?;
        write_replace(
            &self.stats_path(period),
            to_canonical_json_pretty(stats)?.as_bytes(),
        )?;

        info!(
            "Saved {} cleaned listings to {}",
            rows.len(),
            self.dataset_path(period).display()
        );
        Ok(())
    }

    fn load_dataset(&self, period: FetchPeriod) -> Result<(Vec<CleanedListing>, ImputationStats)> {
        let path = self.dataset_path(period);
        if !path.exists() {
            return Err(ValuationError::NotFound(path));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        for column in ANALYSIS_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ValuationError::Schema(format!(
                    "{} is missing column '{column}'",
                    path.display()
                )));
            }
        }

        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<CleanedListing>, _>>()?;

        let stats: ImputationStats =
            serde_json::from_str(&read_existing(&self.stats_path(period))?)?;

        Ok((rows, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn period() -> FetchPeriod {
        "2025-02".parse().unwrap()
    }

    fn rows() -> Vec<CleanedListing> {
        vec![
            CleanedListing {
                id: "a-1".to_string(),
                zip_code: "10009".to_string(),
                bedrooms: 2,
                bathrooms: 1.0,
                square_footage: 450.0,
                price: 4200.0,
                days_since_seen: 3,
                year_built: 1910,
            },
            CleanedListing {
                id: "a-2".to_string(),
                zip_code: "11211".to_string(),
                bedrooms: 0,
                bathrooms: 1.5,
                square_footage: 380.5,
                price: 2900.0,
                days_since_seen: 45,
                year_built: 2004,
            },
        ]
    }

    fn stats() -> ImputationStats {
        ImputationStats {
            bathrooms_median: 1.0,
            square_footage_median: 415.25,
            year_built_median: 1957.0,
        }
    }

    #[test]
    fn test_dataset_roundtrip() -> Result<()> {
        let dir = TempDir::new().map_err(|e| ValuationError::io("tmp", e))?;
        let store = FsDatasetStore::new(dir.path());

        store.save_dataset(period(), &rows(), &stats())?;
        let (loaded, loaded_stats) = store.load_dataset(period())?;

        assert_eq!(loaded, rows());
        assert_eq!(loaded_stats, stats());
        Ok(())
    }

    #[test]
    fn test_missing_column_is_schema_error() -> Result<()> {
        let dir = TempDir::new().map_err(|e| ValuationError::io("tmp", e))?;
        let store = FsDatasetStore::new(dir.path());
        fs::write(
            store.dataset_path(period()),
            "id,zipCode,bedrooms,bathrooms,price,daysSinceSeen,yearBuilt\n",
        )
        .map_err(|e| ValuationError::io("csv", e))?;

        let err = store.load_dataset(period()).unwrap_err();
        assert!(matches!(err, ValuationError::Schema(msg) if msg.contains("squareFootage")));
        Ok(())
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(matches!(
            store.load_artifact(30, period()),
            Err(ValuationError::NotFound(_))
        ));
    }

    #[test]
    fn test_artifact_paths() {
        let store = FsArtifactStore::new("models");
        assert_eq!(
            store.artifact_path(90, period()),
            PathBuf::from("models/rf-model_90d_2025-02.json")
        );
        assert_eq!(
            store.metadata_path(90, period()),
            PathBuf::from("models/rf-model_90d_meta_2025-02.json")
        );
    }
}
