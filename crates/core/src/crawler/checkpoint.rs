//! Crash-safe checkpointing and idempotent merge.
//!
//! During a run the accumulated titles are periodically serialized to
//! uniquely named temp artifacts. At finalization every temp artifact plus
//! the prior canonical artifact collapse into one map keyed by local title
//! ID (last write wins), written atomically and sorted so repeating the
//! merge yields byte-identical output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Title, TitleKind};

/// Checkpoint storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Directory for temp snapshot artifacts.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory of the canonical artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// Errors from checkpoint I/O.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Unique titles in the canonical artifact after merging.
    pub unique_titles: usize,
    /// Temp snapshot files consumed and deleted.
    pub snapshots_merged: usize,
}

/// Timestamped snapshot + last-write-wins merge storage, one artifact
/// family per title kind.
pub struct CheckpointStore {
    temp_dir: PathBuf,
    data_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(config: &CheckpointConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            data_dir: config.data_dir.clone(),
        }
    }

    fn canonical_path(&self, kind: TitleKind) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", kind.artifact_prefix()))
    }

    /// Serialize the given titles to a uniquely named temp artifact.
    ///
    /// The name carries a timestamp plus a sequence number so snapshots
    /// written within the same instant stay distinct and name order equals
    /// write order.
    pub fn save_snapshot(
        &self,
        kind: TitleKind,
        titles: &[Title],
    ) -> Result<PathBuf, CheckpointError> {
        static SNAPSHOT_SEQ: AtomicU64 = AtomicU64::new(0);

        fs::create_dir_all(&self.temp_dir)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let seq = SNAPSHOT_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self
            .temp_dir
            .join(format!("{}_{}_{:04}.json", kind.artifact_prefix(), stamp, seq));

        let json = serde_json::to_vec_pretty(titles)?;
        fs::write(&path, json)?;

        info!(count = titles.len(), path = %path.display(), "progress saved");
        Ok(path)
    }

    /// List this kind's temp snapshot files, in name (= time) order.
    fn snapshot_files(&self, kind: TitleKind) -> Result<Vec<PathBuf>, CheckpointError> {
        let prefix = format!("{}_", kind.artifact_prefix());
        let mut files = Vec::new();

        let entries = match fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.starts_with(&prefix) && name.ends_with(".json") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_titles(path: &Path) -> Result<Vec<Title>, CheckpointError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Load the canonical artifact; absent means an empty catalog.
    pub fn load_canonical(&self, kind: TitleKind) -> Result<Vec<Title>, CheckpointError> {
        let path = self.canonical_path(kind);
        match fs::read(&path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge the canonical artifact and all temp snapshots, last write wins
    /// per local ID, and replace the canonical artifact atomically.
    ///
    /// Unreadable snapshot files are skipped with a warning so a partial
    /// write from a crash never blocks finalization. Consumed snapshots are
    /// deleted. Output is sorted by local ID, making the merge idempotent
    /// down to the byte.
    pub fn merge(&self, kind: TitleKind) -> Result<MergeReport, CheckpointError> {
        let mut by_id: std::collections::BTreeMap<String, Title> = std::collections::BTreeMap::new();

        for title in self.load_canonical(kind)? {
            by_id.insert(title.local_id().to_string(), title);
        }

        let snapshots = self.snapshot_files(kind)?;
        let mut merged = 0usize;

        for path in &snapshots {
            match Self::read_titles(path) {
                Ok(titles) => {
                    for title in titles {
                        by_id.insert(title.local_id().to_string(), title);
                    }
                    merged += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable snapshot");
                }
            }
        }

        let all: Vec<&Title> = by_id.values().collect();
        let canonical = self.canonical_path(kind);
        let tmp = canonical.with_extension("json.tmp");

        if let Some(parent) = canonical.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, serde_json::to_vec_pretty(&all)?)?;
        fs::rename(&tmp, &canonical)?;

        for path in &snapshots {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove snapshot");
            }
        }

        debug!(
            kind = kind.artifact_prefix(),
            unique = by_id.len(),
            snapshots = merged,
            "merge complete"
        );

        Ok(MergeReport {
            unique_titles: by_id.len(),
            snapshots_merged: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Movie, SiteDetails};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(&CheckpointConfig {
            temp_dir: dir.path().join("temp"),
            data_dir: dir.path().to_path_buf(),
        })
    }

    fn make_title(id: &str, name: &str) -> Title {
        Title::Movie(Movie {
            movie_id: id.to_string(),
            title: name.to_string(),
            description: String::new(),
            details: SiteDetails::default(),
            files: vec![],
            metadata: None,
            // Fixed timestamp keeps artifacts comparable across merges
            scraped_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_save_and_merge_single_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "One")])
            .unwrap();

        let report = store.merge(TitleKind::Movie).unwrap();
        assert_eq!(report.unique_titles, 1);
        assert_eq!(report.snapshots_merged, 1);

        let titles = store.load_canonical(TitleKind::Movie).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].local_id(), "m1");
    }

    #[test]
    fn test_merge_deduplicates_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "Old Name")])
            .unwrap();
        // Later snapshot re-records the same title
        store
            .save_snapshot(
                TitleKind::Movie,
                &[make_title("m1", "New Name"), make_title("m2", "Other")],
            )
            .unwrap();

        let report = store.merge(TitleKind::Movie).unwrap();
        assert_eq!(report.unique_titles, 2);
        assert_eq!(report.snapshots_merged, 2);

        let titles = store.load_canonical(TitleKind::Movie).unwrap();
        let m1 = titles.iter().find(|t| t.local_id() == "m1").unwrap();
        assert_eq!(m1.display_name(), "New Name");
    }

    #[test]
    fn test_merge_removes_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "One")])
            .unwrap();
        store.merge(TitleKind::Movie).unwrap();

        let leftover = store.snapshot_files(TitleKind::Movie).unwrap();
        assert!(leftover.is_empty());

        // A second merge has nothing to consume but keeps the canonical data
        let report = store.merge(TitleKind::Movie).unwrap();
        assert_eq!(report.snapshots_merged, 0);
        assert_eq!(report.unique_titles, 1);
    }

    #[test]
    fn test_merge_is_idempotent_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(
                TitleKind::Movie,
                &[make_title("m2", "B"), make_title("m1", "A")],
            )
            .unwrap();

        store.merge(TitleKind::Movie).unwrap();
        let first = fs::read(dir.path().join("movies.json")).unwrap();

        store.merge(TitleKind::Movie).unwrap();
        let second = fs::read(dir.path().join("movies.json")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_preserves_prior_canonical() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        // First run
        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "From Run 1")])
            .unwrap();
        store.merge(TitleKind::Movie).unwrap();

        // Second run discovers a different title
        store
            .save_snapshot(TitleKind::Movie, &[make_title("m2", "From Run 2")])
            .unwrap();
        let report = store.merge(TitleKind::Movie).unwrap();

        assert_eq!(report.unique_titles, 2);
    }

    #[test]
    fn test_merge_skips_unreadable_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "Good")])
            .unwrap();
        // Simulate a partial write from a crash
        fs::write(dir.path().join("temp/movies_99999999_000000000.json"), b"{not json").unwrap();

        let report = store.merge(TitleKind::Movie).unwrap();
        assert_eq!(report.unique_titles, 1);
        assert_eq!(report.snapshots_merged, 1);
    }

    #[test]
    fn test_kinds_use_separate_families() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .save_snapshot(TitleKind::Movie, &[make_title("m1", "Movie")])
            .unwrap();

        // Merging series consumes nothing from the movie family
        let report = store.merge(TitleKind::Series).unwrap();
        assert_eq!(report.snapshots_merged, 0);
        assert_eq!(report.unique_titles, 0);

        let report = store.merge(TitleKind::Movie).unwrap();
        assert_eq!(report.snapshots_merged, 1);
    }

    #[test]
    fn test_load_canonical_absent_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        assert!(store.load_canonical(TitleKind::Movie).unwrap().is_empty());
    }
}
