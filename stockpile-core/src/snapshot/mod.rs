//! Dated snapshot files and their manifest sidecars.
//!
//! A snapshot is the day's fetched universe: a mapping from display symbol to
//! that symbol's daily bars, serialized as JSON under the results directory as
//! `stock_data_DDMMYY.json`. Re-running for the same date overwrites the same
//! file; writes are atomic (write to .tmp, rename into place). A manifest
//! sidecar records symbol count, row total, and a blake3 content hash.

pub mod optimize;

use crate::data::provider::RawBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors for snapshot read/write and optimization.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot not found: {path}")]
    NotFound { path: String },

    #[error("failed to decode snapshot {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("failed to encode snapshot {path}: {reason}")]
    Encode { path: String, reason: String },

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(String),
}

/// Manifest sidecar written next to each snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub snapshot_date: NaiveDate,
    pub symbol_count: usize,
    pub total_rows: usize,
    pub data_hash: String,
    pub source: String,
    pub written_at: chrono::NaiveDateTime,
}

/// One day's fetched universe.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub data: BTreeMap<String, Vec<RawBar>>,
}

impl Snapshot {
    pub fn new(date: NaiveDate, data: BTreeMap<String, Vec<RawBar>>) -> Self {
        Self { date, data }
    }

    /// Filename for a snapshot date: `stock_data_DDMMYY.json`.
    pub fn file_name(date: NaiveDate) -> String {
        format!("stock_data_{}.json", date.format("%d%m%y"))
    }

    /// Full path for a snapshot date under a results directory.
    pub fn dated_path(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(Self::file_name(date))
    }

    /// Recover the snapshot date from a filename, if it follows the pattern.
    pub fn date_from_path(path: &Path) -> Option<NaiveDate> {
        let stem = path.file_stem()?.to_str()?;
        let tag = stem.strip_prefix("stock_data_")?;
        let tag = tag.strip_suffix("_optimized").unwrap_or(tag);
        NaiveDate::parse_from_str(tag, "%d%m%y").ok()
    }

    pub fn symbol_count(&self) -> usize {
        self.data.len()
    }

    pub fn total_rows(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Write the snapshot under `dir`, overwriting any same-date file.
    ///
    /// Returns the path written. Also writes the manifest sidecar; a manifest
    /// failure is fatal like any other write failure.
    pub fn write(&self, dir: &Path, source: &str) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(dir)?;

        let path = Self::dated_path(dir, self.date);
        let bytes = serde_json::to_vec(&self.data).map_err(|e| SnapshotError::Encode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SnapshotError::Io(e)
        })?;

        let manifest = SnapshotManifest {
            snapshot_date: self.date,
            symbol_count: self.symbol_count(),
            total_rows: self.total_rows(),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            source: source.to_string(),
            written_at: chrono::Local::now().naive_local(),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            SnapshotError::Encode {
                path: path.display().to_string(),
                reason: format!("manifest: {e}"),
            }
        })?;
        fs::write(manifest_path(&path), manifest_json)?;

        Ok(path)
    }

    /// Load a snapshot from disk.
    ///
    /// Missing file and malformed content are distinct errors; nothing is
    /// written in either case. The date is recovered from the filename when it
    /// follows the dated pattern, otherwise today's date is used.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            return Err(SnapshotError::NotFound {
                path: path.display().to_string(),
            });
        }

        let bytes = fs::read(path)?;
        let data: BTreeMap<String, Vec<RawBar>> =
            serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let date =
            Self::date_from_path(path).unwrap_or_else(|| chrono::Local::now().date_naive());

        Ok(Self { date, data })
    }

    /// Load the manifest sidecar for a snapshot path, if present and readable.
    pub fn load_manifest(path: &Path) -> Option<SnapshotManifest> {
        let content = fs::read_to_string(manifest_path(path)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// Manifest sidecar path: `stock_data_DDMMYY.manifest.json`.
fn manifest_path(snapshot_path: &Path) -> PathBuf {
    snapshot_path.with_extension("manifest.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bars() -> Vec<RawBar> {
        vec![
            RawBar {
                date: NaiveDate::from_ymd_opt(2025, 10, 24).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                volume: 1000,
            },
            RawBar {
                date: NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
                open: 101.0,
                high: 103.0,
                low: 100.0,
                close: 102.0,
                volume: 1100,
            },
        ]
    }

    fn sample_snapshot(date: NaiveDate) -> Snapshot {
        let mut data = BTreeMap::new();
        data.insert("AAPL".to_string(), sample_bars());
        data.insert("MSFT".to_string(), sample_bars()[..1].to_vec());
        Snapshot::new(date, data)
    }

    fn snap_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 26).unwrap()
    }

    #[test]
    fn file_name_uses_ddmmyy() {
        assert_eq!(Snapshot::file_name(snap_date()), "stock_data_261025.json");
    }

    #[test]
    fn date_roundtrips_through_path() {
        let path = Snapshot::dated_path(Path::new("results"), snap_date());
        assert_eq!(Snapshot::date_from_path(&path), Some(snap_date()));
        assert_eq!(Snapshot::date_from_path(Path::new("other.json")), None);
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let snap = sample_snapshot(snap_date());

        let path = snap.write(dir.path(), "test").unwrap();
        let loaded = Snapshot::load(&path).unwrap();

        assert_eq!(loaded.date, snap_date());
        assert_eq!(loaded.data, snap.data);
    }

    #[test]
    fn same_date_write_overwrites_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let snap = sample_snapshot(snap_date());

        let first = snap.write(dir.path(), "test").unwrap();
        let first_bytes = fs::read(&first).unwrap();
        let second = snap.write(dir.path(), "test").unwrap();
        let second_bytes = fs::read(&second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn manifest_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let snap = sample_snapshot(snap_date());

        let path = snap.write(dir.path(), "yahoo_finance").unwrap();
        let manifest = Snapshot::load_manifest(&path).unwrap();

        assert_eq!(manifest.symbol_count, 2);
        assert_eq!(manifest.total_rows, 3);
        assert_eq!(manifest.source, "yahoo_finance");
        assert_eq!(
            manifest.data_hash,
            blake3::hash(&fs::read(&path).unwrap()).to_hex().to_string()
        );
    }

    #[test]
    fn load_missing_is_not_found() {
        let err = Snapshot::load(Path::new("/nonexistent/stock_data_261025.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound { .. }));
    }

    #[test]
    fn load_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock_data_261025.json");
        fs::write(&path, b"definitely not json").unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Decode { .. }));
    }

    #[test]
    fn write_failure_is_io_not_decode() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the results directory should go makes the write fail
        let blocker = dir.path().join("results");
        fs::write(&blocker, b"in the way").unwrap();

        let err = sample_snapshot(snap_date()).write(&blocker, "test").unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }

    #[test]
    fn no_stray_tmp_files_after_write() {
        let dir = tempfile::tempdir().unwrap();
        sample_snapshot(snap_date()).write(dir.path(), "test").unwrap();

        let stray: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(stray.is_empty());
    }
}
