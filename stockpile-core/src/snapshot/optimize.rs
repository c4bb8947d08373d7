//! Snapshot optimizer — columnar re-encoding of a raw JSON snapshot.
//!
//! Reads a `stock_data_DDMMYY.json` snapshot, rebuilds it as one long-format
//! Parquet table (`symbol, date, open, high, low, close, volume`), and writes
//! it next to the original with an `_optimized` suffix. Optionally gzips the
//! finished Parquet file to a `.gz` sibling for download. The re-encoding is
//! lossless: loading the optimized file back yields the same symbols, row
//! counts, and values.

use super::{Snapshot, SnapshotError};
use crate::data::provider::RawBar;
use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for an optimize run.
#[derive(Debug, Default)]
pub struct OptimizeOptions {
    /// Explicit output path; defaults to `{stem}_optimized.parquet` next to the input.
    pub output: Option<PathBuf>,
    /// Also write a gzipped `.gz` copy of the finished Parquet file.
    pub compress: bool,
    /// Recreate the optimized file even if it already exists.
    pub force: bool,
}

/// What an optimize run produced.
#[derive(Debug)]
pub struct OptimizeReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub gz_output: Option<PathBuf>,
    pub symbol_count: usize,
    pub total_rows: usize,
    /// True when the output already existed and `force` was not set.
    pub skipped: bool,
}

/// Default optimized path for a snapshot: `{stem}_optimized.parquet`.
pub fn optimized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot");
    input.with_file_name(format!("{stem}_optimized.parquet"))
}

/// Optimize a snapshot file.
///
/// The input is fully loaded and validated before any output file is touched,
/// so a missing or corrupt snapshot never leaves partial outputs behind.
pub fn optimize(input: &Path, opts: &OptimizeOptions) -> Result<OptimizeReport, SnapshotError> {
    let snapshot = Snapshot::load(input)?;

    // An empty map would produce a file load_optimized rejects; refuse it
    // before any output is touched.
    if snapshot.data.is_empty() {
        return Err(SnapshotError::Decode {
            path: input.display().to_string(),
            reason: "snapshot contains no symbols".into(),
        });
    }

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| optimized_path(input));

    if output.exists() && !opts.force {
        return Ok(OptimizeReport {
            input: input.to_path_buf(),
            output,
            gz_output: None,
            symbol_count: snapshot.symbol_count(),
            total_rows: snapshot.total_rows(),
            skipped: true,
        });
    }

    let df = snapshot_to_dataframe(&snapshot)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Atomic write: tmp then rename
    let tmp_path = append_ext(&output, "tmp");
    write_parquet(&df, &tmp_path)?;
    fs::rename(&tmp_path, &output).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotError::Io(e)
    })?;

    let gz_output = if opts.compress {
        Some(write_gz_copy(&output)?)
    } else {
        None
    };

    Ok(OptimizeReport {
        input: input.to_path_buf(),
        output,
        gz_output,
        symbol_count: snapshot.symbol_count(),
        total_rows: snapshot.total_rows(),
        skipped: false,
    })
}

/// Load an optimized Parquet snapshot back into the in-memory model.
pub fn load_optimized(path: &Path) -> Result<Snapshot, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::NotFound {
            path: path.display().to_string(),
        });
    }

    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| SnapshotError::Decode {
            path: path.display().to_string(),
            reason: format!("read parquet: {e}"),
        })?;

    validate_schema(&df, path)?;
    let data = dataframe_to_map(&df)?;

    let date = Snapshot::date_from_path(path).unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(Snapshot { date, data })
}

/// Gzip the finished Parquet file to a `.gz` sibling.
///
/// The gz content is the Parquet bytes verbatim, so decompressing it
/// reproduces the optimized file byte-for-byte.
fn write_gz_copy(parquet_path: &Path) -> Result<PathBuf, SnapshotError> {
    let bytes = fs::read(parquet_path)?;
    let gz_path = append_ext(parquet_path, "gz");
    let tmp_path = append_ext(parquet_path, "gz.tmp");

    let file = fs::File::create(&tmp_path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&bytes)?;
    encoder.finish()?;

    fs::rename(&tmp_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotError::Io(e)
    })?;
    Ok(gz_path)
}

/// Append an extension without replacing the existing one
/// (`a.parquet` + `gz` → `a.parquet.gz`).
fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

const EXPECTED_COLUMNS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

/// Flatten the snapshot map into one long DataFrame sorted by symbol.
///
/// BTreeMap iteration gives sorted symbols; per-symbol row order is preserved
/// exactly as stored so the re-encoding stays lossless.
fn snapshot_to_dataframe(snapshot: &Snapshot) -> Result<DataFrame, SnapshotError> {
    let n = snapshot.total_rows();
    let mut symbols: Vec<String> = Vec::with_capacity(n);
    let mut dates: Vec<i32> = Vec::with_capacity(n);
    let mut opens: Vec<f64> = Vec::with_capacity(n);
    let mut highs: Vec<f64> = Vec::with_capacity(n);
    let mut lows: Vec<f64> = Vec::with_capacity(n);
    let mut closes: Vec<f64> = Vec::with_capacity(n);
    let mut volumes: Vec<u64> = Vec::with_capacity(n);

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    for (symbol, bars) in &snapshot.data {
        for bar in bars {
            symbols.push(symbol.clone());
            dates.push((bar.date - epoch).num_days() as i32);
            opens.push(bar.open);
            highs.push(bar.high);
            lows.push(bar.low);
            closes.push(bar.close);
            volumes.push(bar.volume);
        }
    }

    DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| SnapshotError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| SnapshotError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), SnapshotError> {
    let file = fs::File::create(path)?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| SnapshotError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Validate that an optimized file carries the expected columns and has rows.
fn validate_schema(df: &DataFrame, path: &Path) -> Result<(), SnapshotError> {
    for col_name in &EXPECTED_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(SnapshotError::Decode {
                path: path.display().to_string(),
                reason: format!("missing column '{col_name}'"),
            });
        }
    }
    if df.height() == 0 {
        return Err(SnapshotError::Decode {
            path: path.display().to_string(),
            reason: "empty parquet file".into(),
        });
    }
    Ok(())
}

/// Regroup the long DataFrame by symbol into the in-memory snapshot map.
fn dataframe_to_map(df: &DataFrame) -> Result<BTreeMap<String, Vec<RawBar>>, SnapshotError> {
    let col_err = |e: PolarsError| SnapshotError::Parquet(format!("column read: {e}"));

    let symbol_ca = df.column("symbol").map_err(col_err)?.str().map_err(col_err)?;
    let date_ca = df.column("date").map_err(col_err)?.date().map_err(col_err)?;
    let open_ca = df.column("open").map_err(col_err)?.f64().map_err(col_err)?;
    let high_ca = df.column("high").map_err(col_err)?.f64().map_err(col_err)?;
    let low_ca = df.column("low").map_err(col_err)?.f64().map_err(col_err)?;
    let close_ca = df.column("close").map_err(col_err)?.f64().map_err(col_err)?;
    let vol_ca = df.column("volume").map_err(col_err)?.u64().map_err(col_err)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let mut data: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();

    for i in 0..df.height() {
        let symbol = symbol_ca
            .get(i)
            .ok_or_else(|| SnapshotError::Parquet(format!("null symbol at row {i}")))?;
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| SnapshotError::Parquet(format!("null date at row {i}")))?;

        data.entry(symbol.to_string()).or_default().push(RawBar {
            date: epoch + chrono::Duration::days(date_days as i64),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }

    Ok(data)
}
