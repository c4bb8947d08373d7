//! End-to-end pipeline test: fetch (mock provider) → snapshot → optimize →
//! reload, checking the lossless re-encoding invariant across the whole chain.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use stockpile_core::data::{
    fetch_universe, DataError, DataProvider, DataSource, FetchResult, RawBar, SilentProgress,
};
use stockpile_core::snapshot::optimize::{load_optimized, optimize, OptimizeOptions};
use stockpile_core::{Snapshot, Universe};

/// Deterministic in-memory provider: generates a short walk per symbol and
/// fails for anything in its blocklist.
struct FakeProvider {
    blocked: Vec<String>,
}

impl DataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if self.blocked.iter().any(|b| b == symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        // Seed prices off the symbol so each series is distinct
        let base = 50.0 + symbol.len() as f64 * 10.0;
        let mut bars = Vec::new();
        let mut date = start;
        let mut i = 0u64;
        while date <= end {
            let drift = i as f64 * 0.25;
            bars.push(RawBar {
                date,
                open: base + drift,
                high: base + drift + 1.0,
                low: base + drift - 1.0,
                close: base + drift + 0.5,
                volume: 1_000 + i * 10,
            });
            date = date + chrono::Duration::days(1);
            i += 1;
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn nse_universe() -> Universe {
    Universe::from_symbols(
        vec![
            "RELIANCE".to_string(),
            "TCS".to_string(),
            "DELISTED".to_string(),
        ],
        Some(".NS"),
        &BTreeSet::new(),
    )
    .unwrap()
}

#[test]
fn fetch_snapshot_optimize_reload() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        blocked: vec!["DELISTED.NS".to_string()],
    };
    let universe = nse_universe();

    let start = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();

    // Fetch: the blocked symbol is skipped, the rest succeed
    let outcome = fetch_universe(&provider, universe.tickers(), start, end, &SilentProgress);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);

    // Snapshot keys carry no exchange suffix
    assert!(outcome.data.contains_key("RELIANCE"));
    assert!(outcome.data.contains_key("TCS"));

    // Write the dated snapshot
    let snapshot = Snapshot::new(end, outcome.data);
    let path = snapshot.write(dir.path(), provider.name()).unwrap();
    assert!(path.ends_with("stock_data_261025.json"));

    let manifest = Snapshot::load_manifest(&path).unwrap();
    assert_eq!(manifest.symbol_count, 2);
    assert_eq!(manifest.total_rows, snapshot.total_rows());
    assert_eq!(manifest.source, "fake");

    // Optimize and reload: same symbols, row counts, and values
    let report = optimize(
        &path,
        &OptimizeOptions {
            compress: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(report.symbol_count, 2);

    let reloaded = load_optimized(&report.output).unwrap();
    assert_eq!(reloaded.data, snapshot.data);
    assert_eq!(reloaded.date, end);

    // The gzipped sibling exists alongside the optimized file
    let gz = report.gz_output.unwrap();
    assert!(gz.exists());
}

#[test]
fn rerun_for_same_date_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider { blocked: vec![] };
    let universe = nse_universe();

    let start = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();

    let first = fetch_universe(&provider, universe.tickers(), start, end, &SilentProgress);
    let second = fetch_universe(&provider, universe.tickers(), start, end, &SilentProgress);

    let path_a = Snapshot::new(end, first.data).write(dir.path(), "fake").unwrap();
    let bytes_a = std::fs::read(&path_a).unwrap();
    let path_b = Snapshot::new(end, second.data).write(dir.path(), "fake").unwrap();
    let bytes_b = std::fs::read(&path_b).unwrap();

    assert_eq!(path_a, path_b);
    assert_eq!(bytes_a, bytes_b);
}
