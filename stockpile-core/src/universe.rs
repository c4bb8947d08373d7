//! Ticker universe — the symbol list a snapshot run covers.
//!
//! The canonical source is an exchange symbol-list CSV with a `SYMBOL` header
//! column (NSE's EQUITY_L.csv layout). Symbols get an optional exchange
//! suffix appended for fetching (e.g. `RELIANCE` → `RELIANCE.NS`), except
//! index symbols starting with `^`, and a delisted set is skipped entirely.
//! Snapshot keys are the bare symbols with the suffix stripped again.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read symbol list {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse symbol list: {0}")]
    Csv(#[from] csv::Error),

    #[error("symbol list is empty after skipping delisted entries")]
    Empty,
}

/// One row of the symbol-list CSV. Only the SYMBOL column matters.
#[derive(Debug, Deserialize)]
struct SymbolRow {
    #[serde(rename = "SYMBOL")]
    symbol: String,
}

/// A symbol as fetched and as keyed in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    /// Provider-facing symbol, suffix included (`RELIANCE.NS`).
    pub fetch_symbol: String,
    /// Snapshot key, suffix stripped (`RELIANCE`).
    pub key: String,
}

/// The ticker universe for a snapshot run.
#[derive(Debug, Clone)]
pub struct Universe {
    tickers: Vec<Ticker>,
    skipped_delisted: usize,
}

impl Universe {
    /// Load a universe from a symbol-list CSV.
    pub fn from_csv_file(
        path: &Path,
        exchange_suffix: Option<&str>,
        delisted: &BTreeSet<String>,
    ) -> Result<Self, UniverseError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            if e.is_io_error() {
                // csv wraps the io error; re-surface it with the path attached
                UniverseError::Io {
                    path: path.display().to_string(),
                    source: std::io::Error::other(e.to_string()),
                }
            } else {
                UniverseError::Csv(e)
            }
        })?;

        let mut symbols = Vec::new();
        for row in reader.deserialize::<SymbolRow>() {
            symbols.push(row?.symbol);
        }

        Self::from_symbols(symbols, exchange_suffix, delisted)
    }

    /// Build a universe from an explicit symbol list.
    pub fn from_symbols(
        symbols: Vec<String>,
        exchange_suffix: Option<&str>,
        delisted: &BTreeSet<String>,
    ) -> Result<Self, UniverseError> {
        let total = symbols.len();
        let tickers: Vec<Ticker> = symbols
            .into_iter()
            .filter(|s| !delisted.contains(s))
            .map(|s| normalize(&s, exchange_suffix))
            .collect();

        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }

        Ok(Self {
            skipped_delisted: total - tickers.len(),
            tickers,
        })
    }

    /// Default delisted set: known suspended NSE symbols.
    pub fn default_delisted() -> BTreeSet<String> {
        BTreeSet::from(["BINANIIND".to_string()])
    }

    /// A small built-in universe of liquid US symbols for suffix-less runs.
    pub fn default_us() -> Self {
        let symbols = ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "SPY", "QQQ"]
            .into_iter()
            .map(String::from)
            .collect();
        // Infallible: the list above is non-empty and none are delisted
        Self::from_symbols(symbols, None, &BTreeSet::new()).expect("built-in universe is non-empty")
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Number of symbols dropped because they are in the delisted set.
    pub fn skipped_delisted(&self) -> usize {
        self.skipped_delisted
    }
}

/// Apply the exchange suffix rules from the original symbol list handling:
/// leave index symbols (`^NSEI`) and already-suffixed symbols alone.
fn normalize(symbol: &str, exchange_suffix: Option<&str>) -> Ticker {
    match exchange_suffix {
        Some(suffix) if !symbol.starts_with('^') && !symbol.ends_with(suffix) => Ticker {
            fetch_symbol: format!("{symbol}{suffix}"),
            key: symbol.to_string(),
        },
        Some(suffix) => Ticker {
            fetch_symbol: symbol.to_string(),
            key: symbol.strip_suffix(suffix).unwrap_or(symbol).to_string(),
        },
        None => Ticker {
            fetch_symbol: symbol.to_string(),
            key: symbol.to_string(),
        },
    }
}
