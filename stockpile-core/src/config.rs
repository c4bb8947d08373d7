//! Snapshot run configuration, loadable from a TOML file.
//!
//! Every field has a default so a config file only needs to state what it
//! changes; the CLI maps its flags onto the same struct.

use crate::universe::{Universe, UniverseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for a snapshot run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory snapshots are written into.
    pub results_dir: PathBuf,
    /// Exchange symbol-list CSV with a SYMBOL column; takes precedence over `symbols`.
    pub universe_csv: Option<PathBuf>,
    /// Inline symbol list, used when no CSV is configured.
    pub symbols: Vec<String>,
    /// Exchange suffix appended for fetching (e.g. ".NS").
    pub exchange_suffix: Option<String>,
    /// How many days of history to fetch.
    pub lookback_days: u32,
    /// Symbols to skip entirely.
    pub delisted: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            universe_csv: None,
            symbols: Vec::new(),
            exchange_suffix: None,
            lookback_days: 365,
            delisted: vec!["BINANIIND".to_string()],
        }
    }
}

impl SnapshotConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn delisted_set(&self) -> BTreeSet<String> {
        self.delisted.iter().cloned().collect()
    }

    /// Resolve the ticker universe this config describes.
    ///
    /// CSV wins over the inline list; with neither, the built-in US universe
    /// is used.
    pub fn build_universe(&self) -> Result<Universe, UniverseError> {
        let suffix = self.exchange_suffix.as_deref();
        let delisted = self.delisted_set();

        if let Some(csv_path) = &self.universe_csv {
            return Universe::from_csv_file(csv_path, suffix, &delisted);
        }
        if !self.symbols.is_empty() {
            return Universe::from_symbols(self.symbols.clone(), suffix, &delisted);
        }
        Ok(Universe::default_us())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = SnapshotConfig::default();
        assert_eq!(cfg.results_dir, PathBuf::from("results"));
        assert_eq!(cfg.lookback_days, 365);
        assert!(cfg.delisted_set().contains("BINANIIND"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = SnapshotConfig::from_toml(
            r#"
            lookback_days = 30
            exchange_suffix = ".NS"
            symbols = ["RELIANCE", "TCS"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.lookback_days, 30);
        assert_eq!(cfg.exchange_suffix.as_deref(), Some(".NS"));
        assert_eq!(cfg.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn inline_symbols_build_a_universe() {
        let cfg = SnapshotConfig::from_toml(
            r#"
            symbols = ["RELIANCE"]
            exchange_suffix = ".NS"
            "#,
        )
        .unwrap();

        let universe = cfg.build_universe().unwrap();
        assert_eq!(universe.tickers()[0].fetch_symbol, "RELIANCE.NS");
    }

    #[test]
    fn no_sources_falls_back_to_default_universe() {
        let cfg = SnapshotConfig::default();
        let universe = cfg.build_universe().unwrap();
        assert!(!universe.is_empty());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(SnapshotConfig::from_toml("lookback_days = \"soon\"").is_err());
    }
}
