//! Stockpile CLI — snapshot fetching and optimization commands.
//!
//! Commands:
//! - `fetch` — fetch the universe from Yahoo Finance and write a dated snapshot
//! - `optimize` — re-encode a snapshot as columnar Parquet, optionally gzipped
//! - `inspect` — summarize a snapshot or optimized file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockpile_core::data::{
    fetch_universe, CircuitBreaker, DataProvider, StdoutProgress, YahooProvider,
};
use stockpile_core::snapshot::optimize::{load_optimized, optimize, OptimizeOptions};
use stockpile_core::{RawBar, Snapshot, SnapshotConfig};

#[derive(Parser)]
#[command(
    name = "stockpile",
    about = "Stockpile CLI — periodic market-data snapshotting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the ticker universe and write today's dated snapshot.
    Fetch {
        /// Symbols to fetch (e.g., AAPL MSFT). Overrides the config symbol list.
        symbols: Vec<String>,

        /// TOML config file (results dir, universe CSV, suffix, lookback).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exchange symbol-list CSV with a SYMBOL column.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Days of history to fetch.
        #[arg(long)]
        lookback_days: Option<u32>,

        /// Exchange suffix appended for fetching (e.g. .NS).
        #[arg(long)]
        suffix: Option<String>,

        /// Results directory. Defaults to ./results.
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
    /// Re-encode a snapshot as columnar Parquet with an `_optimized` suffix.
    Optimize {
        /// Path to the snapshot file.
        snapshot: PathBuf,

        /// Explicit output path. Defaults to `{stem}_optimized.parquet` next to the input.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Also write a gzipped .gz copy for download.
        #[arg(long, short = 'z', default_value_t = false)]
        compress: bool,

        /// Recreate the optimized file even if it exists.
        #[arg(long, short, default_value_t = false)]
        force: bool,
    },
    /// Summarize a snapshot (.json) or optimized (.parquet) file.
    Inspect {
        /// Path to the file.
        path: PathBuf,

        /// How many symbols to detail.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            symbols,
            config,
            universe,
            lookback_days,
            suffix,
            results_dir,
        } => run_fetch(symbols, config, universe, lookback_days, suffix, results_dir),
        Commands::Optimize {
            snapshot,
            output,
            compress,
            force,
        } => run_optimize(&snapshot, output, compress, force),
        Commands::Inspect { path, limit } => run_inspect(&path, limit),
    }
}

fn run_fetch(
    symbols: Vec<String>,
    config_path: Option<PathBuf>,
    universe_csv: Option<PathBuf>,
    lookback_days: Option<u32>,
    suffix: Option<String>,
    results_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => SnapshotConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SnapshotConfig::default(),
    };

    // CLI flags override the config file
    if !symbols.is_empty() {
        config.symbols = symbols;
        config.universe_csv = None;
    }
    if universe_csv.is_some() {
        config.universe_csv = universe_csv;
    }
    if let Some(days) = lookback_days {
        config.lookback_days = days;
    }
    if suffix.is_some() {
        config.exchange_suffix = suffix;
    }
    if let Some(dir) = results_dir {
        config.results_dir = dir;
    }

    let universe = config.build_universe().context("building ticker universe")?;
    if universe.skipped_delisted() > 0 {
        println!("Skipped {} delisted symbol(s).", universe.skipped_delisted());
    }

    let today = chrono::Local::now().date_naive();
    let start = today - chrono::Duration::days(i64::from(config.lookback_days));

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);

    let outcome = fetch_universe(&provider, universe.tickers(), start, today, &StdoutProgress);

    for (sym, err) in &outcome.errors {
        eprintln!("Error for {sym}: {err}");
    }
    if outcome.nothing_fetched() {
        bail!("no symbols fetched; nothing to snapshot");
    }

    let snapshot = Snapshot::new(today, outcome.data);
    let path = snapshot
        .write(&config.results_dir, provider.name())
        .context("writing snapshot")?;

    println!(
        "Saved {} symbol(s), {} row(s) to {}",
        snapshot.symbol_count(),
        snapshot.total_rows(),
        path.display()
    );
    Ok(())
}

fn run_optimize(
    snapshot: &Path,
    output: Option<PathBuf>,
    compress: bool,
    force: bool,
) -> Result<()> {
    let opts = OptimizeOptions {
        output,
        compress,
        force,
    };

    let report = optimize(snapshot, &opts)
        .with_context(|| format!("optimizing {}", snapshot.display()))?;

    if report.skipped {
        println!(
            "Optimized file already exists: {} (use --force to recreate)",
            report.output.display()
        );
        return Ok(());
    }

    let input_size = file_size(&report.input);
    let output_size = file_size(&report.output);
    println!(
        "Optimized {} symbol(s), {} row(s): {} ({}) -> {} ({})",
        report.symbol_count,
        report.total_rows,
        report.input.display(),
        format_size(input_size),
        report.output.display(),
        format_size(output_size),
    );

    if let Some(gz) = &report.gz_output {
        println!("Wrote gzipped copy: {} ({})", gz.display(), format_size(file_size(gz)));
    }

    Ok(())
}

fn run_inspect(path: &Path, limit: usize) -> Result<()> {
    let is_parquet = path.extension().and_then(|e| e.to_str()) == Some("parquet");

    let snapshot = if is_parquet {
        load_optimized(path)
    } else {
        Snapshot::load(path)
    }
    .with_context(|| format!("reading {}", path.display()))?;

    println!("File:    {} ({})", path.display(), format_size(file_size(path)));
    println!("Date:    {}", snapshot.date);
    println!("Symbols: {}", snapshot.symbol_count());
    println!("Rows:    {}", snapshot.total_rows());

    if let Some(manifest) = Snapshot::load_manifest(path) {
        println!("Source:  {} (written {})", manifest.source, manifest.written_at);
        println!("Hash:    {}", manifest.data_hash);
    }

    println!();
    println!("{:<10} {:>6}  {:<25}", "Symbol", "Rows", "Date Range");
    println!("{}", "-".repeat(45));
    for (symbol, bars) in snapshot.data.iter().take(limit) {
        println!(
            "{:<10} {:>6}  {}",
            symbol,
            bars.len(),
            date_range(bars)
        );
    }
    let remaining = snapshot.symbol_count().saturating_sub(limit);
    if remaining > 0 {
        println!("... and {remaining} more symbol(s)");
    }

    Ok(())
}

fn date_range(bars: &[RawBar]) -> String {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first.date, last.date),
        _ => "(empty)".to_string(),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
