//! Fetch orchestrator — coordinates multi-symbol fetches with progress reporting.
//!
//! A failed symbol is recorded and skipped; it never aborts the run for the
//! other symbols. The only early exit is a tripped circuit breaker, where
//! continuing would just burn the cooldown.

use super::ingest;
use super::provider::{DataError, DataProvider, FetchProgress, RawBar};
use crate::universe::Ticker;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Fetch every ticker in the universe in a single best-effort pass.
///
/// Returns the per-symbol bars keyed by display symbol (exchange suffix
/// stripped), plus a summary of successes and failures.
pub fn fetch_universe(
    provider: &dyn DataProvider,
    tickers: &[Ticker],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> FetchOutcome {
    let total = tickers.len();
    let mut data: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(&ticker.fetch_symbol, i, total);

        let result = fetch_single(provider, &ticker.fetch_symbol, start, end).map(|bars| {
            data.insert(ticker.key.clone(), bars);
        });
        progress.on_complete(&ticker.fetch_symbol, i, total, &result);

        if let Err(e) = result {
            errors.push((ticker.fetch_symbol.clone(), e));
        }

        // Bail out early if circuit breaker tripped
        if !provider.is_available() {
            for t in &tickers[(i + 1)..total] {
                errors.push((t.fetch_symbol.clone(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    let succeeded = data.len();
    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);

    FetchOutcome {
        data,
        total,
        succeeded,
        failed,
        errors,
    }
}

/// Fetch a single symbol: provider → ingest.
fn fetch_single(
    provider: &dyn DataProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawBar>, DataError> {
    let fetch_result = provider.fetch(symbol, start, end)?;
    let ingest_result = ingest::ingest(fetch_result.bars)?;
    Ok(ingest_result.bars)
}

/// Summary of a batch fetch operation.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Fetched series keyed by display symbol.
    pub data: BTreeMap<String, Vec<RawBar>>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl FetchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn nothing_fetched(&self) -> bool {
        self.data.is_empty()
    }
}
