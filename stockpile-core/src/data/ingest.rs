//! Bar-level ingestion: sort, dedupe, validate, round.
//!
//! Every fetched series passes through here before it is snapshotted, so the
//! writer only ever sees canonical data: dates strictly ascending, no
//! duplicate dates, OHLC sanity enforced, prices rounded to 2 decimals.

use super::provider::{DataError, RawBar};

/// Outcome of ingesting one symbol's bars.
#[derive(Debug)]
pub struct IngestResult {
    pub bars: Vec<RawBar>,
    /// Bars dropped for failing OHLC sanity or duplicating a date.
    pub dropped: usize,
}

/// Canonicalize a fetched series.
///
/// Returns an error if nothing survives validation — an all-invalid series is
/// indistinguishable from a provider glitch and should be skipped upstream.
pub fn ingest(mut bars: Vec<RawBar>) -> Result<IngestResult, DataError> {
    let original = bars.len();

    bars.sort_by_key(|b| b.date);

    let mut out: Vec<RawBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        // Keep the first occurrence of a date
        if out.last().is_some_and(|prev| prev.date == bar.date) {
            continue;
        }
        if !is_sane(&bar) {
            continue;
        }
        out.push(round_prices(bar));
    }

    if out.is_empty() {
        return Err(DataError::Other("no valid bars after ingest".into()));
    }

    Ok(IngestResult {
        dropped: original - out.len(),
        bars: out,
    })
}

/// OHLC sanity: positive prices, high >= low, open/close inside [low, high].
fn is_sane(bar: &RawBar) -> bool {
    bar.open > 0.0
        && bar.high > 0.0
        && bar.low > 0.0
        && bar.close > 0.0
        && bar.high >= bar.low
        && bar.open >= bar.low
        && bar.open <= bar.high
        && bar.close >= bar.low
        && bar.close <= bar.high
}

/// Round prices to 2 decimals for storage size and consistency.
fn round_prices(mut bar: RawBar) -> RawBar {
    bar.open = round2(bar.open);
    bar.high = round2(bar.high);
    bar.low = round2(bar.low);
    bar.close = round2(bar.close);
    bar
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
