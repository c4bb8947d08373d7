//! Market-data fetching: provider abstraction, Yahoo Finance client,
//! circuit breaker, ingestion, and the multi-symbol orchestrator.

pub mod circuit_breaker;
pub mod fetch;
pub mod ingest;
pub mod provider;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use fetch::{fetch_universe, FetchOutcome};
pub use provider::{
    DataError, DataProvider, DataSource, FetchProgress, FetchResult, RawBar, SilentProgress,
    StdoutProgress,
};
pub use yahoo::YahooProvider;
