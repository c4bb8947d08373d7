//! Trips a snapshot run off a provider that has started refusing it.
//!
//! Yahoo answers an IP ban with HTTP 403 and rate limiting with 429. Once
//! either shows up, hammering the endpoint only lengthens the block, so the
//! breaker refuses further requests for a cooldown after a hard block or
//! after too many consecutive soft failures. A scheduled run then fails its
//! remaining symbols fast instead of burning the whole CI time slot.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BreakerInner {
    /// When the breaker opened; `None` while requests are allowed.
    open_since: Option<Instant>,
    consecutive_failures: u32,
}

/// Refuses provider requests for a cooldown once the provider blocks us.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                open_since: None,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold,
        }
    }

    /// Defaults for a snapshot run against Yahoo: 30-minute cooldown, open
    /// after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    /// Whether a request may go out. An elapsed cooldown closes the breaker
    /// and clears the failure streak.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.open_since {
            None => true,
            Some(opened) if opened.elapsed() >= self.cooldown => {
                inner.open_since = None;
                inner.consecutive_failures = 0;
                true
            }
            Some(_) => false,
        }
    }

    /// A successful request ends the failure streak.
    pub fn record_success(&self) {
        self.inner.lock().unwrap().consecutive_failures = 0;
    }

    /// A soft failure (429, 5xx). Reaching the threshold opens the breaker.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            inner.open_since = Some(Instant::now());
        }
    }

    /// A hard block (403 / IP ban) opens the breaker immediately.
    pub fn trip(&self) {
        self.inner.lock().unwrap().open_since = Some(Instant::now());
    }

    /// Cooldown left before requests are allowed again (zero when closed).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.inner.lock().unwrap().open_since {
            None => Duration::ZERO,
            Some(opened) => self.cooldown.saturating_sub(opened.elapsed()),
        }
    }
}
