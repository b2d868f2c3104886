//! Retrying wrapper around any price provider.
//!
//! Only [`BacktestError::is_retryable`] failures are retried; the delay
//! doubles after each failed attempt.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::data_port::PriceSeriesProvider;
use chrono::NaiveDate;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts.
    pub fn run<T>(
        &self,
        context: &str,
        mut operation: impl FnMut() -> Result<T, BacktestError>,
    ) -> Result<T, BacktestError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => break Ok(value),
                Err(err) if !err.is_retryable() || attempt >= max_attempts => break Err(err),
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {}ms.",
                        attempt,
                        max_attempts,
                        context,
                        err,
                        delay.as_millis()
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: PriceSeriesProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<P: PriceSeriesProvider> PriceSeriesProvider for RetryingProvider<P> {
    fn fetch_series(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        self.policy.run(&format!("{symbol} {interval}"), || {
            self.inner.fetch_series(symbol, interval, start, end)
        })
    }

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, BacktestError> {
        self.policy
            .run(&format!("symbols {interval}"), || self.inner.list_symbols(interval))
    }
}
