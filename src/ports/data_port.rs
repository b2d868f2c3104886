//! Price data acquisition port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

/// Source of historical bars. Transient failures surface as
/// [`BacktestError::DataFetch`] so callers can retry them.
pub trait PriceSeriesProvider: Send + Sync {
    /// Bars for `symbol` at `interval` whose timestamps fall on or between
    /// `start` and `end` (both inclusive, whole days).
    fn fetch_series(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError>;

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, BacktestError>;
}
