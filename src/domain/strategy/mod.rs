//! Signal producers: strategies that turn a price series into buy/sell signals.
//!
//! Every strategy is a pure function of the series and its parameters.
//! Strategies are looked up by name through [`registry::StrategyRegistry`].

pub mod bollinger_rsi;
pub mod ma_crossover;
pub mod macd_cross;
pub mod registry;
pub mod rsi_threshold;

pub use bollinger_rsi::BollingerRsi;
pub use ma_crossover::MaCrossover;
pub use macd_cross::MacdCross;
pub use registry::StrategyRegistry;
pub use rsi_threshold::RsiThreshold;

use std::collections::BTreeMap;

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::SignalOutput;

/// Numeric strategy parameters keyed by name, e.g. `short_window = 50`.
pub type StrategyParams = BTreeMap<String, f64>;

pub trait SignalProducer: Send + Sync {
    fn name(&self) -> &str;

    /// Bars needed before the first signal can fire.
    fn min_bars(&self) -> usize;

    fn evaluate(&self, series: &PriceSeries) -> Result<SignalOutput, BacktestError>;
}

/// Reads a lookback window; must be a positive whole number.
pub(crate) fn window_param(
    strategy: &str,
    params: &StrategyParams,
    key: &str,
    default: usize,
) -> Result<usize, BacktestError> {
    let Some(&value) = params.get(key) else {
        return Ok(default);
    };
    if value.fract() != 0.0 || value < 1.0 || !value.is_finite() {
        return Err(invalid_param(
            strategy,
            key,
            format!("expected a positive integer, got {value}"),
        ));
    }
    Ok(value as usize)
}

pub(crate) fn float_param(
    strategy: &str,
    params: &StrategyParams,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match params.get(key) {
        None => Ok(default),
        Some(&value) if value.is_finite() => Ok(value),
        Some(&value) => Err(invalid_param(strategy, key, format!("not finite: {value}"))),
    }
}

pub(crate) fn invalid_param(strategy: &str, key: &str, reason: String) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: format!("strategy.{strategy}"),
        key: key.to_string(),
        reason,
    }
}
