//! MACD signal-line crossover, emitted as a labeled action table.
//!
//! BUY on the bar where the MACD line crosses above its signal line, SELL
//! where it crosses below, HOLD otherwise and WAIT until both lines exist.

use crate::domain::error::BacktestError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{IndicatorValue, calculate_macd};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{Action, LabeledRow, SignalOutput};
use crate::domain::strategy::{SignalProducer, StrategyParams, invalid_param, window_param};

pub const NAME: &str = "macd_cross";

#[derive(Debug, Clone)]
pub struct MacdCross {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdCross {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, BacktestError> {
        if fast >= slow {
            return Err(invalid_param(
                NAME,
                "fast",
                format!("must be below slow ({slow}), got {fast}"),
            ));
        }
        if fast == 0 || signal == 0 {
            return Err(invalid_param(NAME, "signal", "periods must be positive".into()));
        }
        Ok(Self { fast, slow, signal })
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        Self::new(
            window_param(NAME, params, "fast", DEFAULT_FAST)?,
            window_param(NAME, params, "slow", DEFAULT_SLOW)?,
            window_param(NAME, params, "signal", DEFAULT_SIGNAL)?,
        )
    }
}

impl SignalProducer for MacdCross {
    fn name(&self) -> &str {
        NAME
    }

    fn min_bars(&self) -> usize {
        self.slow + self.signal - 1
    }

    fn evaluate(&self, series: &PriceSeries) -> Result<SignalOutput, BacktestError> {
        let macd = calculate_macd(series.bars(), self.fast, self.slow, self.signal);
        let mut prev_histogram: Option<f64> = None;

        let rows = series
            .bars()
            .iter()
            .zip(&macd.values)
            .map(|(bar, point)| {
                let histogram = match point.value {
                    IndicatorValue::Macd { histogram, .. } if point.valid => Some(histogram),
                    _ => None,
                };
                let action = match (prev_histogram, histogram) {
                    (_, None) => Action::Wait,
                    (Some(prev), Some(h)) if prev <= 0.0 && h > 0.0 => Action::Buy,
                    (Some(prev), Some(h)) if prev >= 0.0 && h < 0.0 => Action::Sell,
                    _ => Action::Hold,
                };
                prev_histogram = histogram;
                LabeledRow {
                    price: bar.close,
                    action,
                }
            })
            .collect();

        Ok(SignalOutput::Labeled(rows))
    }
}
