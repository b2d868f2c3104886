//! Moving-average trend filter: long while the short SMA is above the long SMA.

use log::debug;
use std::cmp::Ordering;

use crate::domain::error::BacktestError;
use crate::domain::indicator::calculate_sma;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{SignalOutput, SignalPair};
use crate::domain::strategy::{SignalProducer, StrategyParams, invalid_param, window_param};

pub const NAME: &str = "ma_crossover";
pub const DEFAULT_SHORT_WINDOW: usize = 50;
pub const DEFAULT_LONG_WINDOW: usize = 200;

/// Averages closer than this (relative) count as equal.
const RELATIVE_TOLERANCE: f64 = 1e-9;

fn compare(short: f64, long: f64) -> Ordering {
    if (short - long).abs() <= RELATIVE_TOLERANCE * short.abs().max(long.abs()) {
        Ordering::Equal
    } else {
        short.total_cmp(&long)
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossover {
    short_window: usize,
    long_window: usize,
}

impl MaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, BacktestError> {
        if short_window == 0 || short_window >= long_window {
            return Err(invalid_param(
                NAME,
                "short_window",
                format!("must be positive and below long_window ({long_window}), got {short_window}"),
            ));
        }
        Ok(Self {
            short_window,
            long_window,
        })
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        Self::new(
            window_param(NAME, params, "short_window", DEFAULT_SHORT_WINDOW)?,
            window_param(NAME, params, "long_window", DEFAULT_LONG_WINDOW)?,
        )
    }
}

impl SignalProducer for MaCrossover {
    fn name(&self) -> &str {
        NAME
    }

    fn min_bars(&self) -> usize {
        self.long_window
    }

    /// Buy at the close whenever short > long, sell whenever short < long.
    /// Repeats are harmless since the simulator ignores them.
    fn evaluate(&self, series: &PriceSeries) -> Result<SignalOutput, BacktestError> {
        let short = calculate_sma(series.bars(), self.short_window);
        let long = calculate_sma(series.bars(), self.long_window);
        debug!(
            "{NAME} {}: {} vs {}",
            series.symbol(),
            short.indicator_type,
            long.indicator_type
        );
        let (short, long) = (short.simple_values(), long.simple_values());

        let mut buy = Vec::with_capacity(series.len());
        let mut sell = Vec::with_capacity(series.len());

        for (i, bar) in series.bars().iter().enumerate() {
            match short[i].zip(long[i]).map(|(s, l)| compare(s, l)) {
                Some(Ordering::Greater) => {
                    buy.push(Some(bar.close));
                    sell.push(None);
                }
                Some(Ordering::Less) => {
                    buy.push(None);
                    sell.push(Some(bar.close));
                }
                _ => {
                    buy.push(None);
                    sell.push(None);
                }
            }
        }

        Ok(SignalOutput::Parallel(SignalPair::new(buy, sell)?))
    }
}
