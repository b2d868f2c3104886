//! Mean reversion on RSI: buy oversold, sell overbought.

use crate::domain::error::BacktestError;
use crate::domain::indicator::calculate_rsi;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{SignalOutput, SignalPair};
use crate::domain::strategy::{
    SignalProducer, StrategyParams, float_param, invalid_param, window_param,
};

pub const NAME: &str = "rsi_threshold";
pub const DEFAULT_WINDOW: usize = 14;
pub const DEFAULT_BUY_THRESHOLD: f64 = 30.0;
pub const DEFAULT_SELL_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct RsiThreshold {
    window: usize,
    buy_threshold: f64,
    sell_threshold: f64,
}

impl RsiThreshold {
    pub fn new(window: usize, buy_threshold: f64, sell_threshold: f64) -> Result<Self, BacktestError> {
        if window == 0 {
            return Err(invalid_param(NAME, "window", "must be positive".into()));
        }
        if !(0.0..=100.0).contains(&buy_threshold)
            || !(0.0..=100.0).contains(&sell_threshold)
            || buy_threshold >= sell_threshold
        {
            return Err(invalid_param(
                NAME,
                "buy_threshold",
                format!(
                    "thresholds must lie in [0, 100] with buy < sell, got {buy_threshold}/{sell_threshold}"
                ),
            ));
        }
        Ok(Self {
            window,
            buy_threshold,
            sell_threshold,
        })
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        Self::new(
            window_param(NAME, params, "window", DEFAULT_WINDOW)?,
            float_param(NAME, params, "buy_threshold", DEFAULT_BUY_THRESHOLD)?,
            float_param(NAME, params, "sell_threshold", DEFAULT_SELL_THRESHOLD)?,
        )
    }
}

impl SignalProducer for RsiThreshold {
    fn name(&self) -> &str {
        NAME
    }

    fn min_bars(&self) -> usize {
        self.window + 1
    }

    fn evaluate(&self, series: &PriceSeries) -> Result<SignalOutput, BacktestError> {
        let rsi = calculate_rsi(series.bars(), self.window).simple_values();

        let (buy, sell): (Vec<_>, Vec<_>) = series
            .bars()
            .iter()
            .zip(rsi)
            .map(|(bar, rsi)| match rsi {
                Some(r) if r < self.buy_threshold => (Some(bar.close), None),
                Some(r) if r > self.sell_threshold => (None, Some(bar.close)),
                _ => (None, None),
            })
            .unzip();

        Ok(SignalOutput::Parallel(SignalPair::new(buy, sell)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_series;
    use crate::domain::signal::normalize;

    #[test]
    fn rejects_inverted_thresholds() {
        assert!(RsiThreshold::new(14, 70.0, 30.0).is_err());
        assert!(RsiThreshold::new(14, 30.0, 130.0).is_err());
        assert!(RsiThreshold::new(0, 30.0, 70.0).is_err());
    }

    #[test]
    fn falling_prices_buy_rising_prices_sell() {
        let mut prices: Vec<f64> = (0..6).map(|i| 100.0 - i as f64 * 5.0).collect();
        prices.extend((1..6).map(|i| 75.0 + i as f64 * 5.0));
        let series = make_series(&prices);
        let producer = RsiThreshold::new(3, 30.0, 70.0).unwrap();
        let pair = normalize(producer.evaluate(&series).unwrap(), series.len()).unwrap();

        // warmup: first 3 bars silent
        assert!(pair.buy()[..3].iter().all(Option::is_none));
        assert!(pair.sell()[..3].iter().all(Option::is_none));
        // steady decline → RSI 0 → buy at close
        assert_eq!(pair.buy()[3], Some(85.0));
        // steady rise at the end → RSI > 70 → sell
        assert_eq!(pair.sell()[10], Some(100.0));
    }

    #[test]
    fn flat_prices_never_trade() {
        let series = make_series(&[50.0; 30]);
        let pair = normalize(
            RsiThreshold::from_params(&StrategyParams::new())
                .unwrap()
                .evaluate(&series)
                .unwrap(),
            30,
        )
        .unwrap();
        assert_eq!(pair.buy_count() + pair.sell_count(), 0);
    }
}
