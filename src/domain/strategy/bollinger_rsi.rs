//! Bollinger band breakouts confirmed by RSI.
//!
//! Buy when the close is below the lower band and RSI is under `buy_rsi`;
//! sell when the close is above the upper band or RSI is over `sell_rsi`.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorValue, calculate_bollinger, calculate_rsi};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{SignalOutput, SignalPair};
use crate::domain::strategy::{
    SignalProducer, StrategyParams, float_param, invalid_param, window_param,
};

pub const NAME: &str = "bollinger_rsi";
pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_STD_MULT: f64 = 2.0;
pub const DEFAULT_RSI_WINDOW: usize = 14;
pub const DEFAULT_BUY_RSI: f64 = 35.0;
pub const DEFAULT_SELL_RSI: f64 = 65.0;

#[derive(Debug, Clone)]
pub struct BollingerRsi {
    window: usize,
    std_mult: f64,
    rsi_window: usize,
    buy_rsi: f64,
    sell_rsi: f64,
}

impl BollingerRsi {
    pub fn new(
        window: usize,
        std_mult: f64,
        rsi_window: usize,
        buy_rsi: f64,
        sell_rsi: f64,
    ) -> Result<Self, BacktestError> {
        if window < 2 {
            return Err(invalid_param(NAME, "window", format!("must be at least 2, got {window}")));
        }
        if rsi_window == 0 {
            return Err(invalid_param(NAME, "rsi_window", "must be positive".into()));
        }
        if std_mult <= 0.0 {
            return Err(invalid_param(NAME, "std_mult", format!("must be positive, got {std_mult}")));
        }
        if buy_rsi >= sell_rsi {
            return Err(invalid_param(
                NAME,
                "buy_rsi",
                format!("must be below sell_rsi ({sell_rsi}), got {buy_rsi}"),
            ));
        }
        Ok(Self {
            window,
            std_mult,
            rsi_window,
            buy_rsi,
            sell_rsi,
        })
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        Self::new(
            window_param(NAME, params, "window", DEFAULT_WINDOW)?,
            float_param(NAME, params, "std_mult", DEFAULT_STD_MULT)?,
            window_param(NAME, params, "rsi_window", DEFAULT_RSI_WINDOW)?,
            float_param(NAME, params, "buy_rsi", DEFAULT_BUY_RSI)?,
            float_param(NAME, params, "sell_rsi", DEFAULT_SELL_RSI)?,
        )
    }
}

impl SignalProducer for BollingerRsi {
    fn name(&self) -> &str {
        NAME
    }

    fn min_bars(&self) -> usize {
        self.window.max(self.rsi_window + 1)
    }

    fn evaluate(&self, series: &PriceSeries) -> Result<SignalOutput, BacktestError> {
        let bands = calculate_bollinger(series.bars(), self.window, self.std_mult);
        let rsi = calculate_rsi(series.bars(), self.rsi_window).simple_values();

        let mut buy = Vec::with_capacity(series.len());
        let mut sell = Vec::with_capacity(series.len());

        for ((bar, point), rsi) in series.bars().iter().zip(&bands.values).zip(rsi) {
            let (fire_buy, fire_sell) = match (point.valid, &point.value, rsi) {
                (true, IndicatorValue::Bollinger { upper, lower, .. }, Some(r)) => {
                    let fire_buy = bar.close < *lower && r < self.buy_rsi;
                    (fire_buy, !fire_buy && (bar.close > *upper || r > self.sell_rsi))
                }
                _ => (false, false),
            };
            buy.push(fire_buy.then_some(bar.close));
            sell.push(fire_sell.then_some(bar.close));
        }

        Ok(SignalOutput::Parallel(SignalPair::new(buy, sell)?))
    }
}
