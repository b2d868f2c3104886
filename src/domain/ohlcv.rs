//! OHLCV bars and the immutable price series a run owns.

use chrono::NaiveDateTime;

use super::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    fn check(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be finite and non-negative, got {value}"));
            }
        }
        if self.high < self.open.max(self.close) {
            return Err(format!("high {} below open/close", self.high));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!("low {} above open/close", self.low));
        }
        Ok(())
    }
}

/// Ordered bars for one symbol over one interval.
///
/// Only constructible through [`PriceSeries::new`], so every instance is
/// non-empty, strictly ascending by timestamp and holds well-formed bars.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    interval: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self, BacktestError> {
        let symbol = symbol.into();
        let interval = interval.into();

        if bars.is_empty() {
            return Err(BacktestError::EmptySeries { symbol, interval });
        }

        for (index, bar) in bars.iter().enumerate() {
            if let Err(reason) = bar.check() {
                return Err(BacktestError::InvalidBar {
                    symbol,
                    index,
                    reason,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(BacktestError::InvalidBar {
                    symbol,
                    index,
                    reason: format!(
                        "timestamp {} not after {}",
                        bar.timestamp,
                        bars[index - 1].timestamp
                    ),
                });
            }
        }

        Ok(Self {
            symbol,
            interval,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}
