//! Simple Moving Average over closing prices.
//!
//! Each window is summed fresh so rounding error cannot build up along the
//! series. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let mean = (period > 0 && i + 1 >= period).then(|| {
                bars[i + 1 - period..=i].iter().map(|b| b.close).sum::<f64>() / period as f64
            });
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: mean.is_some(),
                value: IndicatorValue::Simple(mean.unwrap_or(0.0)),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
