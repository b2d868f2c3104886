//! Bollinger Bands.
//!
//! Middle is the n-period SMA of closes; upper and lower sit `mult`
//! sample standard deviations (divide by N-1) above and below it.
//! A one-bar window has zero width.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_bollinger(bars: &[Bar], period: usize, mult: f64) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let bands = (period > 0 && i + 1 >= period).then(|| {
                let window = &bars[i + 1 - period..=i];
                let n = period as f64;
                let middle = window.iter().map(|b| b.close).sum::<f64>() / n;
                let squares = window
                    .iter()
                    .map(|b| (b.close - middle).powi(2))
                    .sum::<f64>();
                let variance = if period > 1 { squares / (n - 1.0) } else { 0.0 };
                let width = mult * variance.sqrt();
                (middle + width, middle, middle - width)
            });
            let (upper, middle, lower) = bands.unwrap_or((0.0, 0.0, 0.0));

            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: bands.is_some(),
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100: (mult * 100.0).round() as u32,
        },
        values,
    }
}
