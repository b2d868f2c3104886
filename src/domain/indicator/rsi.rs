//! Relative Strength Index with Wilder smoothing.
//!
//! The first average is the plain mean of the first n gains/losses; after
//! that avg = (prev_avg * (n-1) + current) / n.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), 100 when there are no
//! losses and 50 when price did not move at all.
//!
//! Warmup: first n bars are invalid (n price changes are needed).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let mut rsi = None;

        if period > 0 && i > 0 {
            let change = bar.close - bars[i - 1].close;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            let n = period as f64;

            if i <= period {
                avg_gain += gain / n;
                avg_loss += loss / n;
            } else {
                avg_gain = (avg_gain * (n - 1.0) + gain) / n;
                avg_loss = (avg_loss * (n - 1.0) + loss) / n;
            }

            if i >= period {
                rsi = Some(rsi_from_averages(avg_gain, avg_loss));
            }
        }

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: rsi.is_some(),
            value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn last_rsi(prices: &[f64], period: usize) -> f64 {
        let bars = make_bars(prices);
        let series = calculate_rsi(&bars, period);
        series.simple_values().last().copied().flatten().unwrap()
    }

    #[test]
    fn rsi_empty_bars() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_single_bar() {
        let bars = make_bars(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let bars = make_bars(&prices);
        let series = calculate_rsi(&bars, 14);

        assert_eq!(series.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert!((last_rsi(&prices, 14) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert!(last_rsi(&prices, 14).abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_prices_are_neutral() {
        assert!((last_rsi(&[100.0; 6], 3) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_wilder_smoothing() {
        // changes: +2, -1, +1 then +3
        let prices = [10.0, 12.0, 11.0, 12.0, 15.0];
        let bars = make_bars(&prices);
        let values = calculate_rsi(&bars, 3).simple_values();

        let (g0, l0) = (3.0 / 3.0, 1.0 / 3.0);
        let first = 100.0 - 100.0 / (1.0 + g0 / l0);
        assert!((values[3].unwrap() - first).abs() < 1e-9);

        let (g1, l1) = ((g0 * 2.0 + 3.0) / 3.0, (l0 * 2.0) / 3.0);
        let second = 100.0 - 100.0 / (1.0 + g1 / l1);
        assert!((values[4].unwrap() - second).abs() < 1e-9);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let bars = make_bars(&prices);
        for rsi in calculate_rsi(&bars, 14).simple_values().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let bars = make_bars(&[100.0, 101.0]);
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(0));
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
