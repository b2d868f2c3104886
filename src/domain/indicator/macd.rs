//! Moving Average Convergence Divergence.
//!
//! Line = EMA(fast) - EMA(slow), Signal = EMA(signal) of the line,
//! Histogram = Line - Signal.
//! Warmup: max(fast, slow) - 1 + signal - 1 bars.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal EMA starts at the first bar with a defined line.
    let line_start = line.iter().position(Option::is_some).unwrap_or(line.len());
    let defined: Vec<f64> = line[line_start..].iter().flatten().copied().collect();
    let mut signal_line = vec![None; line_start];
    signal_line.extend(ema_values(&defined, signal));

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let point = line[i].zip(signal_line[i]);
            let (line, signal) = point.unwrap_or((0.0, 0.0));
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: point.is_some(),
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Macd { fast, slow, signal },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn calculate_macd_default(bars: &[Bar]) -> IndicatorSeries {
        calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
    }

    fn rising(n: usize) -> Vec<Bar> {
        make_bars(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    fn macd_at(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.values[i].value {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => (line, signal, histogram),
            _ => panic!("Expected Macd value"),
        }
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd_default(&rising(40));
        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = calculate_macd_default(&rising(40));
        for i in 0..series.len() {
            if series.values[i].valid {
                let (line, signal, histogram) = macd_at(&series, i);
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_values(&closes, 3);
        let slow = ema_values(&closes, 5);
        let series = calculate_macd(&bars, 3, 5, 2);

        for i in 5..bars.len() {
            let (line, _, _) = macd_at(&series, i);
            assert!((line - (fast[i].unwrap() - slow[i].unwrap())).abs() < 1e-9);
        }
    }

    #[test]
    fn macd_signal_seeded_with_mean_of_line() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_values(&closes, 3);
        let slow = ema_values(&closes, 5);
        let series = calculate_macd(&bars, 3, 5, 2);
        // line first defined at 4 (point still invalid), signal seeded at 5
        let l4 = fast[4].unwrap() - slow[4].unwrap();
        let (l5, s5, _) = macd_at(&series, 5);
        assert!(!series.values[4].valid);
        assert!(series.values[5].valid);
        assert!((s5 - (l4 + l5) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn macd_custom_parameters() {
        let series = calculate_macd(&rising(20), 5, 10, 3);
        let warmup = 10 - 1 + 3 - 1;
        assert!(!series.values[warmup - 1].valid);
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_too_short_is_all_invalid() {
        let series = calculate_macd_default(&rising(10));
        assert_eq!(series.len(), 10);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_zero_period_is_all_invalid() {
        let series = calculate_macd(&rising(5), 0, 26, 9);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_empty_bars() {
        assert!(calculate_macd_default(&[]).is_empty());
    }
}
