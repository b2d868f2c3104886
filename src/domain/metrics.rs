//! Performance metrics derived from a trade ledger.
//!
//! Every ratio has an explicit zero-denominator rule so no NaN leaves this
//! module: win rate and Sharpe fall back to 0, profit factor reports
//! `f64::INFINITY` when closed trades exist but none lost.

use super::ledger::TradeLedger;

/// Annualization factor applied to the per-trade Sharpe ratio.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_profit: f64,
    pub return_pct: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub open_position: bool,
}

impl PerformanceReport {
    pub fn compute(ledger: &TradeLedger, initial_capital: f64) -> Self {
        let final_capital = ledger.final_capital(initial_capital);

        let mut total_trades = 0usize;
        let mut profitable_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in ledger.closed_trades() {
            let profit = trade.profit.unwrap_or(0.0);
            total_trades += 1;
            if profit > 0.0 {
                profitable_trades += 1;
                gross_win += profit;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                losing_trades += 1;
                gross_loss += profit.abs();
                largest_loss = largest_loss.max(profit.abs());
            }
        }

        let win_rate = if total_trades > 0 {
            profitable_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_trades == 0 {
            0.0
        } else if losing_trades == 0 {
            f64::INFINITY
        } else {
            gross_win / gross_loss
        };

        let avg_win = if profitable_trades > 0 {
            gross_win / profitable_trades as f64
        } else {
            0.0
        };

        let avg_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };

        let total_profit = final_capital - initial_capital;
        let return_pct = if initial_capital > 0.0 {
            total_profit / initial_capital * 100.0
        } else {
            0.0
        };

        PerformanceReport {
            initial_capital,
            final_capital,
            total_trades,
            profitable_trades,
            losing_trades,
            win_rate,
            profit_factor,
            sharpe_ratio: compute_sharpe(&trade_returns(ledger)),
            max_drawdown: compute_drawdown(&equity_curve(ledger, initial_capital)),
            total_profit,
            return_pct,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            open_position: ledger.open_position().is_some(),
        }
    }

    /// Profit factor as text; an infinite value is written as `inf`.
    pub fn profit_factor_display(&self) -> String {
        format_ratio(self.profit_factor)
    }

    /// Flat key/value view for persistence sinks.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("initial_capital", format!("{:.2}", self.initial_capital)),
            ("final_capital", format!("{:.2}", self.final_capital)),
            ("total_trades", self.total_trades.to_string()),
            ("profitable_trades", self.profitable_trades.to_string()),
            ("losing_trades", self.losing_trades.to_string()),
            ("win_rate", format!("{:.4}", self.win_rate)),
            ("profit_factor", self.profit_factor_display()),
            ("sharpe_ratio", format!("{:.4}", self.sharpe_ratio)),
            ("max_drawdown", format!("{:.4}", self.max_drawdown)),
            ("total_profit", format!("{:.2}", self.total_profit)),
            ("return_pct", format!("{:.2}", self.return_pct)),
            ("avg_win", format!("{:.2}", self.avg_win)),
            ("avg_loss", format!("{:.2}", self.avg_loss)),
            ("largest_win", format!("{:.2}", self.largest_win)),
            ("largest_loss", format!("{:.2}", self.largest_loss)),
            ("open_position", self.open_position.to_string()),
        ]
    }
}

/// Pure function of the ledger: calling it twice yields identical reports.
pub fn compute_metrics(ledger: &TradeLedger, initial_capital: f64) -> PerformanceReport {
    PerformanceReport::compute(ledger, initial_capital)
}

pub fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Per-trade return: profit relative to capital committed to that trade.
fn trade_returns(ledger: &TradeLedger) -> Vec<f64> {
    ledger
        .closed_trades()
        .map(|t| {
            let before = t.capital_before();
            if before > 0.0 {
                t.profit.unwrap_or(0.0) / before
            } else {
                0.0
            }
        })
        .collect()
}

/// Initial capital followed by capital after each closed trade.
fn equity_curve(ledger: &TradeLedger, initial_capital: f64) -> Vec<f64> {
    std::iter::once(initial_capital)
        .chain(ledger.closed_trades().map(|t| t.capital))
        .collect()
}

fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

fn compute_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{Bar, PriceSeries};
    use crate::domain::signal::SignalPair;
    use crate::domain::simulator::simulate;
    use chrono::NaiveDate;

    /// Round trips at fixed entry 100 whose exits are chosen to realize `profits`
    /// one after another from `initial`.
    fn ledger_with_profits(initial: f64, profits: &[f64]) -> TradeLedger {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut capital = initial;
        let mut bars = Vec::new();
        let mut buy = Vec::new();
        let mut sell = Vec::new();
        for &profit in profits {
            let exit = 100.0 + profit / (capital / 100.0);
            for (price, is_buy) in [(100.0, true), (exit, false)] {
                bars.push(Bar {
                    timestamp: start + chrono::Duration::hours(bars.len() as i64),
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: 1.0,
                });
                buy.push(is_buy.then_some(price));
                sell.push((!is_buy).then_some(price));
            }
            capital += profit;
        }
        let series = PriceSeries::new("TEST", "1h", bars).unwrap();
        let signals = SignalPair::new(buy, sell).unwrap();
        simulate(&series, &signals, initial).unwrap()
    }

    #[test]
    fn metrics_empty_ledger() {
        let report = compute_metrics(&TradeLedger::new(), 10_000.0);
        assert_eq!(report.total_trades, 0);
        assert_eq!(report.final_capital, 10_000.0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.total_profit, 0.0);
        assert!(!report.open_position);
    }

    #[test]
    fn metrics_single_winner_has_infinite_profit_factor() {
        let ledger = ledger_with_profits(10_000.0, &[2_000.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        assert_eq!(report.total_trades, 1);
        assert!((report.final_capital - 12_000.0).abs() < 1e-6);
        assert_eq!(report.win_rate, 1.0);
        assert!(report.profit_factor.is_infinite() && report.profit_factor > 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.max_drawdown, 0.0);
    }

    #[test]
    fn metrics_win_and_loss() {
        let ledger = ledger_with_profits(10_000.0, &[500.0, -300.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        assert_eq!(report.total_trades, 2);
        assert_eq!(report.profitable_trades, 1);
        assert_eq!(report.losing_trades, 1);
        assert!((report.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((report.profit_factor - 500.0 / 300.0).abs() < 1e-6);
        assert!((report.total_profit - 200.0).abs() < 1e-6);
        assert!((report.return_pct - 2.0).abs() < 1e-6);
        assert!((report.avg_win - 500.0).abs() < 1e-6);
        assert!((report.avg_loss - 300.0).abs() < 1e-6);
    }

    #[test]
    fn metrics_largest_win_and_loss() {
        let ledger = ledger_with_profits(10_000.0, &[100.0, 300.0, -50.0, -150.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        assert!((report.largest_win - 300.0).abs() < 1e-6);
        assert!((report.largest_loss - 150.0).abs() < 1e-6);
    }

    #[test]
    fn metrics_breakeven_is_neither_win_nor_loss() {
        let ledger = ledger_with_profits(10_000.0, &[0.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.profitable_trades, 0);
        assert_eq!(report.losing_trades, 0);
        assert_eq!(report.win_rate, 0.0);
        assert!(report.profit_factor.is_infinite());
    }

    #[test]
    fn metrics_open_position_excluded() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = (0..2)
            .map(|i| Bar {
                timestamp: start + chrono::Duration::hours(i),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 1.0,
            })
            .collect();
        let series = PriceSeries::new("TEST", "1h", bars).unwrap();
        let signals = SignalPair::new(vec![Some(100.0), None], vec![None, None]).unwrap();
        let ledger = simulate(&series, &signals, 10_000.0).unwrap();

        let report = compute_metrics(&ledger, 10_000.0);
        assert!(report.open_position);
        assert_eq!(report.total_trades, 0);
        assert_eq!(report.final_capital, 10_000.0);
    }

    #[test]
    fn metrics_max_drawdown() {
        let curve = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        let dd = compute_drawdown(&curve);
        assert!((dd - (110.0 - 80.0) / 110.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_drawdown_monotone_is_zero() {
        assert_eq!(compute_drawdown(&[100.0, 100.0, 120.0, 130.0]), 0.0);
        assert_eq!(compute_drawdown(&[]), 0.0);
    }

    #[test]
    fn metrics_drawdown_from_ledger() {
        let ledger = ledger_with_profits(10_000.0, &[1_000.0, -2_200.0, 500.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        // peak 11000, trough 8800
        assert!((report.max_drawdown - 0.2).abs() < 1e-9);
    }

    #[test]
    fn metrics_sharpe_zero_stddev() {
        assert_eq!(compute_sharpe(&[0.01, 0.01, 0.01]), 0.0);
    }

    #[test]
    fn metrics_sharpe_positive() {
        let sharpe = compute_sharpe(&[0.02, 0.01, 0.03]);
        let mean: f64 = 0.02;
        let sd: f64 = 0.01;
        assert!((sharpe - mean / sd * 252.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn metrics_idempotent() {
        let ledger = ledger_with_profits(10_000.0, &[500.0, -300.0, 120.0]);
        assert_eq!(compute_metrics(&ledger, 10_000.0), compute_metrics(&ledger, 10_000.0));
    }

    #[test]
    fn format_ratio_handles_infinity() {
        assert_eq!(format_ratio(f64::INFINITY), "inf");
        assert_eq!(format_ratio(1.5), "1.5000");
    }

    #[test]
    fn to_pairs_serializes_infinite_profit_factor() {
        let ledger = ledger_with_profits(10_000.0, &[2_000.0]);
        let report = compute_metrics(&ledger, 10_000.0);
        let pairs = report.to_pairs();
        let pf = pairs.iter().find(|(k, _)| *k == "profit_factor").unwrap();
        assert_eq!(pf.1, "inf");
    }
}
