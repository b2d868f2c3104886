//! Trade simulation over a price series and its normalized signals.
//!
//! Position sizing deploys all current capital on every entry, so profit
//! compounds across trades. Fees default to zero; a [`FeeModel`] with
//! slippage or commission adjusts execution prices and realized profit.

use log::debug;

use super::error::BacktestError;
use super::ledger::{TradeKind, TradeLedger, TradeRecord};
use super::ohlcv::PriceSeries;
use super::position::Position;
use super::signal::SignalPair;

/// Execution costs applied to every fill.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeeModel {
    /// Percentage of traded notional charged per fill.
    pub commission_pct: f64,
    /// Percentage the fill price moves against the trader.
    pub slippage_pct: f64,
}

impl FeeModel {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.commission_pct == 0.0 && self.slippage_pct == 0.0
    }
}

/// Commission on a fill: notional * pct / 100.
pub fn calculate_commission(notional: f64, fees: &FeeModel) -> f64 {
    notional * fees.commission_pct / 100.0
}

/// Long entry fills above the signal price: price * (1 + slippage_pct / 100).
pub fn apply_slippage_entry(price: f64, slippage_pct: f64) -> f64 {
    price * (1.0 + slippage_pct / 100.0)
}

/// Long exit fills below the signal price: price * (1 - slippage_pct / 100).
pub fn apply_slippage_exit(price: f64, slippage_pct: f64) -> f64 {
    price * (1.0 - slippage_pct / 100.0)
}

fn checked_price(price: f64, index: usize) -> Result<f64, BacktestError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(BacktestError::InvalidPrice { price, index })
    }
}

/// Walk `series` applying `signals` with zero fees.
pub fn simulate(
    series: &PriceSeries,
    signals: &SignalPair,
    initial_capital: f64,
) -> Result<TradeLedger, BacktestError> {
    simulate_with(series, signals, initial_capital, &FeeModel::none())
}

/// Walk `series` applying `signals` under `fees`.
///
/// Buys while long and sells while flat are ignored. A position still open
/// when the series ends is left open: its buy stays in the ledger and no
/// sell is synthesized.
pub fn simulate_with(
    series: &PriceSeries,
    signals: &SignalPair,
    initial_capital: f64,
    fees: &FeeModel,
) -> Result<TradeLedger, BacktestError> {
    if signals.len() != series.len() {
        return Err(BacktestError::SignalShape {
            reason: format!(
                "signals have {} entries but series has {} bars",
                signals.len(),
                series.len()
            ),
        });
    }
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(BacktestError::InvalidCapital(initial_capital));
    }

    let mut ledger = TradeLedger::new();
    let mut position = Position::Flat;
    let mut capital = initial_capital;
    let mut entry_commission = 0.0;

    for (i, bar) in series.bars().iter().enumerate() {
        match position {
            Position::Flat => {
                let Some(signal_price) = signals.buy()[i] else {
                    continue;
                };
                let price = apply_slippage_entry(checked_price(signal_price, i)?, fees.slippage_pct);
                entry_commission = calculate_commission(capital, fees);
                position = Position::Long {
                    entry_price: price,
                    entry_index: i,
                };
                debug!("BUY  | bar {} | price {:.4} | capital {:.2}", i, price, capital);
                ledger.append(TradeRecord {
                    kind: TradeKind::Buy,
                    price,
                    timestamp: bar.timestamp,
                    bar_index: i,
                    capital,
                    profit: None,
                });
            }
            Position::Long { .. } => {
                let Some(signal_price) = signals.sell()[i] else {
                    continue;
                };
                let price = apply_slippage_exit(checked_price(signal_price, i)?, fees.slippage_pct);
                let gross = position.realized_profit(price, capital);
                let exit_commission = calculate_commission(capital + gross, fees);
                let profit = gross - entry_commission - exit_commission;
                capital += profit;
                debug!(
                    "SELL | bar {} | price {:.4} | profit {:.2} | capital {:.2}",
                    i, price, profit, capital
                );
                ledger.append(TradeRecord {
                    kind: TradeKind::Sell,
                    price,
                    timestamp: bar.timestamp,
                    bar_index: i,
                    capital,
                    profit: Some(profit),
                });
                position = Position::Flat;
                entry_commission = 0.0;
            }
        }
    }

    Ok(ledger)
}
