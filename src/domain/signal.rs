//! Signal shapes and the adapter that normalizes them.
//!
//! Strategies emit either two parallel price-or-absent sequences or a
//! per-bar labeled action table. [`normalize`] turns both into a
//! [`SignalPair`], the only shape the simulator accepts.

use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;

/// Aligned buy/sell sequences, one slot per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPair {
    buy: Vec<Option<f64>>,
    sell: Vec<Option<f64>>,
}

impl SignalPair {
    pub fn new(buy: Vec<Option<f64>>, sell: Vec<Option<f64>>) -> Result<Self, BacktestError> {
        if buy.len() != sell.len() {
            return Err(BacktestError::SignalShape {
                reason: format!(
                    "buy has {} entries but sell has {}",
                    buy.len(),
                    sell.len()
                ),
            });
        }
        if let Some(index) = buy
            .iter()
            .zip(&sell)
            .position(|(b, s)| b.is_some() && s.is_some())
        {
            return Err(BacktestError::SignalShape {
                reason: format!("buy and sell both fire at bar {index}"),
            });
        }
        Ok(Self { buy, sell })
    }

    /// A pair where nothing ever fires.
    pub fn empty(len: usize) -> Self {
        Self {
            buy: vec![None; len],
            sell: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }

    pub fn buy(&self) -> &[Option<f64>] {
        &self.buy
    }

    pub fn sell(&self) -> &[Option<f64>] {
        &self.sell
    }

    pub fn buy_count(&self) -> usize {
        self.buy.iter().filter(|s| s.is_some()).count()
    }

    pub fn sell_count(&self) -> usize {
        self.sell.iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Wait,
}

impl FromStr for Action {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            "WAIT" => Ok(Action::Wait),
            other => Err(BacktestError::SignalShape {
                reason: format!("unknown action label {other:?}"),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Wait => "WAIT",
        };
        f.write_str(label)
    }
}

/// One row of a labeled-action table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledRow {
    pub price: f64,
    pub action: Action,
}

/// Raw output of a strategy before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutput {
    Parallel(SignalPair),
    Labeled(Vec<LabeledRow>),
}

/// Convert any strategy output into a [`SignalPair`] exactly `series_len` long.
///
/// A length mismatch is a hard error, never a truncation.
pub fn normalize(output: SignalOutput, series_len: usize) -> Result<SignalPair, BacktestError> {
    let pair = match output {
        SignalOutput::Parallel(pair) => pair,
        SignalOutput::Labeled(rows) => {
            let buy = rows
                .iter()
                .map(|r| (r.action == Action::Buy).then_some(r.price))
                .collect();
            let sell = rows
                .iter()
                .map(|r| (r.action == Action::Sell).then_some(r.price))
                .collect();
            SignalPair::new(buy, sell)?
        }
    };

    if pair.len() != series_len {
        return Err(BacktestError::SignalShape {
            reason: format!(
                "signals have {} entries but series has {} bars",
                pair.len(),
                series_len
            ),
        });
    }

    Ok(pair)
}
