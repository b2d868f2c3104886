//! Append-only trade ledger for one run.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Buy => f.write_str("buy"),
            TradeKind::Sell => f.write_str("sell"),
        }
    }
}

/// One executed event. `profit` is only present on sells; `capital` is the
/// capital after the event (unchanged by a buy).
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub kind: TradeKind,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub bar_index: usize,
    pub capital: f64,
    pub profit: Option<f64>,
}

impl TradeRecord {
    pub fn is_sell(&self) -> bool {
        self.kind == TradeKind::Sell
    }

    /// Capital immediately before this event.
    pub fn capital_before(&self) -> f64 {
        self.capital - self.profit.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records are only appended by the simulator, in bar order.
    pub(crate) fn append(&mut self, record: TradeRecord) {
        debug_assert!(
            self.records
                .last()
                .is_none_or(|last| last.timestamp < record.timestamp),
            "ledger records must be strictly time-ordered"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter().filter(|r| r.is_sell())
    }

    pub fn closed_count(&self) -> usize {
        self.closed_trades().count()
    }

    /// The entry left open when the series ended, if any.
    pub fn open_position(&self) -> Option<&TradeRecord> {
        self.records.last().filter(|r| r.kind == TradeKind::Buy)
    }

    /// Capital after the last closed trade, or `initial_capital` when none closed.
    pub fn final_capital(&self, initial_capital: f64) -> f64 {
        self.records
            .iter()
            .rev()
            .find(|r| r.is_sell())
            .map(|r| r.capital)
            .unwrap_or(initial_capital)
    }
}
