#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use cryptobt::domain::error::BacktestError;
use cryptobt::domain::ledger::TradeLedger;
use cryptobt::domain::metrics::PerformanceReport;
pub use cryptobt::domain::ohlcv::{Bar, PriceSeries};
use cryptobt::domain::signal::{SignalOutput, SignalPair};
use cryptobt::domain::strategy::SignalProducer;
use cryptobt::ports::data_port::PriceSeriesProvider;
use cryptobt::ports::sink_port::PersistenceSink;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hour(i: usize) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::hours(i as i64)
}

/// Flat hourly bar closing at `close`.
pub fn make_bar(i: usize, close: f64) -> Bar {
    Bar {
        timestamp: hour(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes.iter().enumerate().map(|(i, &c)| make_bar(i, c)).collect()
}

pub fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(symbol, "1h", make_bars(closes)).unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Provider serving canned closes per symbol, or a scripted error.
#[derive(Default)]
pub struct MockProvider {
    pub data: HashMap<String, Vec<f64>>,
    pub errors: HashMap<String, String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.data.insert(symbol.to_string(), closes.to_vec());
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PriceSeriesProvider for MockProvider {
    fn fetch_series(
        &self,
        symbol: &str,
        interval: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::DataFetch {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                reason: reason.clone(),
            });
        }
        let closes = self.data.get(symbol).cloned().unwrap_or_default();
        PriceSeries::new(symbol, interval, make_bars(&closes))
    }

    fn list_symbols(&self, _interval: &str) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Sink that keeps every persisted run in memory.
#[derive(Default)]
pub struct MemorySink {
    pub runs: Mutex<Vec<(String, TradeLedger, PerformanceReport)>>,
}

impl MemorySink {
    pub fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.lock().unwrap().iter().map(|r| r.0.clone()).collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.runs.lock().unwrap().is_empty()
    }
}

impl PersistenceSink for MemorySink {
    fn persist(
        &self,
        run_id: &str,
        ledger: &TradeLedger,
        report: &PerformanceReport,
    ) -> Result<(), BacktestError> {
        self.runs
            .lock()
            .unwrap()
            .push((run_id.to_string(), ledger.clone(), report.clone()));
        Ok(())
    }
}

/// Producer that replays fixed buy/sell arrays regardless of the series.
pub struct ScriptedProducer {
    pub buy: Vec<Option<f64>>,
    pub sell: Vec<Option<f64>>,
}

impl SignalProducer for ScriptedProducer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn min_bars(&self) -> usize {
        0
    }

    fn evaluate(&self, _series: &PriceSeries) -> Result<SignalOutput, BacktestError> {
        Ok(SignalOutput::Parallel(SignalPair::new(
            self.buy.clone(),
            self.sell.clone(),
        )?))
    }
}
