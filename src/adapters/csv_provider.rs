//! CSV price data adapter.
//!
//! One file per symbol and interval, `{SYMBOL}_{interval}.csv`, with a
//! `timestamp,open,high,low,close,volume` header.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{Bar, PriceSeries};
use crate::ports::data_port::PriceSeriesProvider;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvProvider {
    base_path: PathBuf,
}

impl CsvProvider {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD`
/// or epoch milliseconds.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl PriceSeriesProvider for CsvProvider {
    fn fetch_series(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::DataFetch {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (index, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| BacktestError::InvalidBar {
                symbol: symbol.to_string(),
                index,
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp =
                parse_timestamp(&row.timestamp).ok_or_else(|| BacktestError::InvalidBar {
                    symbol: symbol.to_string(),
                    index,
                    reason: format!("invalid timestamp {:?}", row.timestamp),
                })?;

            let day = timestamp.date();
            if day < start || day > end {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        PriceSeries::new(symbol, interval, bars)
    }

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, BacktestError> {
        let fetch_error = |reason: String| BacktestError::DataFetch {
            symbol: "*".to_string(),
            interval: interval.to_string(),
            reason,
        };

        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            fetch_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| fetch_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
