//! CSV persistence adapter.
//!
//! Writes `{run_id}_trades.csv` and `{run_id}_report.csv` into the output
//! directory, creating it if needed. Either both files land or neither does.

use crate::domain::error::BacktestError;
use crate::domain::ledger::TradeLedger;
use crate::domain::metrics::PerformanceReport;
use crate::ports::sink_port::PersistenceSink;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct TradeRow {
    timestamp: String,
    #[serde(rename = "type")]
    kind: String,
    price: f64,
    profit: Option<f64>,
    capital: f64,
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    key: &'a str,
    value: String,
}

pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn trades_path(&self, run_id: &str) -> PathBuf {
        self.output_dir.join(format!("{run_id}_trades.csv"))
    }

    pub fn report_path(&self, run_id: &str) -> PathBuf {
        self.output_dir.join(format!("{run_id}_report.csv"))
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    for row in rows {
        writer.serialize(row).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("csv.tmp")
}

fn write_trades(path: &Path, ledger: &TradeLedger) -> Result<(), String> {
    if ledger.is_empty() {
        // serialize() emits the header with the first row; write it by hand here
        return fs::write(path, "timestamp,type,price,profit,capital\n").map_err(|e| e.to_string());
    }
    let rows = ledger.records().iter().map(|r| TradeRow {
        timestamp: r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        kind: r.kind.to_string(),
        price: r.price,
        profit: r.profit,
        capital: r.capital,
    });
    write_rows(path, rows)
}

fn write_report(path: &Path, report: &PerformanceReport) -> Result<(), String> {
    let rows = report
        .to_pairs()
        .into_iter()
        .map(|(key, value)| ReportRow { key, value });
    write_rows(path, rows)
}

fn with_path<T>(path: &Path, result: Result<T, impl std::fmt::Display>) -> Result<T, String> {
    result.map_err(|e| format!("{}: {}", path.display(), e))
}

impl PersistenceSink for CsvSink {
    /// Both files are staged next to their targets and renamed into place
    /// only once both are written, so a failed run leaves neither behind.
    fn persist(
        &self,
        run_id: &str,
        ledger: &TradeLedger,
        report: &PerformanceReport,
    ) -> Result<(), BacktestError> {
        let fail = |reason: String| BacktestError::Persistence {
            run_id: run_id.to_string(),
            reason,
        };

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| fail(format!("{}: {}", self.output_dir.display(), e)))?;

        let trades_path = self.trades_path(run_id);
        let report_path = self.report_path(run_id);
        let trades_tmp = staging_path(&trades_path);
        let report_tmp = staging_path(&report_path);

        let outcome = with_path(&trades_tmp, write_trades(&trades_tmp, ledger))
            .and_then(|()| with_path(&report_tmp, write_report(&report_tmp, report)))
            .and_then(|()| with_path(&trades_path, fs::rename(&trades_tmp, &trades_path)))
            .and_then(|()| {
                with_path(&report_path, fs::rename(&report_tmp, &report_path)).inspect_err(|_| {
                    let _ = fs::remove_file(&trades_path);
                })
            });

        if let Err(reason) = outcome {
            let _ = fs::remove_file(&trades_tmp);
            let _ = fs::remove_file(&report_tmp);
            return Err(fail(reason));
        }

        log::debug!("{run_id}: wrote {} and {}", trades_path.display(), report_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_series;
    use crate::domain::metrics::compute_metrics;
    use crate::domain::signal::SignalPair;
    use crate::domain::simulator::simulate;
    use tempfile::TempDir;

    fn round_trip_ledger() -> TradeLedger {
        let series = make_series(&[100.0, 110.0, 120.0]);
        let signals = SignalPair::new(
            vec![Some(100.0), None, None],
            vec![None, None, Some(120.0)],
        )
        .unwrap();
        simulate(&series, &signals, 10_000.0).unwrap()
    }

    #[test]
    fn persist_writes_trades_and_report() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out"));
        let ledger = round_trip_ledger();
        let report = compute_metrics(&ledger, 10_000.0);

        sink.persist("run1", &ledger, &report).unwrap();

        let trades = fs::read_to_string(sink.trades_path("run1")).unwrap();
        let lines: Vec<&str> = trades.lines().collect();
        assert_eq!(lines[0], "timestamp,type,price,profit,capital");
        assert_eq!(lines[1], "2024-01-01 00:00:00,buy,100.0,,10000.0");
        assert_eq!(lines[2], "2024-01-01 02:00:00,sell,120.0,2000.0,12000.0");

        let report_csv = fs::read_to_string(sink.report_path("run1")).unwrap();
        assert!(report_csv.starts_with("key,value\n"));
        assert!(report_csv.contains("profit_factor,inf\n"));
        assert!(report_csv.contains("total_trades,1\n"));
    }

    #[test]
    fn persist_empty_ledger_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().to_path_buf());
        let ledger = TradeLedger::new();
        let report = compute_metrics(&ledger, 10_000.0);

        sink.persist("quiet", &ledger, &report).unwrap();

        let trades = fs::read_to_string(sink.trades_path("quiet")).unwrap();
        assert_eq!(trades, "timestamp,type,price,profit,capital\n");
        let report_csv = fs::read_to_string(sink.report_path("quiet")).unwrap();
        assert!(report_csv.contains("profit_factor,0.0000\n"));
    }

    #[test]
    fn persist_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let sink = CsvSink::new(blocker.join("sub"));
        let ledger = TradeLedger::new();
        let err = sink
            .persist("r", &ledger, &compute_metrics(&ledger, 1.0))
            .unwrap_err();
        assert!(matches!(err, BacktestError::Persistence { ref run_id, .. } if run_id == "r"));
    }

    #[test]
    fn failed_report_write_leaves_no_trades_file() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().to_path_buf());
        fs::create_dir(sink.report_path("run1")).unwrap();
        let ledger = round_trip_ledger();

        let err = sink
            .persist("run1", &ledger, &compute_metrics(&ledger, 10_000.0))
            .unwrap_err();

        assert!(matches!(err, BacktestError::Persistence { .. }));
        assert!(!sink.trades_path("run1").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
    }

    #[test]
    fn persist_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().to_path_buf());
        fs::write(sink.trades_path("again"), "stale").unwrap();
        let ledger = round_trip_ledger();

        sink.persist("again", &ledger, &compute_metrics(&ledger, 10_000.0))
            .unwrap();

        let trades = fs::read_to_string(sink.trades_path("again")).unwrap();
        assert!(trades.starts_with("timestamp,type,price,profit,capital\n"));
    }
}
