//! Persistence port trait for completed runs.

use crate::domain::error::BacktestError;
use crate::domain::ledger::TradeLedger;
use crate::domain::metrics::PerformanceReport;

/// Receives the outputs of a run that finished without error.
pub trait PersistenceSink: Send + Sync {
    fn persist(
        &self,
        run_id: &str,
        ledger: &TradeLedger,
        report: &PerformanceReport,
    ) -> Result<(), BacktestError>;
}
