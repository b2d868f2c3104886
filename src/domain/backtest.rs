//! Backtest orchestration: acquire → evaluate → normalize → simulate →
//! measure → persist.
//!
//! A run either completes every stage or returns the first error; nothing
//! is persisted for a failed run.

use chrono::NaiveDate;
use log::{error, info, warn};
use rayon::prelude::*;

use crate::domain::error::BacktestError;
use crate::domain::ledger::TradeLedger;
use crate::domain::metrics::{PerformanceReport, compute_metrics};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::normalize;
use crate::domain::simulator::{FeeModel, simulate_with};
use crate::domain::strategy::{SignalProducer, StrategyParams, StrategyRegistry};
use crate::ports::data_port::PriceSeriesProvider;
use crate::ports::sink_port::PersistenceSink;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Run-wide parameters shared by every scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub fees: FeeModel,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            fees: FeeModel::none(),
        }
    }
}

/// One (symbol, interval, strategy, period) combination to backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: String,
    pub symbol: String,
    pub interval: String,
    pub strategy: String,
    pub params: StrategyParams,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Scenario {
    /// Output name for this run, e.g. `btc_daily_BTCUSDT_ma_crossover`.
    pub fn run_id(&self) -> String {
        format!("{}_{}_{}", self.id, self.symbol, self.strategy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub ledger: TradeLedger,
    pub report: PerformanceReport,
}

/// Result of one scenario inside a batch.
#[derive(Debug)]
pub struct RunSummary {
    pub scenario_id: String,
    pub run_id: String,
    pub result: Result<PerformanceReport, BacktestError>,
}

impl RunSummary {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Evaluate, normalize, simulate and measure an already-acquired series.
    pub fn run(
        &self,
        series: &PriceSeries,
        producer: &dyn SignalProducer,
    ) -> Result<BacktestOutcome, BacktestError> {
        if series.len() < producer.min_bars() {
            warn!(
                "{} {}: {} bars is fewer than the {} {} needs; expect no signals",
                series.symbol(),
                series.interval(),
                series.len(),
                producer.min_bars(),
                producer.name()
            );
        }

        let output = producer.evaluate(series)?;
        let signals = normalize(output, series.len())?;
        let ledger = simulate_with(
            series,
            &signals,
            self.config.initial_capital,
            &self.config.fees,
        )?;
        let report = compute_metrics(&ledger, self.config.initial_capital);

        Ok(BacktestOutcome { ledger, report })
    }

    /// Full pipeline for one scenario, including acquisition and persistence.
    pub fn run_scenario(
        &self,
        provider: &dyn PriceSeriesProvider,
        sink: &dyn PersistenceSink,
        registry: &StrategyRegistry,
        scenario: &Scenario,
    ) -> Result<BacktestOutcome, BacktestError> {
        let run_id = scenario.run_id();
        info!(
            "{run_id}: {} {} {} from {} to {}",
            scenario.symbol,
            scenario.interval,
            scenario.strategy,
            scenario.start_date,
            scenario.end_date
        );

        let producer = registry.create(&scenario.strategy, &scenario.params)?;
        let series = provider.fetch_series(
            &scenario.symbol,
            &scenario.interval,
            scenario.start_date,
            scenario.end_date,
        )?;
        let outcome = self.run(&series, producer.as_ref())?;
        sink.persist(&run_id, &outcome.ledger, &outcome.report)?;

        info!(
            "{run_id}: {} closed trades, final capital {:.2} ({:+.2}%)",
            outcome.report.total_trades, outcome.report.final_capital, outcome.report.return_pct
        );
        Ok(outcome)
    }

    /// Run scenarios in parallel. A failed scenario is logged and reported
    /// in its summary; the others still run.
    pub fn run_batch(
        &self,
        provider: &dyn PriceSeriesProvider,
        sink: &dyn PersistenceSink,
        registry: &StrategyRegistry,
        scenarios: &[Scenario],
    ) -> Vec<RunSummary> {
        scenarios
            .par_iter()
            .map(|scenario| {
                let result = self
                    .run_scenario(provider, sink, registry, scenario)
                    .map(|outcome| outcome.report);
                if let Err(e) = &result {
                    error!("{}: run failed: {e}", scenario.run_id());
                }
                RunSummary {
                    scenario_id: scenario.id.clone(),
                    run_id: scenario.run_id(),
                    result,
                }
            })
            .collect()
    }
}
