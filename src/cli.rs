//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_provider::CsvProvider;
use crate::adapters::csv_sink::CsvSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::retry::{RetryPolicy, RetryingProvider};
use crate::domain::backtest::{Backtester, RunSummary, Scenario};
use crate::domain::config_validation::{
    BACKTEST_SECTION, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, validate_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::format_ratio;
use crate::domain::strategy::StrategyRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSeriesProvider;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "cryptobt", about = "Crypto strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scenarios defined in a config file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run only this scenario id
        #[arg(short, long)]
        scenario: Option<String>,
        /// Override [backtest] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a config file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered strategies and their default parameters
    Strategies,
    /// List symbols with data for an interval
    ListSymbols {
        #[arg(short, long)]
        interval: String,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let registry = StrategyRegistry::with_builtins();
    match cli.command {
        Command::Backtest {
            config,
            scenario,
            output,
        } => run_backtest(&registry, &config, scenario.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&registry, &config),
        Command::Strategies => run_strategies(&registry),
        Command::ListSymbols { interval, config } => run_list_symbols(&interval, &config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &BacktestError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string(BACKTEST_SECTION, "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn output_dir(config: &dyn ConfigPort, cli_override: Option<&Path>) -> PathBuf {
    cli_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string(BACKTEST_SECTION, "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

pub fn retry_policy(config: &dyn ConfigPort) -> RetryPolicy {
    let attempts = config.get_int(BACKTEST_SECTION, "max_retries", DEFAULT_MAX_RETRIES);
    let delay_ms = config.get_int(BACKTEST_SECTION, "retry_delay_ms", DEFAULT_RETRY_DELAY_MS);
    RetryPolicy {
        max_attempts: u32::try_from(attempts).unwrap_or(1).max(1),
        base_delay: Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0)),
    }
}

fn run_backtest(
    registry: &StrategyRegistry,
    config_path: &Path,
    only: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate everything before any run starts
    let (backtest_config, mut scenarios) = match validate_config(&adapter, registry) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    // Stage 3: Select scenarios
    if let Some(id) = only {
        let id = id.to_lowercase();
        scenarios.retain(|s| s.id == id);
        if scenarios.is_empty() {
            return fail(&BacktestError::ConfigMissing {
                section: format!("scenario.{id}"),
                key: "symbol".to_string(),
            });
        }
    }
    eprintln!(
        "Running {} scenario(s), initial capital {:.2}",
        scenarios.len(),
        backtest_config.initial_capital
    );

    // Stage 4: Wire adapters
    let provider = RetryingProvider::new(CsvProvider::new(data_dir(&adapter)), retry_policy(&adapter));
    let out_dir = output_dir(&adapter, output);
    let sink = CsvSink::new(out_dir.clone());

    // Stage 5: Run batch
    let backtester = Backtester::new(backtest_config);
    let summaries = backtester.run_batch(&provider, &sink, registry, &scenarios);

    // Stage 6: Print console summary to stderr
    print_summary(&scenarios, &summaries);
    eprintln!("\nResults written to: {}", out_dir.display());

    match summaries.iter().find_map(|s| s.result.as_ref().err()) {
        Some(first_error) => ExitCode::from(first_error),
        None => ExitCode::SUCCESS,
    }
}

fn print_summary(scenarios: &[Scenario], summaries: &[RunSummary]) {
    eprintln!("\n=== Run Results ===");
    for (scenario, summary) in scenarios.iter().zip(summaries) {
        match &summary.result {
            Ok(report) => eprintln!(
                "  {:<24} {:<10} {:<4} {:<14} return {:>8.2}%  trades {:>4}  win {:>5.1}%  pf {:>7}  sharpe {:>6.2}  mdd -{:.1}%{}",
                summary.scenario_id,
                scenario.symbol,
                scenario.interval,
                scenario.strategy,
                report.return_pct,
                report.total_trades,
                report.win_rate * 100.0,
                format_ratio(report.profit_factor),
                report.sharpe_ratio,
                report.max_drawdown * 100.0,
                if report.open_position { "  (open)" } else { "" }
            ),
            Err(e) => eprintln!("  {:<24} FAILED: {}", summary.scenario_id, e),
        }
    }

    let succeeded: Vec<_> = summaries
        .iter()
        .filter_map(|s| s.result.as_ref().ok().map(|report| (s, report)))
        .collect();
    let failed = summaries.len() - succeeded.len();

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Runs:             {} ok, {} failed", succeeded.len(), failed);
    if !succeeded.is_empty() {
        let total_trades: usize = succeeded.iter().map(|(_, r)| r.total_trades).sum();
        let mean_return =
            succeeded.iter().map(|(_, r)| r.return_pct).sum::<f64>() / succeeded.len() as f64;
        eprintln!("Mean Return:      {:.2}%", mean_return);
        eprintln!("Total Trades:     {}", total_trades);
        if let Some((best, report)) = succeeded
            .iter()
            .max_by(|a, b| a.1.return_pct.total_cmp(&b.1.return_pct))
        {
            eprintln!("Best Run:         {} ({:.2}%)", best.run_id, report.return_pct);
        }
    }
}

fn run_validate(registry: &StrategyRegistry, config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_config(&adapter, registry) {
        Ok((backtest_config, scenarios)) => {
            eprintln!("Initial capital:  {:.2}", backtest_config.initial_capital);
            eprintln!(
                "Fees:             commission {}%, slippage {}%",
                backtest_config.fees.commission_pct, backtest_config.fees.slippage_pct
            );
            eprintln!("\nScenarios:");
            for s in &scenarios {
                eprintln!(
                    "  {}: {} {} {} {}..{}",
                    s.id, s.symbol, s.interval, s.strategy, s.start_date, s.end_date
                );
            }
            eprintln!("\nConfiguration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_strategies(registry: &StrategyRegistry) -> ExitCode {
    for entry in registry.entries() {
        let defaults: Vec<String> = entry
            .defaults
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("{:<16} {}", entry.name, entry.description);
        println!("{:<16} defaults: {}", "", defaults.join(", "));
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(interval: &str, config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let provider = CsvProvider::new(data_dir(&adapter));

    match provider.list_symbols(interval) {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found for interval {}", interval);
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
