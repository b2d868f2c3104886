//! Configuration loading and validation.
//!
//! Everything is checked before any run starts: a bad scenario fails the
//! whole invocation instead of surfacing halfway through a batch.

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL, Scenario};
use crate::domain::error::BacktestError;
use crate::domain::simulator::FeeModel;
use crate::domain::strategy::{StrategyParams, StrategyRegistry};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const BACKTEST_SECTION: &str = "backtest";
pub const SCENARIO_PREFIX: &str = "scenario.";
pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_RETRY_DELAY_MS: i64 = 500;

/// Scenario keys that are not strategy parameters.
const RESERVED_SCENARIO_KEYS: [&str; 5] = ["symbol", "interval", "strategy", "start_date", "end_date"];

/// Validate the whole file: backtest settings, retry settings and every scenario.
pub fn validate_config(
    config: &dyn ConfigPort,
    registry: &StrategyRegistry,
) -> Result<(BacktestConfig, Vec<Scenario>), BacktestError> {
    let backtest = load_backtest_config(config)?;
    validate_retry(config)?;
    let scenarios = load_scenarios(config, registry)?;
    Ok((backtest, scenarios))
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let initial_capital =
        read_f64(config, BACKTEST_SECTION, "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if initial_capital <= 0.0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let commission_pct = read_f64(config, BACKTEST_SECTION, "commission_pct", 0.0)?;
    if commission_pct < 0.0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }

    let slippage_pct = read_f64(config, BACKTEST_SECTION, "slippage_pct", 0.0)?;
    if slippage_pct < 0.0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "slippage_pct",
            "slippage_pct must be non-negative",
        ));
    }

    Ok(BacktestConfig {
        initial_capital,
        fees: FeeModel {
            commission_pct,
            slippage_pct,
        },
    })
}

fn validate_retry(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if read_i64(config, BACKTEST_SECTION, "max_retries", DEFAULT_MAX_RETRIES)? < 1 {
        return Err(invalid(
            BACKTEST_SECTION,
            "max_retries",
            "max_retries must be at least 1",
        ));
    }
    if read_i64(config, BACKTEST_SECTION, "retry_delay_ms", DEFAULT_RETRY_DELAY_MS)? < 0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "retry_delay_ms",
            "retry_delay_ms must be non-negative",
        ));
    }
    Ok(())
}

/// Every `[scenario.<id>]` section, in section-name order.
pub fn load_scenarios(
    config: &dyn ConfigPort,
    registry: &StrategyRegistry,
) -> Result<Vec<Scenario>, BacktestError> {
    let default_start = optional_date(config, BACKTEST_SECTION, "start_date")?;
    let default_end = optional_date(config, BACKTEST_SECTION, "end_date")?;

    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(SCENARIO_PREFIX))
        .collect();
    sections.sort();

    if sections.is_empty() {
        return Err(BacktestError::ConfigMissing {
            section: format!("{SCENARIO_PREFIX}<id>"),
            key: "symbol".to_string(),
        });
    }

    sections
        .iter()
        .map(|section| load_scenario(config, registry, section, default_start, default_end))
        .collect()
}

fn load_scenario(
    config: &dyn ConfigPort,
    registry: &StrategyRegistry,
    section: &str,
    default_start: Option<NaiveDate>,
    default_end: Option<NaiveDate>,
) -> Result<Scenario, BacktestError> {
    let id = section.trim_start_matches(SCENARIO_PREFIX).to_string();
    if id.is_empty() {
        return Err(invalid(section, "id", "scenario id must not be empty"));
    }

    let symbol = required(config, section, "symbol")?;
    let interval = required(config, section, "interval")?;
    let strategy = required(config, section, "strategy")?;

    let start_date = optional_date(config, section, "start_date")?
        .or(default_start)
        .ok_or_else(|| missing(section, "start_date"))?;
    let end_date = optional_date(config, section, "end_date")?
        .or(default_end)
        .ok_or_else(|| missing(section, "end_date"))?;
    if start_date >= end_date {
        return Err(invalid(
            section,
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let mut params = StrategyParams::new();
    for key in config.keys(section) {
        if RESERVED_SCENARIO_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = read_f64(config, section, &key, f64::NAN)?;
        params.insert(key, value);
    }

    // Build once so unknown strategies and bad parameters fail up front.
    registry.create(&strategy, &params)?;

    Ok(Scenario {
        id,
        symbol: symbol.to_uppercase(),
        interval,
        strategy,
        params,
        start_date,
        end_date,
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, BacktestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(missing(section, key)),
    }
}

fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

/// A present but non-numeric value is an error, never a silent default.
fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, &format!("expected a number, got {s:?}"))),
        },
    }
}

fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, &format!("expected an integer, got {s:?}"))),
    }
}

fn missing(section: &str, key: &str) -> BacktestError {
    BacktestError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
