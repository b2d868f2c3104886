//! Name → constructor lookup for signal producers.
//!
//! Built once at startup; scenarios refer to strategies by name and supply
//! a parameter map that is checked against the strategy's known keys.

use std::collections::BTreeMap;

use crate::domain::error::BacktestError;
use crate::domain::indicator::macd;
use crate::domain::strategy::{
    BollingerRsi, MaCrossover, MacdCross, RsiThreshold, SignalProducer, StrategyParams,
    bollinger_rsi, ma_crossover, macd_cross, rsi_threshold,
};

type Constructor = fn(&StrategyParams) -> Result<Box<dyn SignalProducer>, BacktestError>;

fn boxed<P: SignalProducer + 'static>(producer: P) -> Box<dyn SignalProducer> {
    Box::new(producer)
}

/// A registered strategy with its default parameters.
#[derive(Clone)]
pub struct StrategyEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub defaults: Vec<(&'static str, f64)>,
    constructor: Constructor,
}

impl StrategyEntry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        defaults: Vec<(&'static str, f64)>,
        constructor: Constructor,
    ) -> Self {
        Self {
            name,
            description,
            defaults,
            constructor,
        }
    }
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<&'static str, StrategyEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(StrategyEntry::new(
            ma_crossover::NAME,
            "long while short SMA is above long SMA",
            vec![
                ("short_window", ma_crossover::DEFAULT_SHORT_WINDOW as f64),
                ("long_window", ma_crossover::DEFAULT_LONG_WINDOW as f64),
            ],
            |p| MaCrossover::from_params(p).map(boxed),
        ));
        registry.register(StrategyEntry::new(
            rsi_threshold::NAME,
            "buy oversold RSI, sell overbought RSI",
            vec![
                ("window", rsi_threshold::DEFAULT_WINDOW as f64),
                ("buy_threshold", rsi_threshold::DEFAULT_BUY_THRESHOLD),
                ("sell_threshold", rsi_threshold::DEFAULT_SELL_THRESHOLD),
            ],
            |p| RsiThreshold::from_params(p).map(boxed),
        ));
        registry.register(StrategyEntry::new(
            bollinger_rsi::NAME,
            "Bollinger band breakouts confirmed by RSI",
            vec![
                ("window", bollinger_rsi::DEFAULT_WINDOW as f64),
                ("std_mult", bollinger_rsi::DEFAULT_STD_MULT),
                ("rsi_window", bollinger_rsi::DEFAULT_RSI_WINDOW as f64),
                ("buy_rsi", bollinger_rsi::DEFAULT_BUY_RSI),
                ("sell_rsi", bollinger_rsi::DEFAULT_SELL_RSI),
            ],
            |p| BollingerRsi::from_params(p).map(boxed),
        ));
        registry.register(StrategyEntry::new(
            macd_cross::NAME,
            "MACD signal-line crossover (labeled actions)",
            vec![
                ("fast", macd::DEFAULT_FAST as f64),
                ("slow", macd::DEFAULT_SLOW as f64),
                ("signal", macd::DEFAULT_SIGNAL as f64),
            ],
            |p| MacdCross::from_params(p).map(boxed),
        ));
        registry
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register(&mut self, entry: StrategyEntry) {
        self.entries.insert(entry.name, entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &StrategyEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Build a producer; unknown names and unknown parameter keys are errors.
    pub fn create(
        &self,
        name: &str,
        params: &StrategyParams,
    ) -> Result<Box<dyn SignalProducer>, BacktestError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BacktestError::UnknownStrategy(name.to_string()))?;

        if let Some(key) = params
            .keys()
            .find(|k| !entry.defaults.iter().any(|(d, _)| *d == k.as_str()))
        {
            return Err(BacktestError::ConfigInvalid {
                section: format!("strategy.{name}"),
                key: key.clone(),
                reason: format!("unknown parameter for {name}"),
            });
        }

        (entry.constructor)(params)
    }
}
