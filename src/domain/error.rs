//! Domain error types.

/// Top-level error type for cryptobt.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("failed to fetch {symbol} {interval}: {reason}")]
    DataFetch {
        symbol: String,
        interval: String,
        reason: String,
    },

    #[error("signal shape mismatch: {reason}")]
    SignalShape { reason: String },

    #[error("invalid price {price} at bar {index}")]
    InvalidPrice { price: f64, index: usize },

    #[error("price series for {symbol} {interval} has no bars")]
    EmptySeries { symbol: String, interval: String },

    #[error("invalid bar {index} in {symbol}: {reason}")]
    InvalidBar {
        symbol: String,
        index: usize,
        reason: String,
    },

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to persist {run_id}: {reason}")]
    Persistence { run_id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Transient failures the caller may retry. Everything else is fatal to the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BacktestError::DataFetch { .. })
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Persistence { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::DataFetch { .. } => 3,
            BacktestError::SignalShape { .. } | BacktestError::UnknownStrategy(_) => 4,
            BacktestError::EmptySeries { .. }
            | BacktestError::InvalidBar { .. }
            | BacktestError::InvalidPrice { .. }
            | BacktestError::InvalidCapital(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
