//! Single-position state held by the simulator.

/// At most one long position is open at a time; there is no shorting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long { entry_price: f64, entry_index: usize },
}

impl Position {
    /// (exit - entry) * (capital / entry); zero when flat.
    pub fn realized_profit(&self, exit_price: f64, capital: f64) -> f64 {
        match self {
            Position::Long { entry_price, .. } => {
                (exit_price - entry_price) * (capital / entry_price)
            }
            Position::Flat => 0.0,
        }
    }
}
