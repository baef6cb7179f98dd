//! Library-wide error type.

/// Errors surfaced by validation, simulation and configuration loading.
///
/// Zero volatility is handled as a branch inside the simulator and never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RiskError {
    /// Input validation error, optionally tied to a contract symbol.
    #[error("invalid input{}: {reason}", symbol_suffix(.symbol))]
    InvalidInput {
        symbol: Option<String>,
        reason: String,
    },
    /// The market-data boundary could not supply a contract.
    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
    /// A cooperative cancellation hook fired before the simulation finished.
    #[error("simulation cancelled")]
    Cancelled,
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type RiskResult<T> = Result<T, RiskError>;

fn symbol_suffix(symbol: &Option<String>) -> String {
    symbol
        .as_deref()
        .map(|s| format!(" for {s}"))
        .unwrap_or_default()
}

impl RiskError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            symbol: None,
            reason: reason.into(),
        }
    }

    pub fn invalid_for(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            symbol: Some(symbol.into()),
            reason: reason.into(),
        }
    }

    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Attaches `symbol` to an input error that does not name a contract yet.
    pub fn with_symbol(self, symbol: &str) -> Self {
        match self {
            Self::InvalidInput {
                symbol: None,
                reason,
            } => Self::InvalidInput {
                symbol: Some(symbol.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// Contract symbol carried by the error, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { symbol, .. } => symbol.as_deref(),
            Self::DataUnavailable { symbol, .. } => Some(symbol),
            Self::Cancelled | Self::Config(_) => None,
        }
    }
}
