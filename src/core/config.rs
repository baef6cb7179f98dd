//! Risk-run configuration.
//!
//! Every field has a default, so an empty TOML document or `{}` JSON object is a valid
//! configuration.
//!
//! # Examples
//! ```rust
//! use optrisk::core::RiskConfig;
//!
//! let config = RiskConfig::from_toml_str("num_simulations = 5000\nrandom_seed = 7").unwrap();
//! assert_eq!(config.num_simulations, 5000);
//! assert_eq!(config.random_seed, Some(7));
//! assert_eq!(config.horizon_days, 30);
//! ```

use crate::core::error::{RiskError, RiskResult};
use crate::core::types::{DEFAULT_RISK_FREE_RATE, is_decimal_rate};

pub const DEFAULT_NUM_SIMULATIONS: usize = 1_000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    /// Number of Monte Carlo draws.
    pub num_simulations: usize,
    /// VaR confidence level in `(0, 1)`.
    pub confidence_level: f64,
    /// Seed for the simulator; a fresh seed is drawn (and reported) when absent.
    pub random_seed: Option<u64>,
    /// Decimal rate applied to every position of a portfolio built from this configuration.
    pub risk_free_rate: f64,
    /// Simulation horizon in calendar days.
    pub horizon_days: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            random_seed: None,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl RiskConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> RiskResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RiskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(s: &str) -> RiskResult<Self> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| RiskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_num_simulations(mut self, num_simulations: usize) -> Self {
        self.num_simulations = num_simulations;
        self
    }

    /// Checks ranges. Rates are decimals, so anything outside `[-1, 1]` is almost
    /// certainly a percentage passed by mistake.
    pub fn validate(&self) -> RiskResult<()> {
        if self.num_simulations == 0 {
            return Err(RiskError::invalid("num_simulations must be > 0"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(RiskError::invalid("confidence_level must be in (0, 1)"));
        }
        if self.horizon_days == 0 {
            return Err(RiskError::invalid("horizon_days must be > 0"));
        }
        if !is_decimal_rate(self.risk_free_rate) {
            return Err(RiskError::invalid(
                "risk_free_rate must be a decimal in [-1, 1]",
            ));
        }
        Ok(())
    }
}
