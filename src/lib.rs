//! `optrisk` prices listed options and estimates the risk of option positions: closed-form
//! Black-Scholes Greeks, expiry payoffs and straddle analytics, and seeded Monte Carlo
//! probability-of-profit (POP) and Value-at-Risk (VaR) for single contracts and portfolios.
//!
//! Market data and presentation stay outside the crate: callers hand in structured
//! [`OptionContract`](core::OptionContract) records and get structured, serializable results
//! back.
//!
//! References used across modules include:
//! - Hull, *Options, Futures, and Other Derivatives* (11th ed.), Ch. 15 and 19.
//! - Glasserman (2004) for Monte Carlo estimators.
//! - Abramowitz and Stegun 26.2.17 for the normal CDF.
//!
//! Numerical considerations:
//! - Rates and volatilities are decimals; time to expiry is Act/365 Fixed, floored at `1e-6`.
//! - Degenerate inputs are rejected with [`RiskError`](core::RiskError) rather than turned
//!   into NaN.
//! - Monte Carlo runs are a pure function of their inputs and seed. VaR is the exact sample
//!   quantile of the payoff distribution, so memory grows linearly with the draw count.
//!
//! # Feature Flags
//! - `parallel`: Rayon-powered block-parallel Monte Carlo and per-contract portfolio work.
//!   Results are bit-identical with and without it.
//!
//! # Quick Start
//! Compute Greeks:
//! ```rust
//! use optrisk::core::OptionType;
//! use optrisk::greeks::black_scholes_greeks;
//!
//! let g = black_scholes_greeks(OptionType::Call, 100.0, 100.0, 0.05, 0.20, 1.0).unwrap();
//! assert!(g.delta > 0.0 && g.gamma > 0.0 && g.vega > 0.0);
//! ```
//!
//! Walk a straddle payoff curve:
//! ```rust
//! use optrisk::pricing::payoff::{PayoffCurve, SpotGrid, Straddle};
//!
//! let straddle = Straddle::new(100.0, 10.0, 10.0);
//! let curve = PayoffCurve::new(SpotGrid::new(80.0, 120.0, 1.0).unwrap(), &straddle);
//! let at_strike = curve.iter().find(|(s, _)| *s == 100.0).unwrap();
//! assert_eq!(at_strike.1, -20.0);
//! ```
//!
//! Simulate POP and VaR of a long put:
//! ```rust
//! use optrisk::core::OptionType;
//! use optrisk::mc::MonteCarloRiskEngine;
//! use optrisk::pricing::payoff::Leg;
//!
//! let put = Leg::long(OptionType::Put, 95.0, 1.2);
//! let result = MonteCarloRiskEngine::new(20_000, 30, 0.95)
//!     .with_seed(1)
//!     .run(&put, 100.0, 0.3)
//!     .unwrap();
//! assert!(result.probability_of_profit > 0.0 && result.probability_of_profit < 0.5);
//! assert!(result.value_at_risk >= -1.2);
//! ```

pub mod core;
pub mod greeks;
pub mod math;
pub mod mc;
pub mod pricing;
pub mod risk;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::greeks::{black_scholes_greeks, contract_greeks};
    pub use crate::mc::{MonteCarloRiskEngine, RiskSimulationResult};
    pub use crate::pricing::european::black_scholes_price;
    pub use crate::pricing::payoff::{
        Leg, Payoff, PayoffCurve, SpotGrid, Straddle, Strategy, option_payoff, straddle_payoff,
    };
    pub use crate::risk::{ContractReport, Portfolio, PortfolioEntry, PortfolioReport, Position};
}
