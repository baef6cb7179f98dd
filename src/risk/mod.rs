//! Top-level risk namespace for payoff-distribution statistics and portfolio aggregation.
//!
//! This module wires and re-exports:
//! - `var`: POP, VaR and expected shortfall of a simulated payoff sample,
//! - `portfolio`: position Greeks aggregation and shared-draw joint simulation per underlying.

pub mod portfolio;
pub mod var;

pub use portfolio::{ContractReport, Portfolio, PortfolioEntry, PortfolioReport, Position};
pub use var::{PayoffStats, payoff_stats, probability_of_profit, sorted_quantile};
