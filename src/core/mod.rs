//! Core domain types, validation, configuration and the library-wide error type.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

pub mod config;
pub mod error;
pub mod types;

pub use config::RiskConfig;
pub use error::{RiskError, RiskResult};
pub use types::*;

/// Black-Scholes sensitivities of one contract, or a position-weighted sum of them.
///
/// Values are recomputed from inputs, never mutated in place; aggregation builds new values.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    /// First derivative to spot.
    pub delta: f64,
    /// Second derivative to spot.
    pub gamma: f64,
    /// First derivative to time (per year).
    pub theta: f64,
    /// First derivative to volatility (per unit of volatility).
    pub vega: f64,
    /// First derivative to rate (per unit of rate).
    pub rho: f64,
}

impl Greeks {
    /// Greeks of `size` units of this position.
    pub fn scaled(self, size: f64) -> Self {
        Self {
            delta: self.delta * size,
            gamma: self.gamma * size,
            theta: self.theta * size,
            vega: self.vega * size,
            rho: self.rho * size,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.theta.is_finite()
            && self.vega.is_finite()
            && self.rho.is_finite()
    }
}

impl Add for Greeks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            theta: self.theta + rhs.theta,
            vega: self.vega + rhs.vega,
            rho: self.rho + rhs.rho,
        }
    }
}

impl AddAssign for Greeks {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Greeks {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_sum_is_linear_in_size() {
        let g = Greeks {
            delta: 0.5,
            gamma: 0.02,
            theta: -4.0,
            vega: 11.0,
            rho: 4.5,
        };
        let total: Greeks = [g.scaled(2.0), g.scaled(-0.5)].into_iter().sum();
        assert_eq!(total, g.scaled(1.5));
        assert_eq!(std::iter::empty::<Greeks>().sum::<Greeks>(), Greeks::default());
    }
}
