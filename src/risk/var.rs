//! Tail statistics of a simulated payoff distribution.
//!
//! Unlike loss-positive VaR conventions, everything here is expressed on the payoff axis:
//! - `value_at_risk(c)` is the `(1 - c)` quantile of payoffs, so at 95% confidence it is the
//!   5th percentile and a negative value is a loss,
//! - `expected_shortfall(c)` is the mean payoff of draws at or below that quantile,
//! - `probability_of_profit` is the share of strictly positive payoffs.
//!
//! Quantiles are exact: the sample is sorted and adjacent order statistics are linearly
//! interpolated at rank `p * (n - 1)`, which matches NumPy's default percentile rule. This
//! costs `O(n log n)` time and `O(n)` memory.

use crate::core::{RiskError, RiskResult};
use crate::math::mean;

/// Summary statistics of one payoff sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PayoffStats {
    pub probability_of_profit: f64,
    pub value_at_risk: f64,
    pub expected_shortfall: f64,
    pub expected_payoff: f64,
}

pub(crate) fn validate_confidence(confidence: f64) -> RiskResult<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(RiskError::invalid("confidence level must be in (0, 1)"))
    }
}

/// Computes POP, VaR, ES and mean of `payoffs`, sorting the slice in place.
///
/// # Examples
/// ```rust
/// use optrisk::risk::var::payoff_stats;
///
/// let mut payoffs: Vec<f64> = (0..=100).map(|i| i as f64 - 50.0).collect();
/// let stats = payoff_stats(&mut payoffs, 0.95).unwrap();
/// assert!((stats.value_at_risk + 45.0).abs() < 1e-9);
/// assert_eq!(stats.expected_payoff, 0.0);
/// ```
pub fn payoff_stats(payoffs: &mut [f64], confidence: f64) -> RiskResult<PayoffStats> {
    validate_confidence(confidence)?;
    if payoffs.is_empty() {
        return Err(RiskError::invalid("payoff sample must not be empty"));
    }
    if payoffs.iter().any(|p| !p.is_finite()) {
        return Err(RiskError::invalid("payoff sample contains non-finite values"));
    }

    let expected_payoff = mean(payoffs);
    let probability_of_profit = probability_of_profit(payoffs);

    payoffs.sort_by(|a, b| a.total_cmp(b));
    let value_at_risk = sorted_quantile(payoffs, 1.0 - confidence);
    let expected_shortfall = tail_mean(payoffs, value_at_risk);

    Ok(PayoffStats {
        probability_of_profit,
        value_at_risk,
        expected_shortfall,
        expected_payoff,
    })
}

/// Share of payoffs strictly greater than zero.
pub fn probability_of_profit(payoffs: &[f64]) -> f64 {
    if payoffs.is_empty() {
        return 0.0;
    }
    payoffs.iter().filter(|&&p| p > 0.0).count() as f64 / payoffs.len() as f64
}

/// Linearly interpolated quantile of an ascending, non-empty sample.
pub fn sorted_quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = rank - lo as f64;
        sorted[lo] + w * (sorted[hi] - sorted[lo])
    }
}

/// Mean of the ascending sample at or below `threshold`.
fn tail_mean(sorted: &[f64], threshold: f64) -> f64 {
    let tail = sorted.partition_point(|&p| p <= threshold + 1.0e-12);
    if tail == 0 {
        threshold
    } else {
        mean(&sorted[..tail])
    }
}
