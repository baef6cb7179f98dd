//! Closed-form Black-Scholes Greeks for a single European contract (no dividends).
//!
//! With `T` floored at [`MIN_TIME_TO_EXPIRY`](crate::core::MIN_TIME_TO_EXPIRY):
//! - `d1 = (ln(S/K) + (r + σ²/2)T) / (σ√T)`, `d2 = d1 - σ√T`
//! - Delta: call `Φ(d1)`, put `Φ(d1) - 1`
//! - Gamma `φ(d1)/(Sσ√T)` and Vega `Sφ(d1)√T` are side-independent
//! - Theta: `-(Sφ(d1)σ)/(2√T) ∓ rKe^(-rT)Φ(±d2)`
//! - Rho: call `KTe^(-rT)Φ(d2)`, put `-KTe^(-rT)Φ(-d2)`
//!
//! Theta is per year, Vega and Rho are per unit (not per 1%) of volatility and rate.
//!
//! Degenerate inputs (`σ <= 0`, `S <= 0`, `K <= 0`) are rejected with
//! [`RiskError::InvalidInput`] instead of returning NaN or clamped values.

use chrono::NaiveDate;

use crate::core::{Greeks, OptionContract, OptionType, RiskError, RiskResult};
use crate::math::{normal_cdf, normal_pdf};

/// Returns `(d1, d2)`. Inputs must already be validated.
#[inline]
pub fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let vt = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / vt;
    let d2 = d1 - vt;
    (d1, d2)
}

pub(crate) fn validate_kernel_inputs(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> RiskResult<()> {
    if !s.is_finite() || s <= 0.0 {
        return Err(RiskError::invalid("spot must be finite and > 0"));
    }
    if !k.is_finite() || k <= 0.0 {
        return Err(RiskError::invalid("strike must be finite and > 0"));
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(RiskError::invalid(
            "volatility must be finite and > 0 for closed-form Greeks",
        ));
    }
    if !t.is_finite() || t <= 0.0 {
        return Err(RiskError::invalid("time to expiry must be finite and > 0"));
    }
    if !r.is_finite() {
        return Err(RiskError::invalid("risk-free rate must be finite"));
    }
    Ok(())
}

/// Black-Scholes Greeks from raw inputs.
///
/// # Errors
/// [`RiskError::InvalidInput`] when `s`, `k`, `sigma` or `t` is not finite and positive, or
/// when `r` is not finite.
///
/// # Examples
/// ```rust
/// use optrisk::core::OptionType;
/// use optrisk::greeks::black_scholes_greeks;
///
/// let g = black_scholes_greeks(OptionType::Call, 100.0, 100.0, 0.05, 0.20, 30.0 / 365.0).unwrap();
/// assert!((g.delta - 0.54).abs() < 0.01);
/// assert!(black_scholes_greeks(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 1.0).is_err());
/// ```
pub fn black_scholes_greeks(
    option_type: OptionType,
    s: f64,
    k: f64,
    r: f64,
    sigma: f64,
    t: f64,
) -> RiskResult<Greeks> {
    validate_kernel_inputs(s, k, r, sigma, t)?;

    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    let sqrt_t = t.sqrt();
    let df_r = (-r * t).exp();
    let pdf_d1 = normal_pdf(d1);

    let delta = match option_type {
        OptionType::Call => normal_cdf(d1),
        OptionType::Put => normal_cdf(d1) - 1.0,
    };

    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t;

    let time_decay = -s * pdf_d1 * sigma / (2.0 * sqrt_t);
    let theta = match option_type {
        OptionType::Call => time_decay - r * k * df_r * normal_cdf(d2),
        OptionType::Put => time_decay + r * k * df_r * normal_cdf(-d2),
    };

    let rho = match option_type {
        OptionType::Call => k * t * df_r * normal_cdf(d2),
        OptionType::Put => -k * t * df_r * normal_cdf(-d2),
    };

    let greeks = Greeks {
        delta,
        gamma,
        theta,
        vega,
        rho,
    };
    let named = [
        ("delta", greeks.delta),
        ("gamma", greeks.gamma),
        ("theta", greeks.theta),
        ("vega", greeks.vega),
        ("rho", greeks.rho),
    ];
    if let Some((name, _)) = named.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RiskError::invalid(format!(
            "non-finite {name} for s={s}, k={k}, r={r}, sigma={sigma}, t={t}"
        )));
    }
    Ok(greeks)
}

/// Greeks of `contract` at `spot` and `rate`, valued on `valuation_date`.
///
/// Validates the contract first; errors name the contract symbol.
pub fn contract_greeks(
    contract: &OptionContract,
    spot: f64,
    rate: f64,
    valuation_date: NaiveDate,
) -> RiskResult<Greeks> {
    contract.validate()?;
    let t = contract.time_to_expiry_years(valuation_date);
    black_scholes_greeks(
        contract.option_type,
        spot,
        contract.strike,
        rate,
        contract.implied_volatility,
        t,
    )
    .map_err(|e| e.with_symbol(&contract.symbol))
}

impl OptionContract {
    /// Greeks at the contract's own quoted underlying price and rate.
    pub fn greeks(&self, valuation_date: NaiveDate) -> RiskResult<Greeks> {
        contract_greeks(
            self,
            self.underlying_price,
            self.risk_free_rate,
            valuation_date,
        )
    }
}

/// Risk-neutral probability of finishing in the money: `Φ(d2)` for calls, `Φ(-d2)` for puts.
pub fn probability_in_the_money(
    option_type: OptionType,
    s: f64,
    k: f64,
    r: f64,
    sigma: f64,
    t: f64,
) -> RiskResult<f64> {
    validate_kernel_inputs(s, k, r, sigma, t)?;
    let (_, d2) = d1_d2(s, k, r, sigma, t);
    Ok(match option_type {
        OptionType::Call => normal_cdf(d2),
        OptionType::Put => normal_cdf(-d2),
    })
}
