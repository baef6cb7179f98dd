//! Module `pricing::european`.
//!
//! Closed-form Black-Scholes value of a European option with zero dividend yield, sharing
//! input validation and `d1`/`d2` with [`crate::greeks`].
//!
//! Used to put a theoretical value next to a quoted premium and to cross-check the analytic
//! Greeks by bump-and-reprice.
use crate::core::{OptionContract, RiskResult};
use crate::greeks::{d1_d2, validate_kernel_inputs};
use crate::math::normal_cdf;
use crate::pricing::OptionType;

/// Black-Scholes-Merton spot-option price with zero dividend yield.
///
/// Parameters:
/// - `option_type`: call or put payoff direction.
/// - `s`: current spot price.
/// - `k`: strike price.
/// - `r`: continuously compounded risk-free rate (decimal).
/// - `sigma`: annualized volatility (decimal).
/// - `t`: time to expiry in years.
///
/// # Errors
/// Same validation as [`crate::greeks::black_scholes_greeks`]: `sigma <= 0`, `s <= 0`,
/// `k <= 0` or `t <= 0` are rejected rather than collapsed to intrinsic value.
///
/// # Examples
/// ```rust
/// use optrisk::core::OptionType;
/// use optrisk::pricing::european::black_scholes_price;
///
/// let call = black_scholes_price(OptionType::Call, 100.0, 100.0, 0.05, 0.20, 1.0).unwrap();
/// let put = black_scholes_price(OptionType::Put, 100.0, 100.0, 0.05, 0.20, 1.0).unwrap();
/// assert!(call > put);
/// ```
pub fn black_scholes_price(
    option_type: OptionType,
    s: f64,
    k: f64,
    r: f64,
    sigma: f64,
    t: f64,
) -> RiskResult<f64> {
    validate_kernel_inputs(s, k, r, sigma, t)?;

    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    let df = (-r * t).exp();

    Ok(match option_type {
        OptionType::Call => s * normal_cdf(d1) - k * df * normal_cdf(d2),
        OptionType::Put => k * df * normal_cdf(-d2) - s * normal_cdf(-d1),
    })
}

impl OptionContract {
    /// Theoretical value at the quoted underlying price, rate and implied volatility.
    pub fn theoretical_value(&self, valuation_date: chrono::NaiveDate) -> RiskResult<f64> {
        self.validate()?;
        black_scholes_price(
            self.option_type,
            self.underlying_price,
            self.strike,
            self.risk_free_rate,
            self.implied_volatility,
            self.time_to_expiry_years(valuation_date),
        )
        .map_err(|e| e.with_symbol(&self.symbol))
    }
}
