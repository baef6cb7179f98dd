//! Module `pricing::payoff`.
//!
//! Net payoff at expiry for single options, multi-leg strategies and straddles, plus lazy
//! payoff curves over a spot grid.
//!
//! Conventions: payoff is intrinsic value minus premium, per unit, times the signed leg
//! quantity (+buy, -sell). A short leg therefore collects its premium and pays intrinsic value.
//!
//! Everything here is a pure function of strikes, premiums and terminal spot; the Monte Carlo
//! simulator evaluates the same [`Payoff`] implementations per draw.

use crate::core::{OptionContract, RiskError, RiskResult};
use crate::pricing::OptionType;

/// Net payoff as a function of terminal spot.
pub trait Payoff {
    fn payoff(&self, spot_t: f64) -> f64;
}

/// Net payoff of one long option: `max(0, ±(S_T - K)) - premium`.
///
/// # Examples
/// ```rust
/// use optrisk::core::OptionType;
/// use optrisk::pricing::payoff::option_payoff;
///
/// assert_eq!(option_payoff(OptionType::Call, 100.0, 5.0, 112.0), 7.0);
/// assert_eq!(option_payoff(OptionType::Put, 100.0, 5.0, 112.0), -5.0);
/// ```
#[inline]
pub fn option_payoff(option_type: OptionType, strike: f64, premium: f64, spot_t: f64) -> f64 {
    option_type.intrinsic(spot_t, strike) - premium
}

/// Net payoff of a long straddle: one call and one put at `strike`.
#[inline]
pub fn straddle_payoff(strike: f64, call_premium: f64, put_premium: f64, spot_t: f64) -> f64 {
    option_payoff(OptionType::Call, strike, call_premium, spot_t)
        + option_payoff(OptionType::Put, strike, put_premium, spot_t)
}

/// One option leg of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Leg {
    pub option_type: OptionType,
    pub strike: f64,
    pub premium: f64,
    /// Signed number of contracts (+buy, -sell).
    pub quantity: f64,
}

impl Leg {
    /// One long contract.
    pub fn long(option_type: OptionType, strike: f64, premium: f64) -> Self {
        Self {
            option_type,
            strike,
            premium,
            quantity: 1.0,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Leg holding `quantity` units of `contract` at its quoted premium.
    pub fn from_contract(contract: &OptionContract, quantity: f64) -> Self {
        Self {
            option_type: contract.option_type,
            strike: contract.strike,
            premium: contract.premium,
            quantity,
        }
    }

    pub fn validate(&self) -> RiskResult<()> {
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(RiskError::invalid("leg strike must be finite and > 0"));
        }
        if !self.premium.is_finite() || self.premium < 0.0 {
            return Err(RiskError::invalid("leg premium must be finite and >= 0"));
        }
        if !self.quantity.is_finite() {
            return Err(RiskError::invalid("leg quantity must be finite"));
        }
        Ok(())
    }
}

impl Payoff for Leg {
    #[inline]
    fn payoff(&self, spot_t: f64) -> f64 {
        self.quantity * option_payoff(self.option_type, self.strike, self.premium, spot_t)
    }
}

impl Payoff for OptionContract {
    #[inline]
    fn payoff(&self, spot_t: f64) -> f64 {
        option_payoff(self.option_type, self.strike, self.premium, spot_t)
    }
}

/// Ordered set of legs on one underlying, valued on a shared terminal spot.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Strategy {
    legs: Vec<Leg>,
}

impl Strategy {
    pub fn new(legs: Vec<Leg>) -> Self {
        Self { legs }
    }

    pub fn push(&mut self, leg: Leg) {
        self.legs.push(leg);
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.legs.iter().try_for_each(Leg::validate)
    }

    /// Net premium paid across legs (negative for a net credit).
    pub fn net_premium(&self) -> f64 {
        self.legs.iter().map(|leg| leg.quantity * leg.premium).sum()
    }
}

impl Payoff for Strategy {
    #[inline]
    fn payoff(&self, spot_t: f64) -> f64 {
        self.legs.iter().map(|leg| leg.payoff(spot_t)).sum()
    }
}

impl FromIterator<Leg> for Strategy {
    fn from_iter<I: IntoIterator<Item = Leg>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Long straddle: one call and one put with the same strike and expiry.
///
/// # Examples
/// ```rust
/// use optrisk::pricing::payoff::{Payoff, Straddle};
///
/// let straddle = Straddle::new(100.0, 10.0, 10.0);
/// assert_eq!(straddle.payoff(100.0), -20.0);
/// assert_eq!(straddle.breakevens(), (80.0, 120.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Straddle {
    pub strike: f64,
    pub call_premium: f64,
    pub put_premium: f64,
}

impl Straddle {
    pub fn new(strike: f64, call_premium: f64, put_premium: f64) -> Self {
        Self {
            strike,
            call_premium,
            put_premium,
        }
    }

    /// Pairs a call and a put quote into a straddle.
    ///
    /// # Errors
    /// [`RiskError::InvalidInput`] unless the contracts are one call and one put on the same
    /// underlying with the same strike and expiry.
    pub fn from_contracts(call: &OptionContract, put: &OptionContract) -> RiskResult<Self> {
        if call.option_type != OptionType::Call || put.option_type != OptionType::Put {
            return Err(RiskError::invalid_for(
                &call.symbol,
                "straddle needs one call and one put",
            ));
        }
        if call.symbol != put.symbol || call.strike != put.strike || call.expiry != put.expiry {
            return Err(RiskError::invalid_for(
                &call.symbol,
                "straddle legs must share underlying, strike and expiry",
            ));
        }
        call.validate()?;
        put.validate()?;
        Ok(Self::new(call.strike, call.premium, put.premium))
    }

    /// Premium paid for both legs.
    pub fn total_premium(&self) -> f64 {
        self.call_premium + self.put_premium
    }

    /// Terminal spots at which the position breaks even, `(K - premium, K + premium)`.
    pub fn breakevens(&self) -> (f64, f64) {
        let premium = self.total_premium();
        (self.strike - premium, self.strike + premium)
    }

    /// Worst outcome, reached at `S_T = K` where both legs expire worthless.
    pub fn max_loss(&self) -> f64 {
        -self.total_premium()
    }

    pub fn to_strategy(&self) -> Strategy {
        Strategy::new(vec![
            Leg::long(OptionType::Call, self.strike, self.call_premium),
            Leg::long(OptionType::Put, self.strike, self.put_premium),
        ])
    }
}

impl Payoff for Straddle {
    #[inline]
    fn payoff(&self, spot_t: f64) -> f64 {
        straddle_payoff(self.strike, self.call_premium, self.put_premium, spot_t)
    }
}

impl From<Straddle> for Strategy {
    fn from(straddle: Straddle) -> Self {
        straddle.to_strategy()
    }
}

/// Inclusive, evenly spaced spot axis `start, start + step, ..., <= end`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpotGrid {
    start: f64,
    step: f64,
    len: usize,
}

impl SpotGrid {
    /// # Errors
    /// [`RiskError::InvalidInput`] when a bound is not finite, `step <= 0`, `end < start`, or
    /// the point count does not fit in `usize`.
    pub fn new(start: f64, end: f64, step: f64) -> RiskResult<Self> {
        if !start.is_finite() || !end.is_finite() || !step.is_finite() {
            return Err(RiskError::invalid("spot grid bounds must be finite"));
        }
        if step <= 0.0 {
            return Err(RiskError::invalid("spot grid step must be > 0"));
        }
        if end < start {
            return Err(RiskError::invalid("spot grid end must be >= start"));
        }
        // tolerance keeps `end` on the grid when (end - start) / step is integral
        let intervals = ((end - start) / step + 1.0e-9).floor();
        let len = (intervals < usize::MAX as f64)
            .then(|| (intervals as usize).checked_add(1))
            .flatten()
            .ok_or_else(|| RiskError::invalid("spot grid has too many points"))?;
        Ok(Self { start, step, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Point `i`, computed as `start + i * step` so no rounding accumulates.
    #[inline]
    pub fn point(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + Clone + '_ {
        (0..self.len).map(move |i| self.point(i))
    }
}

/// Payoff profile of `P` over a [`SpotGrid`], evaluated lazily on every iteration.
#[derive(Debug, Clone, Copy)]
pub struct PayoffCurve<'a, P: ?Sized> {
    grid: SpotGrid,
    payoff: &'a P,
}

impl<'a, P: Payoff + ?Sized> PayoffCurve<'a, P> {
    pub fn new(grid: SpotGrid, payoff: &'a P) -> Self {
        Self { grid, payoff }
    }

    pub fn grid(&self) -> &SpotGrid {
        &self.grid
    }

    /// Fresh iterator of `(spot, payoff)` pairs; the curve can be walked any number of times.
    pub fn iter(&self) -> PayoffCurveIter<'a, P> {
        PayoffCurveIter {
            grid: self.grid,
            payoff: self.payoff,
            next: 0,
        }
    }
}

impl<'a, P: Payoff + ?Sized> IntoIterator for &PayoffCurve<'a, P> {
    type Item = (f64, f64);
    type IntoIter = PayoffCurveIter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct PayoffCurveIter<'a, P: ?Sized> {
    grid: SpotGrid,
    payoff: &'a P,
    next: usize,
}

impl<P: Payoff + ?Sized> Iterator for PayoffCurveIter<'_, P> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.grid.len() {
            return None;
        }
        let spot = self.grid.point(self.next);
        self.next += 1;
        Some((spot, self.payoff.payoff(spot)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<P: Payoff + ?Sized> ExactSizeIterator for PayoffCurveIter<'_, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn curve_of<P: Payoff>(payoff: &P, spots: &[f64]) -> Vec<f64> {
        spots.iter().map(|&s| payoff.payoff(s)).collect()
    }

    #[test]
    fn test_long_call() {
        let call = Leg::long(OptionType::Call, 100.0, 5.0);
        let pnl = curve_of(&call, &[90.0, 100.0, 110.0, 120.0]);
        assert!((pnl[0] - (-5.0)).abs() < 1e-12); // OTM: 0 - 5
        assert!((pnl[1] - (-5.0)).abs() < 1e-12); // ATM: 0 - 5
        assert!((pnl[2] - 5.0).abs() < 1e-12); // ITM: 10 - 5
        assert!((pnl[3] - 15.0).abs() < 1e-12); // deep ITM: 20 - 5
    }

    #[test]
    fn test_long_put() {
        let put = Leg::long(OptionType::Put, 100.0, 5.0);
        let pnl = curve_of(&put, &[80.0, 90.0, 100.0, 110.0]);
        assert!((pnl[0] - 15.0).abs() < 1e-12); // deep ITM: 20 - 5
        assert!((pnl[1] - 5.0).abs() < 1e-12); // ITM: 10 - 5
        assert!((pnl[2] - (-5.0)).abs() < 1e-12); // ATM: 0 - 5
        assert!((pnl[3] - (-5.0)).abs() < 1e-12); // OTM: 0 - 5
    }

    #[test]
    fn test_bull_call_spread() {
        // Buy 100 call for 4, sell 110 call for 1
        let spread: Strategy = [
            Leg::long(OptionType::Call, 100.0, 4.0),
            Leg::long(OptionType::Call, 110.0, 1.0).with_quantity(-1.0),
        ]
        .into_iter()
        .collect();
        assert!((spread.net_premium() - 3.0).abs() < 1e-12);

        let pnl = curve_of(&spread, &[90.0, 100.0, 105.0, 110.0, 120.0]);
        assert!((pnl[0] - (-3.0)).abs() < 1e-12); // both OTM
        assert!((pnl[1] - (-3.0)).abs() < 1e-12); // both ATM/OTM
        assert!((pnl[2] - 2.0).abs() < 1e-12); // long ITM: 5 - 3
        assert!((pnl[3] - 7.0).abs() < 1e-12); // max: 10 - 3
        assert!((pnl[4] - 7.0).abs() < 1e-12); // capped: 10 - 3
    }

    #[test]
    fn straddle_curve_bottoms_at_strike() {
        let straddle = Straddle::new(100.0, 10.0, 10.0);
        let grid = SpotGrid::new(80.0, 120.0, 1.0).unwrap();
        let curve = PayoffCurve::new(grid, &straddle);

        let points: Vec<(f64, f64)> = curve.iter().collect();
        assert_eq!(points.len(), 41);
        assert_eq!(points[0], (80.0, 0.0));
        assert_eq!(points[20], (100.0, -20.0));
        assert_eq!(points[40], (120.0, 0.0));
        let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        assert_eq!(min, straddle.max_loss());

        // restartable
        let again: Vec<(f64, f64)> = (&curve).into_iter().collect();
        assert_eq!(points, again);
    }

    #[test]
    fn straddle_strategy_matches_closed_form() {
        let straddle = Straddle::new(100.0, 6.0, 4.0);
        let strategy = Strategy::from(straddle);
        for s in [60.0, 95.0, 100.0, 104.5, 150.0] {
            assert_eq!(strategy.payoff(s), straddle.payoff(s));
        }
        assert_eq!(straddle.total_premium(), 10.0);
        assert_eq!(straddle.breakevens(), (90.0, 110.0));
    }

    #[test]
    fn straddle_from_contracts_requires_matching_legs() {
        let expiry = NaiveDate::from_ymd_opt(2020, 5, 28).unwrap();
        let call = OptionContract::new("BANKNIFTY", OptionType::Call, 300.0, expiry, 301.0)
            .with_premium(12.0);
        let put = OptionContract::new("BANKNIFTY", OptionType::Put, 300.0, expiry, 301.0)
            .with_premium(9.5);

        let straddle = Straddle::from_contracts(&call, &put).unwrap();
        assert_eq!(straddle.total_premium(), 21.5);

        assert!(Straddle::from_contracts(&put, &call).is_err());
        let mut other_strike = put.clone();
        other_strike.strike = 310.0;
        assert!(Straddle::from_contracts(&call, &other_strike).is_err());
    }

    #[test]
    fn spot_grid_validation_and_endpoints() {
        assert!(SpotGrid::new(80.0, 120.0, 0.0).is_err());
        assert!(SpotGrid::new(120.0, 80.0, 1.0).is_err());
        assert!(SpotGrid::new(f64::NAN, 80.0, 1.0).is_err());

        let single = SpotGrid::new(100.0, 100.0, 5.0).unwrap();
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![100.0]);

        let fine = SpotGrid::new(0.1, 0.3, 0.1).unwrap();
        assert_eq!(fine.len(), 3);

        let partial = SpotGrid::new(0.0, 10.0, 3.0).unwrap();
        assert_eq!(partial.iter().collect::<Vec<_>>(), vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn oversized_spot_grid_is_rejected() {
        assert!(matches!(
            SpotGrid::new(0.0, 1.0e20, 1.0e-10),
            Err(RiskError::InvalidInput { .. })
        ));
        // (end - start) / step overflows to infinity
        assert!(SpotGrid::new(-f64::MAX, f64::MAX, 1.0e-300).is_err());

        let wide = SpotGrid::new(0.0, 1.0e6, 1.0).unwrap();
        assert_eq!(wide.len(), 1_000_001);
    }

    #[test]
    fn short_leg_collects_premium() {
        let short_put = Leg::long(OptionType::Put, 100.0, 3.0).with_quantity(-2.0);
        assert_eq!(short_put.payoff(120.0), 6.0);
        assert_eq!(short_put.payoff(90.0), -14.0);
    }
}
