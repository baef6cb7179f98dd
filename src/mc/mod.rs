//! Monte Carlo estimation of probability of profit and Value-at-Risk at a horizon.
//!
//! Terminal spot follows a zero-drift lognormal step over `h` calendar days:
//! `S_T = S0 * exp(-σ²τ/2 + σ√τ Z)` with `τ = h / 365` and `Z ~ N(0, 1)`.
//!
//! Every draw evaluates one [`Payoff`] on one terminal spot, so a multi-leg [`Strategy`] sees
//! the same `S_T` on all legs of a draw. Draws come from seeded blocks (see
//! [`crate::math::rng`]); results are bit-identical for identical inputs and seed, with or
//! without the `parallel` feature.
//!
//! [`Strategy`]: crate::pricing::payoff::Strategy

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand_distr::{Distribution, StandardNormal};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{DAYS_PER_YEAR, OptionContract, RiskConfig, RiskError, RiskResult};
use crate::math::normal_cdf;
use crate::math::rng::{fresh_seed, stream_rng};
use crate::pricing::payoff::{Leg, Payoff};
use crate::risk::var::{PayoffStats, payoff_stats, validate_confidence};

/// Draws per seeded block; also the granularity at which cancellation is polled.
const BLOCK_SIZE: usize = 1_024;

/// Cooperative cancellation polled between blocks of draws.
pub trait CancellationHook: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// Hook that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl CancellationHook for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancellationHook for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Wall-clock deadline. A deadline beyond what `Instant` can represent never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }
}

impl CancellationHook for Deadline {
    fn is_cancelled(&self) -> bool {
        self.0.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskSimulationResult {
    /// Share of draws with strictly positive payoff.
    pub probability_of_profit: f64,
    /// `(1 - confidence_level)` quantile of the payoff distribution; negative is a loss.
    pub value_at_risk: f64,
    /// Mean payoff of the draws at or below `value_at_risk`.
    pub expected_shortfall: f64,
    pub expected_payoff: f64,
    pub num_simulations: usize,
    pub confidence_level: f64,
    /// Seed that reproduces this run.
    pub seed: u64,
}

impl RiskSimulationResult {
    fn from_stats(stats: PayoffStats, num_simulations: usize, confidence_level: f64, seed: u64) -> Self {
        Self {
            probability_of_profit: stats.probability_of_profit,
            value_at_risk: stats.value_at_risk,
            expected_shortfall: stats.expected_shortfall,
            expected_payoff: stats.expected_payoff,
            num_simulations,
            confidence_level,
            seed,
        }
    }
}

/// Terminal spot for one standard normal draw `z`.
#[inline]
pub fn terminal_spot(s0: f64, sigma: f64, horizon_years: f64, z: f64) -> f64 {
    let drift = -0.5 * sigma * sigma * horizon_years;
    let diffusion = sigma * horizon_years.sqrt();
    s0 * diffusion.mul_add(z, drift).exp()
}

/// Closed-form `P(S_T > threshold)` under the simulator's zero-drift lognormal model.
///
/// With a long option's strike plus premium as threshold this is the exact probability of
/// profit the simulation estimates.
pub fn lognormal_probability_above(
    s0: f64,
    threshold: f64,
    sigma: f64,
    horizon_days: u32,
) -> RiskResult<f64> {
    validate_spot_and_vol(s0, sigma)?;
    if threshold <= 0.0 {
        return Ok(1.0);
    }
    if sigma == 0.0 {
        return Ok(if s0 > threshold { 1.0 } else { 0.0 });
    }
    let tau = f64::from(horizon_days) / DAYS_PER_YEAR;
    let vt = sigma * tau.sqrt();
    Ok(normal_cdf(((s0 / threshold).ln() - 0.5 * sigma * sigma * tau) / vt))
}

fn validate_spot_and_vol(s0: f64, sigma: f64) -> RiskResult<()> {
    if !s0.is_finite() || s0 <= 0.0 {
        return Err(RiskError::invalid("initial spot must be finite and > 0"));
    }
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(RiskError::invalid("volatility must be finite and >= 0"));
    }
    Ok(())
}

/// Seeded terminal-spot simulator producing [`RiskSimulationResult`]s.
///
/// # Examples
/// ```rust
/// use optrisk::mc::MonteCarloRiskEngine;
/// use optrisk::pricing::payoff::Straddle;
///
/// let engine = MonteCarloRiskEngine::new(10_000, 30, 0.95).with_seed(7);
/// let straddle = Straddle::new(100.0, 3.0, 3.0);
/// let a = engine.run(&straddle, 100.0, 0.25).unwrap();
/// let b = engine.run(&straddle, 100.0, 0.25).unwrap();
/// assert_eq!(a, b);
/// assert!(a.value_at_risk >= straddle.max_loss());
/// ```
#[derive(Clone)]
pub struct MonteCarloRiskEngine {
    pub num_simulations: usize,
    pub horizon_days: u32,
    pub confidence_level: f64,
    /// Fixed seed; a fresh one is drawn per run (and reported) when `None`.
    pub seed: Option<u64>,
    cancellation: Option<Arc<dyn CancellationHook>>,
}

impl std::fmt::Debug for MonteCarloRiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonteCarloRiskEngine")
            .field("num_simulations", &self.num_simulations)
            .field("horizon_days", &self.horizon_days)
            .field("confidence_level", &self.confidence_level)
            .field("seed", &self.seed)
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

impl MonteCarloRiskEngine {
    pub fn new(num_simulations: usize, horizon_days: u32, confidence_level: f64) -> Self {
        Self {
            num_simulations,
            horizon_days,
            confidence_level,
            seed: None,
            cancellation: None,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            num_simulations: config.num_simulations,
            horizon_days: config.horizon_days,
            confidence_level: config.confidence_level,
            seed: config.random_seed,
            cancellation: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cancellation(mut self, hook: Arc<dyn CancellationHook>) -> Self {
        self.cancellation = Some(hook);
        self
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.num_simulations == 0 {
            return Err(RiskError::invalid("num_simulations must be > 0"));
        }
        if self.horizon_days == 0 {
            return Err(RiskError::invalid("horizon_days must be > 0"));
        }
        validate_confidence(self.confidence_level)
    }

    #[inline]
    pub fn horizon_years(&self) -> f64 {
        f64::from(self.horizon_days) / DAYS_PER_YEAR
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|hook| hook.is_cancelled())
    }

    fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(fresh_seed)
    }

    /// Draws `num_simulations` terminal spots with the configured (or a fresh) seed.
    pub fn simulate_terminal_spots(&self, s0: f64, sigma: f64) -> RiskResult<Vec<f64>> {
        self.validate()?;
        validate_spot_and_vol(s0, sigma)?;
        self.sample(self.resolve_seed(), s0, sigma, |s_t| s_t)
    }

    /// Simulates `payoff` from spot `s0` with volatility `sigma`.
    ///
    /// `sigma == 0` is handled without drawing: the terminal spot is `s0`, POP is exactly 0 or
    /// 1 and VaR, ES and expected payoff all equal the single deterministic payoff.
    ///
    /// # Errors
    /// - [`RiskError::InvalidInput`] for invalid engine settings, spot or volatility.
    /// - [`RiskError::Cancelled`] when the cancellation hook fires; no partial result is kept.
    pub fn run<P>(&self, payoff: &P, s0: f64, sigma: f64) -> RiskResult<RiskSimulationResult>
    where
        P: Payoff + Sync + ?Sized,
    {
        self.validate()?;
        validate_spot_and_vol(s0, sigma)?;
        if self.is_cancelled() {
            return Err(RiskError::Cancelled);
        }

        let seed = self.resolve_seed();

        if sigma == 0.0 {
            let value = payoff.payoff(s0);
            tracing::debug!(s0, value, "zero volatility, deterministic terminal spot");
            let stats = PayoffStats {
                probability_of_profit: if value > 0.0 { 1.0 } else { 0.0 },
                value_at_risk: value,
                expected_shortfall: value,
                expected_payoff: value,
            };
            return Ok(RiskSimulationResult::from_stats(
                stats,
                self.num_simulations,
                self.confidence_level,
                seed,
            ));
        }

        tracing::debug!(
            num_simulations = self.num_simulations,
            horizon_days = self.horizon_days,
            seed,
            s0,
            sigma,
            "running Monte Carlo risk simulation"
        );

        let mut payoffs = self.sample(seed, s0, sigma, |s_t| payoff.payoff(s_t))?;
        let stats = payoff_stats(&mut payoffs, self.confidence_level)?;

        tracing::debug!(
            seed,
            pop = stats.probability_of_profit,
            var = stats.value_at_risk,
            "Monte Carlo risk simulation finished"
        );

        Ok(RiskSimulationResult::from_stats(
            stats,
            self.num_simulations,
            self.confidence_level,
            seed,
        ))
    }

    /// Simulates `position_size` units of `contract` from its quoted spot and implied volatility.
    pub fn run_contract(
        &self,
        contract: &OptionContract,
        position_size: f64,
    ) -> RiskResult<RiskSimulationResult> {
        contract.validate()?;
        let leg = Leg::from_contract(contract, position_size);
        leg.validate().map_err(|e| e.with_symbol(&contract.symbol))?;
        self.run(&leg, contract.underlying_price, contract.implied_volatility)
            .map_err(|e| e.with_symbol(&contract.symbol))
    }

    /// Fills one output slot per draw with `f(S_T)`, block by block.
    fn sample<F>(&self, seed: u64, s0: f64, sigma: f64, f: F) -> RiskResult<Vec<f64>>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        let tau = self.horizon_years();
        let mut out = vec![0.0_f64; self.num_simulations];

        let fill_block = |(block, slots): (usize, &mut [f64])| -> RiskResult<()> {
            if self.is_cancelled() {
                return Err(RiskError::Cancelled);
            }
            let mut rng = stream_rng(seed, block);
            for slot in slots.iter_mut() {
                let z: f64 = StandardNormal.sample(&mut rng);
                *slot = f(terminal_spot(s0, sigma, tau, z));
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        out.par_chunks_mut(BLOCK_SIZE)
            .enumerate()
            .try_for_each(fill_block)?;
        #[cfg(not(feature = "parallel"))]
        out.chunks_mut(BLOCK_SIZE)
            .enumerate()
            .try_for_each(fill_block)?;

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use crate::pricing::payoff::Straddle;
    use approx::assert_relative_eq;

    fn engine(n: usize) -> MonteCarloRiskEngine {
        MonteCarloRiskEngine::new(n, 30, 0.95).with_seed(42)
    }

    #[test]
    fn identical_seed_is_bit_identical() {
        let leg = Leg::long(OptionType::Call, 105.0, 2.5);
        let a = engine(5_000).run(&leg, 100.0, 0.3).unwrap();
        let b = engine(5_000).run(&leg, 100.0, 0.3).unwrap();
        assert_eq!(a.probability_of_profit.to_bits(), b.probability_of_profit.to_bits());
        assert_eq!(a.value_at_risk.to_bits(), b.value_at_risk.to_bits());
        assert_eq!(a.expected_payoff.to_bits(), b.expected_payoff.to_bits());
        assert_eq!(a.seed, 42);
        assert_eq!(a.num_simulations, 5_000);
    }

    #[test]
    fn different_seeds_differ() {
        let leg = Leg::long(OptionType::Put, 100.0, 2.0);
        let a = engine(2_000).run(&leg, 100.0, 0.3).unwrap();
        let b = engine(2_000).with_seed(43).run(&leg, 100.0, 0.3).unwrap();
        assert_ne!(a.expected_payoff, b.expected_payoff);
    }

    #[test]
    fn unseeded_run_reports_replayable_seed() {
        let leg = Leg::long(OptionType::Call, 100.0, 1.0);
        let unseeded = MonteCarloRiskEngine::new(3_000, 30, 0.95);
        let first = unseeded.run(&leg, 100.0, 0.2).unwrap();
        let replay = unseeded.clone().with_seed(first.seed).run(&leg, 100.0, 0.2).unwrap();
        assert_eq!(first, replay);
    }

    #[test]
    fn terminal_spots_are_martingale_with_lognormal_dispersion() {
        let sigma = 0.25;
        let spots = engine(200_000).simulate_terminal_spots(100.0, sigma).unwrap();
        assert_eq!(spots.len(), 200_000);
        assert!(spots.iter().all(|s| *s > 0.0));

        let mean = spots.iter().sum::<f64>() / spots.len() as f64;
        // E[S_T] = S0 under zero drift; stderr ~ 100 * 0.25 * sqrt(30/365) / sqrt(2e5) = 0.016
        assert_relative_eq!(mean, 100.0, epsilon = 0.1);

        let log_sd = {
            let logs: Vec<f64> = spots.iter().map(|s| (s / 100.0).ln()).collect();
            let m = logs.iter().sum::<f64>() / logs.len() as f64;
            (logs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (logs.len() as f64 - 1.0)).sqrt()
        };
        assert_relative_eq!(log_sd, sigma * (30.0_f64 / 365.0).sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn zero_volatility_is_deterministic_step() {
        let itm_call = Leg::long(OptionType::Call, 90.0, 4.0);
        let result = engine(1_000).run(&itm_call, 100.0, 0.0).unwrap();
        assert_eq!(result.probability_of_profit, 1.0);
        assert_eq!(result.value_at_risk, 6.0);
        assert_eq!(result.expected_payoff, 6.0);
        assert_eq!(result.expected_shortfall, 6.0);
        assert_eq!(result.num_simulations, 1_000);

        let otm_call = Leg::long(OptionType::Call, 110.0, 4.0);
        let result = engine(1_000).run(&otm_call, 100.0, 0.0).unwrap();
        assert_eq!(result.probability_of_profit, 0.0);
        assert_eq!(result.value_at_risk, -4.0);
    }

    #[test]
    fn var_of_straddle_is_bounded_by_max_loss() {
        let straddle = Straddle::new(100.0, 4.0, 4.0);
        let result = engine(10_000).run(&straddle, 100.0, 0.3).unwrap();
        assert!(result.value_at_risk >= straddle.max_loss());
        assert!(result.expected_shortfall >= straddle.max_loss());
        assert!(result.expected_shortfall <= result.value_at_risk);
        assert!(result.probability_of_profit > 0.0 && result.probability_of_profit < 1.0);
    }

    #[test]
    fn pop_tracks_closed_form_probability() {
        let (s0, k, premium, sigma) = (100.0, 100.0, 2.0, 0.3);
        let call = Leg::long(OptionType::Call, k, premium);
        let result = engine(50_000).run(&call, s0, sigma).unwrap();
        let exact = lognormal_probability_above(s0, k + premium, sigma, 30).unwrap();
        // binomial stderr ~ 0.0022
        assert!((result.probability_of_profit - exact).abs() < 0.012);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let leg = Leg::long(OptionType::Call, 100.0, 1.0);
        assert!(MonteCarloRiskEngine::new(0, 30, 0.95).run(&leg, 100.0, 0.2).is_err());
        assert!(MonteCarloRiskEngine::new(10, 0, 0.95).run(&leg, 100.0, 0.2).is_err());
        assert!(MonteCarloRiskEngine::new(10, 30, 1.5).run(&leg, 100.0, 0.2).is_err());
        assert!(engine(10).run(&leg, -1.0, 0.2).is_err());
        assert!(engine(10).run(&leg, 100.0, -0.2).is_err());
        assert!(engine(10).run(&leg, 100.0, f64::NAN).is_err());
    }

    #[test]
    fn raised_flag_cancels_without_partial_result() {
        let flag = Arc::new(AtomicBool::new(true));
        let leg = Leg::long(OptionType::Call, 100.0, 1.0);
        let result = engine(100_000)
            .with_cancellation(flag.clone())
            .run(&leg, 100.0, 0.2);
        assert_eq!(result, Err(RiskError::Cancelled));

        flag.store(false, Ordering::Relaxed);
        let result = engine(10_000).with_cancellation(flag).run(&leg, 100.0, 0.2);
        assert!(result.is_ok());
    }

    #[test]
    fn expired_deadline_cancels() {
        let past = Deadline::at(Instant::now());
        let leg = Leg::long(OptionType::Put, 100.0, 1.0);
        let result = engine(10_000)
            .with_cancellation(Arc::new(past))
            .run(&leg, 100.0, 0.2);
        assert_eq!(result, Err(RiskError::Cancelled));

        let generous = Deadline::after(Duration::from_secs(3_600));
        assert!(engine(10_000).with_cancellation(Arc::new(generous)).run(&leg, 100.0, 0.2).is_ok());
    }

    #[test]
    fn unrepresentable_deadline_never_fires() {
        let unbounded = Deadline::after(Duration::MAX);
        assert!(!unbounded.is_cancelled());
        let leg = Leg::long(OptionType::Call, 100.0, 1.0);
        let result = engine(5_000)
            .with_cancellation(Arc::new(unbounded))
            .run(&leg, 100.0, 0.2);
        assert_eq!(result, engine(5_000).run(&leg, 100.0, 0.2));
    }

    #[test]
    fn run_contract_scales_by_position_and_names_bad_contracts() {
        let expiry = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let contract = OptionContract::new("NIFTY", OptionType::Call, 100.0, expiry, 100.0)
            .with_implied_volatility(0.2)
            .with_premium(3.0);
        let one = engine(4_000).run_contract(&contract, 1.0).unwrap();
        let two = engine(4_000).run_contract(&contract, 2.0).unwrap();
        assert_relative_eq!(two.expected_payoff, 2.0 * one.expected_payoff, epsilon = 1e-9);
        assert_eq!(two.probability_of_profit, one.probability_of_profit);

        let bad = contract.clone().with_premium(-1.0);
        let err = engine(10).run_contract(&bad, 1.0).unwrap_err();
        assert_eq!(err.symbol(), Some("NIFTY"));
    }
}
