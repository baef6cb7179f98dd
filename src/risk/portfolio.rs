//! Portfolio-level Greeks and joint Monte Carlo risk.
//!
//! Module `risk::portfolio` aggregates positions that share one [`ValuationContext`]:
//! - portfolio Greeks are the size-weighted sum of per-contract Greeks,
//! - joint POP/VaR is simulated per underlying with one shared terminal spot per draw, all legs'
//!   sized payoffs summed before statistics are taken. Per-contract VaRs are never summed.
//!
//! Every entry gets its own [`ContractReport`]. A contract that fails validation, pricing or
//! simulation, or that the market-data boundary could not supply, carries its error there and is
//! left out of the aggregates; the other entries proceed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{
    Greeks, OptionContract, RiskConfig, RiskError, RiskResult, ValuationContext,
};
use crate::greeks::contract_greeks;
use crate::math::rng::fresh_seed;
use crate::mc::{MonteCarloRiskEngine, RiskSimulationResult};
use crate::pricing::payoff::{Leg, Strategy};

/// Signed holding of one contract (+long, -short).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub contract: OptionContract,
    pub position_size: f64,
}

impl Position {
    pub fn new(contract: OptionContract, position_size: f64) -> Self {
        Self {
            contract,
            position_size,
        }
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.contract.validate()?;
        if !self.position_size.is_finite() {
            return Err(RiskError::invalid_for(
                &self.contract.symbol,
                "position size must be finite",
            ));
        }
        Ok(())
    }

    fn leg(&self) -> Leg {
        Leg::from_contract(&self.contract, self.position_size)
    }
}

/// One slot of a portfolio: a position, or the market-data boundary's report that a contract
/// could not be supplied.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortfolioEntry {
    Position(Position),
    Unavailable { symbol: String, reason: String },
}

impl PortfolioEntry {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Position(position) => &position.contract.symbol,
            Self::Unavailable { symbol, .. } => symbol,
        }
    }
}

/// Ordered entries valued under one shared context.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Portfolio {
    pub context: ValuationContext,
    entries: Vec<PortfolioEntry>,
}

impl Portfolio {
    pub fn new(context: ValuationContext) -> Self {
        Self {
            context,
            entries: Vec::new(),
        }
    }

    /// Portfolio valued on `valuation_date` at the configured risk-free rate.
    pub fn from_config(valuation_date: NaiveDate, config: &RiskConfig) -> Self {
        Self::new(ValuationContext::new(valuation_date).with_risk_free_rate(config.risk_free_rate))
    }

    pub fn add_position(&mut self, contract: OptionContract, position_size: f64) {
        self.entries
            .push(PortfolioEntry::Position(Position::new(contract, position_size)));
    }

    pub fn add_unavailable(&mut self, symbol: impl Into<String>, reason: impl Into<String>) {
        self.entries.push(PortfolioEntry::Unavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        });
    }

    pub fn with_position(mut self, contract: OptionContract, position_size: f64) -> Self {
        self.add_position(contract, position_size);
        self
    }

    pub fn entries(&self) -> &[PortfolioEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prices and simulates every entry, then aggregates the ones that succeeded.
    ///
    /// All simulations of one call share a seed: the configured one, or a fresh one reported in
    /// every [`RiskSimulationResult`].
    ///
    /// Only the simulation settings of `config` are read here. Greeks use the context's rate
    /// override, else each contract's own rate; `config.risk_free_rate` applies only through
    /// [`Portfolio::from_config`], which sets it as the context override.
    ///
    /// # Errors
    /// - [`RiskError::InvalidInput`] when `config` or the context is invalid.
    /// - [`RiskError::Cancelled`] when the engine's cancellation hook fires.
    ///
    /// Per-contract input errors never fail the call.
    ///
    /// # Examples
    /// ```rust
    /// use chrono::NaiveDate;
    /// use optrisk::core::{OptionContract, OptionType, RiskConfig};
    /// use optrisk::risk::portfolio::Portfolio;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    /// let expiry = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    /// let call = OptionContract::new("NIFTY", OptionType::Call, 100.0, expiry, 100.0)
    ///     .with_implied_volatility(0.2)
    ///     .with_premium(2.5);
    ///
    /// let config = RiskConfig::default().with_seed(11);
    /// let report = Portfolio::from_config(today, &config)
    ///     .with_position(call, 2.0)
    ///     .analyze(&config)
    ///     .unwrap();
    /// assert!(report.portfolio_risk.is_some());
    /// assert!((report.greeks.delta - 2.0 * report.contracts[0].greeks.as_ref().unwrap().delta).abs() < 1e-12);
    /// ```
    pub fn analyze(&self, config: &RiskConfig) -> RiskResult<PortfolioReport> {
        config.validate()?;
        self.analyze_with(&MonteCarloRiskEngine::from_config(config))
    }

    /// Same as [`Portfolio::analyze`] with a caller-built engine, e.g. one carrying a
    /// cancellation hook.
    pub fn analyze_with(&self, engine: &MonteCarloRiskEngine) -> RiskResult<PortfolioReport> {
        engine.validate()?;
        self.context.validate()?;

        let engine = engine.clone().with_seed(engine.seed.unwrap_or_else(fresh_seed));

        #[cfg(feature = "parallel")]
        let contracts: Vec<ContractReport> = self
            .entries
            .par_iter()
            .enumerate()
            .map(|(index, entry)| self.evaluate_entry(&engine, index, entry))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let contracts: Vec<ContractReport> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.evaluate_entry(&engine, index, entry))
            .collect();

        if contracts
            .iter()
            .any(|report| report.risk == Err(RiskError::Cancelled))
        {
            return Err(RiskError::Cancelled);
        }

        let greeks: Greeks = contracts
            .iter()
            .filter(|report| report.is_ok())
            .filter_map(|report| {
                let size = report.position_size?;
                report.greeks.as_ref().ok().map(|g| g.scaled(size))
            })
            .sum();

        let mut groups: BTreeMap<&str, Vec<&Position>> = BTreeMap::new();
        for (report, entry) in contracts.iter().zip(&self.entries) {
            if report.is_ok()
                && let PortfolioEntry::Position(position) = entry
            {
                groups
                    .entry(position.contract.symbol.as_str())
                    .or_default()
                    .push(position);
            }
        }

        let mut joint_risk = BTreeMap::new();
        for (symbol, positions) in &groups {
            let risk = self.joint_simulation(&engine, positions)?;
            joint_risk.insert((*symbol).to_string(), risk);
        }

        let portfolio_risk = match joint_risk.len() {
            1 => joint_risk.values().next().copied(),
            0 => None,
            n => {
                tracing::warn!(
                    underlyings = n,
                    "portfolio spans several underlyings; portfolio-level risk needs correlated draws and is not reported"
                );
                None
            }
        };

        tracing::debug!(
            entries = self.entries.len(),
            aggregated = groups.values().map(Vec::len).sum::<usize>(),
            underlyings = joint_risk.len(),
            seed = engine.seed,
            "portfolio analysis finished"
        );

        Ok(PortfolioReport {
            contracts,
            greeks,
            joint_risk,
            portfolio_risk,
        })
    }

    fn evaluate_entry(
        &self,
        engine: &MonteCarloRiskEngine,
        index: usize,
        entry: &PortfolioEntry,
    ) -> ContractReport {
        let position = match entry {
            PortfolioEntry::Position(position) => position,
            PortfolioEntry::Unavailable { symbol, reason } => {
                tracing::warn!(index, %symbol, %reason, "portfolio entry unavailable");
                let err = RiskError::unavailable(symbol.as_str(), reason.as_str());
                return ContractReport {
                    index,
                    symbol: symbol.clone(),
                    position_size: None,
                    greeks: Err(err.clone()),
                    risk: Err(err),
                };
            }
        };

        let symbol = position.contract.symbol.clone();
        let (greeks, risk) = match position.validate() {
            Ok(()) => (
                self.position_greeks(position),
                self.position_risk(engine, position),
            ),
            Err(err) => (Err(err.clone()), Err(err)),
        };

        if let Err(err) = greeks.as_ref().and(risk.as_ref()) {
            tracing::warn!(index, %symbol, error = %err, "portfolio entry rejected");
        }

        ContractReport {
            index,
            symbol,
            position_size: Some(position.position_size),
            greeks,
            risk,
        }
    }

    fn position_greeks(&self, position: &Position) -> RiskResult<Greeks> {
        let overridden;
        let contract = match self.context.volatility {
            Some(vol) => {
                overridden = position.contract.clone().with_implied_volatility(vol);
                &overridden
            }
            None => &position.contract,
        };
        contract_greeks(
            contract,
            self.context.spot_for(contract),
            self.context.rate_for(contract),
            self.context.valuation_date,
        )
    }

    fn position_risk(
        &self,
        engine: &MonteCarloRiskEngine,
        position: &Position,
    ) -> RiskResult<RiskSimulationResult> {
        let contract = &position.contract;
        let sigma = self.context.volatility.unwrap_or(contract.implied_volatility);
        engine
            .run(&position.leg(), self.context.spot_for(contract), sigma)
            .map_err(|e| e.with_symbol(&contract.symbol))
    }

    /// One shared-draw simulation over all positions of one underlying.
    fn joint_simulation(
        &self,
        engine: &MonteCarloRiskEngine,
        positions: &[&Position],
    ) -> RiskResult<RiskSimulationResult> {
        let Some(first) = positions.first() else {
            return Err(RiskError::invalid("underlying group has no positions"));
        };
        let s0 = self.context.spot.unwrap_or(first.contract.underlying_price);
        let sigma = self
            .context
            .volatility
            .unwrap_or_else(|| group_volatility(positions));
        let strategy: Strategy = positions.iter().map(|p| p.leg()).collect();

        engine
            .run(&strategy, s0, sigma)
            .map_err(|e| e.with_symbol(&first.contract.symbol))
    }
}

/// `|size|`-weighted mean implied volatility; the plain mean when every size is zero.
fn group_volatility(positions: &[&Position]) -> f64 {
    let weight: f64 = positions.iter().map(|p| p.position_size.abs()).sum();
    if weight > 0.0 {
        positions
            .iter()
            .map(|p| p.position_size.abs() * p.contract.implied_volatility)
            .sum::<f64>()
            / weight
    } else {
        positions
            .iter()
            .map(|p| p.contract.implied_volatility)
            .sum::<f64>()
            / positions.len() as f64
    }
}

/// Per-entry outcome.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContractReport {
    /// Position of the entry in the portfolio.
    pub index: usize,
    pub symbol: String,
    /// `None` for entries the market-data boundary could not supply.
    pub position_size: Option<f64>,
    /// Greeks of one unit of the contract.
    pub greeks: RiskResult<Greeks>,
    /// Stand-alone simulation of the sized position.
    pub risk: RiskResult<RiskSimulationResult>,
}

impl ContractReport {
    /// Whether the entry contributes to the portfolio aggregates.
    pub fn is_ok(&self) -> bool {
        self.greeks.is_ok() && self.risk.is_ok()
    }
}

/// Result of [`Portfolio::analyze`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PortfolioReport {
    pub contracts: Vec<ContractReport>,
    /// Size-weighted sum of the Greeks of every successful entry.
    pub greeks: Greeks,
    /// Shared-draw simulation per underlying symbol.
    pub joint_risk: BTreeMap<String, RiskSimulationResult>,
    /// Joint simulation of the whole portfolio; only set when a single underlying is held.
    pub portfolio_risk: Option<RiskSimulationResult>,
}

impl PortfolioReport {
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Reports of the entries left out of the aggregates.
    pub fn failures(&self) -> impl Iterator<Item = &ContractReport> {
        self.contracts.iter().filter(|report| !report.is_ok())
    }
}
