use chrono::NaiveDate;

use crate::core::error::{RiskError, RiskResult};

/// Floor applied to time to expiry (in years) so that `sigma * sqrt(T)` never vanishes.
pub const MIN_TIME_TO_EXPIRY: f64 = 1.0e-6;

/// Day basis of the Act/365 Fixed year fraction used for expiries and horizons.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Risk-free rate assumed when a contract record does not carry one.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.01;

/// Plain-vanilla option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    /// Call option payoff profile.
    Call,
    /// Put option payoff profile.
    Put,
}

impl OptionType {
    /// Returns +1.0 for calls and -1.0 for puts.
    pub fn sign(self) -> f64 {
        match self {
            Self::Call => 1.0,
            Self::Put => -1.0,
        }
    }

    /// Intrinsic value at `spot` for strike `strike`.
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => f.write_str("call"),
            Self::Put => f.write_str("put"),
        }
    }
}

/// Accepts exchange codes (`CE`/`PE`) as well as `call`/`put`/`C`/`P`, case-insensitive.
impl std::str::FromStr for OptionType {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" | "C" | "CE" => Ok(Self::Call),
            "PUT" | "P" | "PE" => Ok(Self::Put),
            other => Err(RiskError::invalid(format!("unknown option type `{other}`"))),
        }
    }
}

/// Act/365 Fixed year fraction between two dates; negative when `end` precedes `start`.
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Largest accepted `|rate|`; anything above is almost certainly a percentage.
pub const MAX_ABS_RISK_FREE_RATE: f64 = 1.0;

/// Whether `rate` is a finite decimal rate within `[-1, 1]`.
#[inline]
pub fn is_decimal_rate(rate: f64) -> bool {
    rate.is_finite() && rate.abs() <= MAX_ABS_RISK_FREE_RATE
}

fn default_risk_free_rate() -> f64 {
    DEFAULT_RISK_FREE_RATE
}

/// Listed option contract as supplied by the market-data boundary.
///
/// Rates and volatilities are decimals (`0.05` is 5%).
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use optrisk::core::{OptionContract, OptionType};
///
/// let expiry = NaiveDate::from_ymd_opt(2020, 5, 28).unwrap();
/// let contract = OptionContract::new("BANKNIFTY", OptionType::Call, 300.0, expiry, 310.0)
///     .with_implied_volatility(0.25)
///     .with_premium(12.5);
/// assert!(contract.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionContract {
    /// Underlying symbol.
    pub symbol: String,
    /// Strike level.
    pub strike: f64,
    /// Call or put.
    pub option_type: OptionType,
    /// Annualized implied volatility.
    pub implied_volatility: f64,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Underlying spot at quote time.
    pub underlying_price: f64,
    /// Continuously compounded risk-free rate.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Premium paid per contract.
    #[serde(default)]
    pub premium: f64,
    #[serde(default)]
    pub open_interest: Option<u64>,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl OptionContract {
    /// Builds a contract with zero volatility, zero premium and the default rate.
    pub fn new(
        symbol: impl Into<String>,
        option_type: OptionType,
        strike: f64,
        expiry: NaiveDate,
        underlying_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strike,
            option_type,
            implied_volatility: 0.0,
            expiry,
            underlying_price,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            premium: 0.0,
            open_interest: None,
            volume: None,
        }
    }

    pub fn with_implied_volatility(mut self, implied_volatility: f64) -> Self {
        self.implied_volatility = implied_volatility;
        self
    }

    pub fn with_premium(mut self, premium: f64) -> Self {
        self.premium = premium;
        self
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn with_activity(mut self, open_interest: u64, volume: u64) -> Self {
        self.open_interest = Some(open_interest);
        self.volume = Some(volume);
        self
    }

    /// Validates contract fields.
    ///
    /// # Errors
    /// Returns [`RiskError::InvalidInput`] naming the contract when:
    /// - `strike <= 0` or `underlying_price <= 0`
    /// - `implied_volatility < 0` or `premium < 0`
    /// - `|risk_free_rate| > 1` (rates are decimals)
    /// - any numeric field is not finite
    pub fn validate(&self) -> RiskResult<()> {
        let fail = |reason: &str| -> RiskResult<()> {
            Err(RiskError::invalid_for(&self.symbol, reason))
        };

        if !self.strike.is_finite() || self.strike <= 0.0 {
            return fail("strike must be finite and > 0");
        }
        if !self.underlying_price.is_finite() || self.underlying_price <= 0.0 {
            return fail("underlying price must be finite and > 0");
        }
        if !self.implied_volatility.is_finite() || self.implied_volatility < 0.0 {
            return fail("implied volatility must be finite and >= 0");
        }
        if !is_decimal_rate(self.risk_free_rate) {
            return fail("risk-free rate must be a decimal in [-1, 1]");
        }
        if !self.premium.is_finite() || self.premium < 0.0 {
            return fail("premium must be finite and >= 0");
        }
        Ok(())
    }

    /// Time to expiry in years from `valuation_date`, floored at [`MIN_TIME_TO_EXPIRY`].
    pub fn time_to_expiry_years(&self, valuation_date: NaiveDate) -> f64 {
        year_fraction(valuation_date, self.expiry).max(MIN_TIME_TO_EXPIRY)
    }
}

/// Valuation inputs shared by every position of a portfolio.
///
/// `None` overrides fall back to the per-contract quote.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValuationContext {
    pub valuation_date: NaiveDate,
    pub spot: Option<f64>,
    pub risk_free_rate: Option<f64>,
    pub volatility: Option<f64>,
}

impl ValuationContext {
    pub fn new(valuation_date: NaiveDate) -> Self {
        Self {
            valuation_date,
            spot: None,
            risk_free_rate: None,
            volatility: None,
        }
    }

    pub fn with_spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = Some(risk_free_rate);
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Rejects non-positive or non-finite overrides and rates outside `[-1, 1]`.
    pub fn validate(&self) -> RiskResult<()> {
        if let Some(spot) = self.spot
            && (!spot.is_finite() || spot <= 0.0)
        {
            return Err(RiskError::invalid("context spot must be finite and > 0"));
        }
        if let Some(rate) = self.risk_free_rate
            && !is_decimal_rate(rate)
        {
            return Err(RiskError::invalid(
                "context risk-free rate must be a decimal in [-1, 1]",
            ));
        }
        if let Some(vol) = self.volatility
            && (!vol.is_finite() || vol < 0.0)
        {
            return Err(RiskError::invalid(
                "context volatility must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Spot used for `contract`.
    pub fn spot_for(&self, contract: &OptionContract) -> f64 {
        self.spot.unwrap_or(contract.underlying_price)
    }

    /// Rate used for `contract`.
    pub fn rate_for(&self, contract: &OptionContract) -> f64 {
        self.risk_free_rate.unwrap_or(contract.risk_free_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn option_type_parses_exchange_codes() {
        assert_eq!("CE".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("pe".parse::<OptionType>().unwrap(), OptionType::Put);
        assert_eq!(" Call ".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("P".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }

    #[test]
    fn time_to_expiry_is_floored_for_expired_contracts() {
        let contract = OptionContract::new("X", OptionType::Call, 100.0, date(2024, 1, 1), 100.0);
        assert_eq!(
            contract.time_to_expiry_years(date(2024, 1, 1)),
            MIN_TIME_TO_EXPIRY
        );
        assert_eq!(
            contract.time_to_expiry_years(date(2024, 3, 1)),
            MIN_TIME_TO_EXPIRY
        );
        let t = contract.time_to_expiry_years(date(2023, 12, 2));
        assert!((t - 30.0 / 365.0).abs() < 1e-15);
    }

    #[test]
    fn validation_names_the_offending_contract() {
        let bad = OptionContract::new("BAD", OptionType::Put, -5.0, date(2024, 1, 1), 100.0);
        let err = bad.validate().unwrap_err();
        assert_eq!(err.symbol(), Some("BAD"));
        assert!(err.to_string().contains("strike"));

        let neg_vol = OptionContract::new("VOL", OptionType::Put, 5.0, date(2024, 1, 1), 100.0)
            .with_implied_volatility(-0.1);
        assert!(neg_vol.validate().is_err());

        let zero_vol = OptionContract::new("OK", OptionType::Put, 5.0, date(2024, 1, 1), 100.0);
        assert!(zero_vol.validate().is_ok());
    }

    #[test]
    fn percentage_rates_are_rejected() {
        let contract = OptionContract::new("PCT", OptionType::Call, 100.0, date(2024, 6, 1), 100.0)
            .with_implied_volatility(0.2);
        assert!(contract.clone().with_risk_free_rate(-0.005).validate().is_ok());
        assert!(contract.clone().with_risk_free_rate(1.0).validate().is_ok());

        let err = contract
            .clone()
            .with_risk_free_rate(5.0)
            .validate()
            .unwrap_err();
        assert_eq!(err.symbol(), Some("PCT"));
        assert!(err.to_string().contains("risk-free rate"));
        assert!(contract.with_risk_free_rate(-1.5).greeks(date(2024, 1, 1)).is_err());

        let ctx = ValuationContext::new(date(2024, 1, 1));
        assert!(ctx.with_risk_free_rate(0.065).validate().is_ok());
        assert!(ctx.with_risk_free_rate(5.0).validate().is_err());
        assert!(ctx.with_risk_free_rate(f64::NAN).validate().is_err());
    }

    #[test]
    fn contract_deserializes_with_default_rate() {
        let json = r#"{
            "symbol": "BANKNIFTY",
            "strike": 300.0,
            "option_type": "call",
            "implied_volatility": 0.3,
            "expiry": "2020-05-28",
            "underlying_price": 305.0,
            "premium": 4.5
        }"#;
        let contract: OptionContract = serde_json::from_str(json).unwrap();
        assert_eq!(contract.risk_free_rate, DEFAULT_RISK_FREE_RATE);
        assert_eq!(contract.option_type, OptionType::Call);
        assert_eq!(contract.open_interest, None);
    }

    #[test]
    fn context_overrides_fall_back_to_contract_quote() {
        let contract = OptionContract::new("X", OptionType::Call, 100.0, date(2024, 6, 1), 101.0)
            .with_risk_free_rate(0.03);
        let ctx = ValuationContext::new(date(2024, 1, 1));
        assert_eq!(ctx.spot_for(&contract), 101.0);
        assert_eq!(ctx.rate_for(&contract), 0.03);

        let ctx = ctx.with_spot(99.0).with_risk_free_rate(0.05);
        assert_eq!(ctx.spot_for(&contract), 99.0);
        assert_eq!(ctx.rate_for(&contract), 0.05);
        assert!(ctx.with_spot(0.0).validate().is_err());
    }
}
