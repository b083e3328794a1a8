//! Market stress testing.
//!
//! Derives a shocked copy of the market table for a named scenario and
//! compares the position's risk before and after. Interest over the stress
//! window is projected on the shocked table.
//!
//! With `f = intensity_percent / 100`:
//!
//! | Scenario          | price     | supply APY   | borrow APY   |
//! |-------------------|-----------|--------------|--------------|
//! | `Crash`           | × (1 − f) | × (1 − f/2)  | × (1 + f)    |
//! | `Spike`           | × (1 + f) | unchanged    | unchanged    |
//! | `Volatility`      | unchanged | unchanged    | unchanged    |
//! | `LiquidityCrisis` | unchanged | × (1 + 2f)   | × (1 + 3f)   |
//!
//! Price shocks skip pegged assets. A shock applied uniformly to every price
//! would scale collateral and debt alike and leave the health factor as it was.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::MAX_STRESS_INTENSITY_PERCENT;
use crate::errors::RiskError;
use crate::types::numeric::{checked_mul, ensure_non_negative};
use crate::types::{
    Asset, InterestEstimate, MarketTable, PositionSnapshot, RiskMetrics, TierThresholds,
};

use super::interest::estimate_interest;
use super::risk::evaluate_risk_with;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressScenario {
    /// Sudden drop in all asset prices.
    Crash,
    /// Sudden rise in all asset prices.
    Spike,
    /// Reported as a scenario but leaves the table as it is.
    Volatility,
    /// Prices flat, both rates jump as liquidity dries up.
    LiquidityCrisis,
}

impl StressScenario {
    pub fn all() -> [Self; 4] {
        [
            Self::Crash,
            Self::Spike,
            Self::Volatility,
            Self::LiquidityCrisis,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crash => "Market Crash",
            Self::Spike => "Market Spike",
            Self::Volatility => "High Volatility",
            Self::LiquidityCrisis => "Liquidity Crisis",
        }
    }

    /// (price, supply APY, borrow APY) multipliers at fraction `f`.
    fn multipliers(&self, f: Decimal) -> (Decimal, Decimal, Decimal) {
        let one = Decimal::ONE;
        match self {
            Self::Crash => (one - f, one - f / dec!(2), one + f),
            Self::Spike => (one + f, one, one),
            Self::Volatility => (one, one, one),
            Self::LiquidityCrisis => (one, one + f * dec!(2), one + f * dec!(3)),
        }
    }
}

/// Parameters of one stress run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressParams {
    pub scenario: StressScenario,
    /// Shock size in percent, 0–100.
    #[serde(with = "rust_decimal::serde::str")]
    pub intensity_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub duration_days: Decimal,
}

/// Before/after comparison produced by [`run_stress_test`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    pub scenario: StressScenario,
    #[serde(with = "rust_decimal::serde::str")]
    pub intensity_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub duration_days: Decimal,
    pub markets_after: MarketTable,
    pub before: RiskMetrics,
    pub after: RiskMetrics,
    /// Projected on the shocked table.
    pub interest: InterestEstimate,
    pub liquidation_risk: bool,
}

fn check_intensity(intensity_percent: Decimal) -> Result<Decimal, RiskError> {
    let intensity = ensure_non_negative("intensity_percent", intensity_percent)?;
    if intensity > MAX_STRESS_INTENSITY_PERCENT {
        return Err(RiskError::invalid(
            "intensity_percent",
            format!("{intensity} exceeds {MAX_STRESS_INTENSITY_PERCENT}"),
        ));
    }
    Ok(intensity)
}

/// Shocked copy of `market` under `scenario`.
pub fn stress_market(
    market: &MarketTable,
    scenario: StressScenario,
    intensity_percent: Decimal,
) -> Result<MarketTable, RiskError> {
    let f = check_intensity(intensity_percent)? / dec!(100);
    let (price_m, supply_m, borrow_m) = scenario.multipliers(f);

    let mut shocked = MarketTable::new();
    for asset in market.iter() {
        let field = |name: &str| format!("{}.{name}", asset.symbol);
        let price = if asset.pegged {
            asset.price
        } else {
            checked_mul(&field("price"), asset.price, price_m)?
        };
        shocked.insert(Asset {
            price,
            supply_apy: checked_mul(&field("supply_apy"), asset.supply_apy, supply_m)?,
            borrow_apy: checked_mul(&field("borrow_apy"), asset.borrow_apy, borrow_m)?,
            ..asset.clone()
        });
    }
    Ok(shocked)
}

/// Evaluate `snapshot` before and after a stress scenario.
pub fn run_stress_test(
    snapshot: &PositionSnapshot,
    market: &MarketTable,
    params: &StressParams,
    thresholds: &TierThresholds,
) -> Result<StressReport, RiskError> {
    let markets_after = stress_market(market, params.scenario, params.intensity_percent)?;
    let before = evaluate_risk_with(snapshot, market, thresholds)?;
    let after = evaluate_risk_with(snapshot, &markets_after, thresholds)?;
    let interest = estimate_interest(snapshot, &markets_after, params.duration_days)?;

    info!(
        scenario = params.scenario.name(),
        intensity = %params.intensity_percent,
        hf_before = %before.health_factor,
        hf_after = %after.health_factor,
        liquidation_risk = after.at_risk,
        "stress test complete"
    );

    Ok(StressReport {
        scenario: params.scenario,
        intensity_percent: params.intensity_percent,
        duration_days: params.duration_days,
        liquidation_risk: after.at_risk,
        markets_after,
        before,
        after,
        interest,
    })
}
