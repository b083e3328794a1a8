//! Position risk evaluator.
//!
//! Values a position snapshot against a market table and derives the health
//! factor, liquidation flag, borrow-limit usage and health tier. Everything
//! here is a pure function over borrowed inputs.
//!
//! Rules:
//! - every referenced symbol must exist in the market table
//! - amounts, prices and collateral factors must be non-negative, and
//!   collateral factors at most 1; out-of-range input is rejected, never
//!   clamped or skipped
//! - a health factor of exactly 1.0 is not at risk

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub use crate::constants::LIQUIDATION_THRESHOLD;
use crate::errors::RiskError;
use crate::types::numeric::{checked_add, checked_div, checked_mul, ensure_non_negative};
use crate::types::{
    Asset, HealthFactor, HealthTier, MarketTable, PositionSnapshot, RiskMetrics, TierThresholds,
};

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// USD totals of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Valuation {
    pub supplied: Decimal,
    pub adjusted_collateral: Decimal,
    pub borrowed: Decimal,
}

/// Look up `symbol` and check the price and collateral factor the evaluator
/// depends on.
pub(crate) fn priced_asset<'a>(
    market: &'a MarketTable,
    symbol: &str,
) -> Result<&'a Asset, RiskError> {
    let asset = market.require(symbol)?;
    ensure_non_negative(&format!("{symbol}.price"), asset.price)?;
    let cf = ensure_non_negative(
        &format!("{symbol}.collateral_factor"),
        asset.collateral_factor,
    )?;
    if cf > Decimal::ONE {
        return Err(RiskError::invalid(
            format!("{symbol}.collateral_factor"),
            format!("{cf} exceeds 1"),
        ));
    }
    Ok(asset)
}

pub(crate) fn value_position(
    snapshot: &PositionSnapshot,
    market: &MarketTable,
) -> Result<Valuation, RiskError> {
    let mut supplied = Decimal::ZERO;
    let mut adjusted_collateral = Decimal::ZERO;
    for (symbol, amount) in &snapshot.supplied {
        let field = format!("supplied.{symbol}");
        let amount = ensure_non_negative(&field, *amount)?;
        let asset = priced_asset(market, symbol)?;
        let value = checked_mul(&field, amount, asset.price)?;
        supplied = checked_add(&field, supplied, value)?;
        let weighted = checked_mul(&field, value, asset.collateral_factor)?;
        adjusted_collateral = checked_add(&field, adjusted_collateral, weighted)?;
    }

    let mut borrowed = Decimal::ZERO;
    for (symbol, amount) in &snapshot.borrowed {
        let field = format!("borrowed.{symbol}");
        let amount = ensure_non_negative(&field, *amount)?;
        let asset = priced_asset(market, symbol)?;
        let value = checked_mul(&field, amount, asset.price)?;
        borrowed = checked_add(&field, borrowed, value)?;
    }

    Ok(Valuation {
        supplied,
        adjusted_collateral,
        borrowed,
    })
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// HF = adjusted collateral / borrowed, or `NoDebt` when nothing is borrowed.
pub fn compute_health_factor(
    adjusted_collateral_usd: Decimal,
    borrowed_usd: Decimal,
) -> Result<HealthFactor, RiskError> {
    if borrowed_usd <= Decimal::ZERO {
        return Ok(HealthFactor::NoDebt);
    }
    checked_div("health_factor", adjusted_collateral_usd, borrowed_usd).map(HealthFactor::Ratio)
}

/// Classify a health factor into a warning tier.
pub fn classify_health(hf: HealthFactor, thresholds: &TierThresholds) -> HealthTier {
    let Some(r) = hf.ratio() else {
        return HealthTier::Safe;
    };
    if r > thresholds.safe {
        HealthTier::Safe
    } else if r >= thresholds.watch {
        HealthTier::Watch
    } else if r >= thresholds.warning {
        HealthTier::Warning
    } else {
        HealthTier::Critical
    }
}

fn borrow_limit_used_percent(valuation: &Valuation) -> Result<Option<Decimal>, RiskError> {
    if valuation.borrowed <= Decimal::ZERO {
        return Ok(Some(Decimal::ZERO));
    }
    if valuation.adjusted_collateral <= Decimal::ZERO {
        return Ok(None);
    }
    let scaled = checked_mul("borrow_limit_used", valuation.borrowed, dec!(100))?;
    checked_div("borrow_limit_used", scaled, valuation.adjusted_collateral).map(Some)
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluate a position with the default tier thresholds.
pub fn evaluate_risk(
    snapshot: &PositionSnapshot,
    market: &MarketTable,
) -> Result<RiskMetrics, RiskError> {
    evaluate_risk_with(snapshot, market, &TierThresholds::default())
}

/// Evaluate a position, classifying its health against `thresholds`.
pub fn evaluate_risk_with(
    snapshot: &PositionSnapshot,
    market: &MarketTable,
    thresholds: &TierThresholds,
) -> Result<RiskMetrics, RiskError> {
    let valuation = value_position(snapshot, market)?;
    let health_factor =
        compute_health_factor(valuation.adjusted_collateral, valuation.borrowed)?;
    let at_risk =
        valuation.borrowed > Decimal::ZERO && health_factor.is_below(LIQUIDATION_THRESHOLD);

    Ok(RiskMetrics {
        total_supplied_value: valuation.supplied,
        adjusted_collateral_value: valuation.adjusted_collateral,
        total_borrowed_value: valuation.borrowed,
        health_factor,
        at_risk,
        available_to_borrow: (valuation.adjusted_collateral - valuation.borrowed)
            .max(Decimal::ZERO),
        borrow_limit_used_percent: borrow_limit_used_percent(&valuation)?,
        tier: classify_health(health_factor, thresholds),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn market(eth_price: Decimal) -> MarketTable {
        MarketTable::from_assets([
            Asset::new("ETH", eth_price, dec!(0.75), dec!(0.32), dec!(1.25)),
            Asset::new("USDC", dec!(1), dec!(0.80), dec!(2.12), dec!(3.45)),
        ])
    }

    fn eth_vs_usdc(eth: Decimal, usdc_debt: Decimal) -> PositionSnapshot {
        PositionSnapshot::new()
            .with_supplied("ETH", eth)
            .with_borrowed("USDC", usdc_debt)
    }

    // -----------------------------------------------------------------------
    // Reference scenarios
    // -----------------------------------------------------------------------

    #[test]
    fn test_eth_collateral_healthy() {
        let m = evaluate_risk(&eth_vs_usdc(dec!(10), dec!(20000)), &market(dec!(3000))).unwrap();
        assert_eq!(m.adjusted_collateral_value, dec!(22500));
        assert_eq!(m.total_borrowed_value, dec!(20000));
        assert_eq!(m.health_factor, HealthFactor::Ratio(dec!(1.125)));
        assert!(!m.at_risk);
        assert_eq!(m.available_to_borrow, dec!(2500));
        assert_eq!(m.tier, HealthTier::Critical);
    }

    #[test]
    fn test_eth_price_drop_puts_position_at_risk() {
        let m = evaluate_risk(&eth_vs_usdc(dec!(10), dec!(20000)), &market(dec!(2500))).unwrap();
        assert_eq!(m.adjusted_collateral_value, dec!(18750));
        assert_eq!(m.health_factor, HealthFactor::Ratio(dec!(0.9375)));
        assert!(m.at_risk);
        assert_eq!(m.available_to_borrow, Decimal::ZERO);
    }

    #[test]
    fn test_supply_only_is_no_debt() {
        let pos = PositionSnapshot::new().with_supplied("ETH", dec!(10));
        let m = evaluate_risk(&pos, &market(dec!(3000))).unwrap();
        assert_eq!(m.health_factor, HealthFactor::NoDebt);
        assert!(!m.at_risk);
        assert_eq!(m.tier, HealthTier::Safe);
        assert_eq!(m.borrow_limit_used_percent, Some(Decimal::ZERO));
    }

    #[test]
    fn test_missing_borrowed_symbol() {
        let pos = PositionSnapshot::new()
            .with_supplied("ETH", dec!(10))
            .with_borrowed("XYZ", dec!(1));
        let err = evaluate_risk(&pos, &market(dec!(3000))).unwrap_err();
        assert!(matches!(err, RiskError::MissingMarketData { ref symbol } if symbol == "XYZ"));
    }

    #[test]
    fn test_missing_supplied_symbol_even_with_zero_amount() {
        let pos = PositionSnapshot::new().with_supplied("XYZ", Decimal::ZERO);
        let err = evaluate_risk(&pos, &market(dec!(3000))).unwrap_err();
        assert!(matches!(err, RiskError::MissingMarketData { ref symbol } if symbol == "XYZ"));
    }

    // -----------------------------------------------------------------------
    // Boundaries and invalid input
    // -----------------------------------------------------------------------

    #[test]
    fn test_exactly_one_is_not_at_risk() {
        // 10 ETH * 2000 * 0.75 = 15000 = debt
        let m = evaluate_risk(&eth_vs_usdc(dec!(10), dec!(15000)), &market(dec!(2000))).unwrap();
        assert_eq!(m.health_factor, HealthFactor::Ratio(dec!(1)));
        assert!(!m.at_risk);
        assert_eq!(m.borrow_limit_used_percent, Some(dec!(100)));
    }

    #[test]
    fn test_zero_borrowed_entries_are_no_debt() {
        let pos = eth_vs_usdc(dec!(1), Decimal::ZERO);
        let m = evaluate_risk(&pos, &market(dec!(3000))).unwrap();
        assert!(m.health_factor.is_no_debt());
        assert!(!m.at_risk);
    }

    #[test]
    fn test_debt_without_collateral() {
        let pos = PositionSnapshot::new().with_borrowed("USDC", dec!(100));
        let m = evaluate_risk(&pos, &market(dec!(3000))).unwrap();
        assert_eq!(m.health_factor, HealthFactor::Ratio(Decimal::ZERO));
        assert!(m.at_risk);
        assert_eq!(m.borrow_limit_used_percent, None);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let pos = eth_vs_usdc(dec!(-1), dec!(10));
        let err = evaluate_risk(&pos, &market(dec!(3000))).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "supplied.ETH"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let pos = eth_vs_usdc(dec!(1), dec!(10));
        let err = evaluate_risk(&pos, &market(dec!(-3000))).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "ETH.price"));
    }

    #[test]
    fn test_collateral_factor_above_one_rejected() {
        let table = MarketTable::from_assets([Asset::new(
            "ETH",
            dec!(3000),
            dec!(1.2),
            dec!(0),
            dec!(0),
        )]);
        let pos = PositionSnapshot::new().with_supplied("ETH", dec!(1));
        let err = evaluate_risk(&pos, &table).unwrap_err();
        assert!(
            matches!(err, RiskError::InvalidInput { ref field, .. } if field == "ETH.collateral_factor")
        );
    }

    #[test]
    fn test_inputs_not_mutated() {
        let pos = eth_vs_usdc(dec!(10), dec!(20000));
        let table = market(dec!(3000));
        let (pos_before, table_before) = (pos.clone(), table.clone());
        let first = evaluate_risk(&pos, &table).unwrap();
        let second = evaluate_risk(&pos, &table).unwrap();
        assert_eq!(first, second);
        assert_eq!(pos, pos_before);
        assert_eq!(table, table_before);
    }

    // -----------------------------------------------------------------------
    // classify_health boundaries
    // -----------------------------------------------------------------------

    #[test]
    fn test_tier_boundaries() {
        let t = TierThresholds::default();
        let tier = |r: Decimal| classify_health(HealthFactor::Ratio(r), &t);
        assert_eq!(tier(dec!(2.001)), HealthTier::Safe);
        assert_eq!(tier(dec!(2.0)), HealthTier::Watch);
        assert_eq!(tier(dec!(1.5)), HealthTier::Watch);
        assert_eq!(tier(dec!(1.499)), HealthTier::Warning);
        assert_eq!(tier(dec!(1.3)), HealthTier::Warning);
        assert_eq!(tier(dec!(1.299)), HealthTier::Critical);
        assert_eq!(tier(dec!(0.5)), HealthTier::Critical);
        assert_eq!(classify_health(HealthFactor::NoDebt, &t), HealthTier::Safe);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = TierThresholds {
            safe: dec!(3),
            watch: dec!(2),
            warning: dec!(1.1),
        };
        let m = evaluate_risk_with(&eth_vs_usdc(dec!(10), dec!(10000)), &market(dec!(3000)), &t)
            .unwrap();
        // 22500 / 10000 = 2.25
        assert_eq!(m.tier, HealthTier::Watch);
    }

    // -----------------------------------------------------------------------
    // Property-based tests
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn no_debt_never_at_risk(
            eth in 0u64..1_000_000u64,
            usdc in 0u64..1_000_000u64,
        ) {
            let pos = PositionSnapshot::new()
                .with_supplied("ETH", Decimal::from(eth))
                .with_supplied("USDC", Decimal::from(usdc));
            let m = evaluate_risk(&pos, &market(dec!(3000))).unwrap();
            prop_assert_eq!(m.health_factor, HealthFactor::NoDebt);
            prop_assert!(!m.at_risk);
        }

        #[test]
        fn higher_collateral_price_never_lowers_health(
            eth_units in 1u64..10_000u64,
            debt in 1u64..10_000_000u64,
            price in 1u64..100_000u64,
            bump in 0u64..100_000u64,
        ) {
            let pos = eth_vs_usdc(Decimal::from(eth_units), Decimal::from(debt));
            let low = evaluate_risk(&pos, &market(Decimal::from(price))).unwrap();
            let high = evaluate_risk(&pos, &market(Decimal::from(price + bump))).unwrap();
            prop_assert!(high.adjusted_collateral_value >= low.adjusted_collateral_value);
            prop_assert!(high.health_factor.ratio().unwrap() >= low.health_factor.ratio().unwrap());
        }

        #[test]
        fn more_debt_never_raises_health(
            eth_units in 1u64..10_000u64,
            debt in 1u64..10_000_000u64,
            extra in 0u64..10_000_000u64,
        ) {
            let table = market(dec!(3000));
            let base = evaluate_risk(&eth_vs_usdc(Decimal::from(eth_units), Decimal::from(debt)), &table).unwrap();
            let more = evaluate_risk(&eth_vs_usdc(Decimal::from(eth_units), Decimal::from(debt + extra)), &table).unwrap();
            prop_assert!(more.health_factor.ratio().unwrap() <= base.health_factor.ratio().unwrap());
        }
    }
}
