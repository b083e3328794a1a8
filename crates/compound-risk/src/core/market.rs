//! Market reference table validation.
//!
//! [`validate_market`] reports every broken invariant in one error so a caller
//! can decide between rejecting the table and [`clamped`]-and-warn.

use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::{MarketViolation, RiskError};
use crate::types::{Asset, MarketTable};

/// Collect every invariant violation of a single asset.
pub fn asset_violations(asset: &Asset) -> Vec<MarketViolation> {
    let mut violations = Vec::new();
    let mut push = |field: &'static str, value: Decimal, reason: &'static str| {
        violations.push(MarketViolation {
            symbol: asset.symbol.clone(),
            field,
            value,
            reason,
        });
    };

    if asset.price <= Decimal::ZERO {
        push("price", asset.price, "must be > 0");
    }
    if asset.collateral_factor < Decimal::ZERO || asset.collateral_factor > Decimal::ONE {
        push(
            "collateral_factor",
            asset.collateral_factor,
            "must be in [0, 1]",
        );
    }
    if asset.supply_apy < Decimal::ZERO {
        push("supply_apy", asset.supply_apy, "must be >= 0");
    }
    if asset.borrow_apy < Decimal::ZERO {
        push("borrow_apy", asset.borrow_apy, "must be >= 0");
    }
    if asset.exchange_rate <= Decimal::ZERO {
        push("exchange_rate", asset.exchange_rate, "must be > 0");
    }

    violations
}

/// Validate every entry of `market`, failing with the full violation list.
pub fn validate_market(market: &MarketTable) -> Result<(), RiskError> {
    let violations: Vec<MarketViolation> = market.iter().flat_map(asset_violations).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(RiskError::MarketDataInvalid { violations })
    }
}

/// Copy of `market` with collateral factors clamped to [0, 1] and negative
/// APYs raised to zero. Each adjustment is logged.
///
/// Prices are left alone: there is no sensible clamp for a non-positive
/// price, so such a table still fails [`validate_market`].
pub fn clamped(market: &MarketTable) -> MarketTable {
    market.map_assets(|asset| {
        let mut out = asset.clone();

        let cf = asset.collateral_factor.clamp(Decimal::ZERO, Decimal::ONE);
        if cf != asset.collateral_factor {
            warn!(
                symbol = %asset.symbol,
                from = %asset.collateral_factor,
                to = %cf,
                "clamping collateral factor"
            );
            out.collateral_factor = cf;
        }
        if asset.supply_apy < Decimal::ZERO {
            warn!(symbol = %asset.symbol, from = %asset.supply_apy, "raising negative supply APY to 0");
            out.supply_apy = Decimal::ZERO;
        }
        if asset.borrow_apy < Decimal::ZERO {
            warn!(symbol = %asset.symbol, from = %asset.borrow_apy, "raising negative borrow APY to 0");
            out.borrow_apy = Decimal::ZERO;
        }

        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_market(&MarketTable::defaults()).is_ok());
    }

    #[test]
    fn test_collateral_factor_above_one() {
        let table = MarketTable::from_assets([Asset::new(
            "ETH",
            dec!(3000),
            dec!(1.2),
            dec!(0.3),
            dec!(1.2),
        )]);
        let Err(RiskError::MarketDataInvalid { violations }) = validate_market(&table) else {
            panic!("expected MarketDataInvalid");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].symbol, "ETH");
        assert_eq!(violations[0].field, "collateral_factor");
        assert_eq!(violations[0].value, dec!(1.2));
    }

    #[test]
    fn test_collects_all_violations() {
        let table = MarketTable::from_assets([
            Asset::new("BAD", dec!(0), dec!(-0.1), dec!(-1), dec!(-2)),
            Asset::new("DAI", dec!(1), dec!(0.75), dec!(2.53), dec!(3.82)),
            Asset::new("NEG", dec!(-5), dec!(0.5), dec!(1), dec!(1)),
        ]);
        let Err(RiskError::MarketDataInvalid { violations }) = validate_market(&table) else {
            panic!("expected MarketDataInvalid");
        };
        let fields: Vec<(&str, &str)> = violations
            .iter()
            .map(|v| (v.symbol.as_str(), v.field))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("BAD", "price"),
                ("BAD", "collateral_factor"),
                ("BAD", "supply_apy"),
                ("BAD", "borrow_apy"),
                ("NEG", "price"),
            ]
        );
    }

    #[test]
    fn test_exchange_rate_must_be_positive() {
        let table = MarketTable::from_assets([Asset::new("DAI", dec!(1), dec!(0.75), dec!(1), dec!(2))
            .with_c_token("cDAI", Decimal::ZERO)]);
        let Err(RiskError::MarketDataInvalid { violations }) = validate_market(&table) else {
            panic!("expected MarketDataInvalid");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "exchange_rate");
    }

    #[test]
    fn test_boundaries_are_valid() {
        let table = MarketTable::from_assets([
            Asset::new("ZERO_CF", dec!(1), dec!(0), dec!(0), dec!(0)),
            Asset::new("FULL_CF", dec!(1), dec!(1), dec!(0), dec!(0)),
        ]);
        assert!(validate_market(&table).is_ok());
    }

    #[test]
    fn test_clamped_repairs_factor_and_apys() {
        let table = MarketTable::from_assets([
            Asset::new("ETH", dec!(3000), dec!(1.2), dec!(-0.5), dec!(1)),
            Asset::new("DAI", dec!(1), dec!(-0.3), dec!(2), dec!(-3)),
        ]);
        let fixed = clamped(&table);
        assert!(validate_market(&fixed).is_ok());
        assert_eq!(fixed.get("ETH").unwrap().collateral_factor, dec!(1));
        assert_eq!(fixed.get("ETH").unwrap().supply_apy, Decimal::ZERO);
        assert_eq!(fixed.get("DAI").unwrap().collateral_factor, Decimal::ZERO);
        assert_eq!(fixed.get("DAI").unwrap().borrow_apy, Decimal::ZERO);
        // Input table untouched.
        assert_eq!(table.get("ETH").unwrap().collateral_factor, dec!(1.2));
    }

    #[test]
    fn test_clamped_keeps_bad_price() {
        let table = MarketTable::from_assets([Asset::new("X", dec!(0), dec!(0.5), dec!(1), dec!(1))]);
        assert!(validate_market(&clamped(&table)).is_err());
    }
}
