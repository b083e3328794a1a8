//! Linear interest accrual estimator.
//!
//! Projects interest earned on supplied assets and paid on borrowed assets
//! over a number of days, holding today's prices and APYs constant. There is
//! no compounding: this is the simple-interest approximation shown to users,
//! not a replay of per-block accrual.
//!
//! The APY-weighted USD value of each side is summed first and divided by
//! `100 × 365` once, so a zero duration yields exactly zero and doubling the
//! duration doubles the result up to the last decimal digit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::constants::PERCENT_DAYS_PER_YEAR;
use crate::errors::RiskError;
use crate::types::numeric::{checked_add, checked_div, checked_mul, ensure_non_negative};
use crate::types::{Asset, InterestEstimate, MarketTable, PositionSnapshot};

use super::risk::priced_asset;

/// Interest on `value_usd` at `apy` percent over `days`, without compounding.
pub fn accrue_linear(value_usd: Decimal, apy: Decimal, days: Decimal) -> Result<Decimal, RiskError> {
    let weighted = checked_mul("interest", value_usd, apy)?;
    period_share(weighted, days)
}

fn period_share(apy_weighted_usd: Decimal, days: Decimal) -> Result<Decimal, RiskError> {
    let scaled = checked_mul("interest", apy_weighted_usd, days)?;
    checked_div("interest", scaled, PERCENT_DAYS_PER_YEAR)
}

/// Σ amount × price × apy over one side of a position.
fn apy_weighted_value(
    holdings: &BTreeMap<String, Decimal>,
    market: &MarketTable,
    side: &str,
    apy_field: &str,
    apy_of: impl Fn(&Asset) -> Decimal,
) -> Result<Decimal, RiskError> {
    let mut total = Decimal::ZERO;
    for (symbol, amount) in holdings {
        let field = format!("{side}.{symbol}");
        let amount = ensure_non_negative(&field, *amount)?;
        let asset = priced_asset(market, symbol)?;
        let apy = ensure_non_negative(&format!("{symbol}.{apy_field}"), apy_of(asset))?;
        let value = checked_mul(&field, amount, asset.price)?;
        total = checked_add(&field, total, checked_mul(&field, value, apy)?)?;
    }
    Ok(total)
}

/// Estimate simple interest earned and paid by `snapshot` over `duration_days`.
///
/// Zero days yields exactly zero. Doubling the duration doubles both figures
/// exactly when the quotient terminates, and otherwise to the last
/// representable digit (28 significant digits).
pub fn estimate_interest(
    snapshot: &PositionSnapshot,
    market: &MarketTable,
    duration_days: Decimal,
) -> Result<InterestEstimate, RiskError> {
    let days = ensure_non_negative("duration_days", duration_days)?;

    let earned_base =
        apy_weighted_value(&snapshot.supplied, market, "supplied", "supply_apy", |a| a.supply_apy)?;
    let paid_base =
        apy_weighted_value(&snapshot.borrowed, market, "borrowed", "borrow_apy", |a| a.borrow_apy)?;

    let interest_earned = period_share(earned_base, days)?;
    let interest_paid = period_share(paid_base, days)?;

    Ok(InterestEstimate {
        interest_earned,
        interest_paid,
        net_interest: interest_earned - interest_paid,
    })
}
