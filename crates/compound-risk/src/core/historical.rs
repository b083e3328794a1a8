//! Historical scenario replay.
//!
//! Replays a single-asset supply or borrow position across a recorded market
//! episode: the USD value moves from the episode's start price to its end
//! price, and interest accrues linearly at the midpoint of the episode's APY
//! range.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use crate::errors::RiskError;
use crate::types::numeric::{checked_add, checked_div, checked_mul, ensure_positive};

use super::interest::accrue_linear;

/// A recorded market episode for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalScenario {
    pub id: &'static str,
    pub name: &'static str,
    pub asset: &'static str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub start_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub end_price: Decimal,
    /// (low, high) annualized percent.
    pub supply_apy_range: (Decimal, Decimal),
    pub borrow_apy_range: (Decimal, Decimal),
}

impl HistoricalScenario {
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Percent change from start to end price.
    pub fn price_change_percent(&self) -> Result<Decimal, RiskError> {
        let diff = self.end_price - self.start_price;
        checked_div("price_change", checked_mul("price_change", diff, dec!(100))?, self.start_price)
    }

    pub fn mid_supply_apy(&self) -> Decimal {
        midpoint(self.supply_apy_range)
    }

    pub fn mid_borrow_apy(&self) -> Decimal {
        midpoint(self.borrow_apy_range)
    }
}

fn midpoint((low, high): (Decimal, Decimal)) -> Decimal {
    (low + high) / dec!(2)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("scenario dates are valid calendar dates")
}

/// Every built-in episode, oldest first.
pub fn scenarios() -> Vec<HistoricalScenario> {
    vec![
        HistoricalScenario {
            id: "defi_summer_2020",
            name: "DeFi Summer 2020",
            asset: "DAI",
            start: date(2020, 6, 15),
            end: date(2020, 9, 15),
            start_price: dec!(1.00),
            end_price: dec!(1.01),
            supply_apy_range: (dec!(3.5), dec!(12.0)),
            borrow_apy_range: (dec!(5.0), dec!(20.0)),
        },
        HistoricalScenario {
            id: "eth_bull_2021",
            name: "ETH Bull Run 2021",
            asset: "ETH",
            start: date(2021, 1, 15),
            end: date(2021, 11, 15),
            start_price: dec!(730),
            end_price: dec!(4800),
            supply_apy_range: (dec!(0.15), dec!(0.45)),
            borrow_apy_range: (dec!(1.2), dec!(3.5)),
        },
        HistoricalScenario {
            id: "crypto_crash_2022",
            name: "Crypto Market Crash 2022",
            asset: "WBTC",
            start: date(2022, 1, 15),
            end: date(2022, 11, 15),
            start_price: dec!(47700),
            end_price: dec!(16500),
            supply_apy_range: (dec!(0.1), dec!(0.3)),
            borrow_apy_range: (dec!(1.5), dec!(4.2)),
        },
        HistoricalScenario {
            id: "stablecoin_depegging_2023",
            name: "Stablecoin Depegging Event",
            asset: "USDC",
            start: date(2023, 3, 10),
            end: date(2023, 3, 13),
            start_price: dec!(1.00),
            end_price: dec!(0.87),
            supply_apy_range: (dec!(1.2), dec!(4.8)),
            borrow_apy_range: (dec!(3.5), dec!(12.5)),
        },
    ]
}

pub fn find_scenario(id: &str) -> Option<HistoricalScenario> {
    scenarios().into_iter().find(|s| s.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaySide {
    Supply,
    Borrow,
}

/// Result of replaying one position through a scenario.
///
/// For `Supply` the interest is earned and `total` is the return; for
/// `Borrow` the interest is paid and `total` is the cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    pub scenario_id: &'static str,
    pub side: ReplaySide,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub duration_days: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub start_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub end_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub value_change: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub value_change_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub interest: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub interest_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_percent: Decimal,
    pub profitable: bool,
}

fn percent_of(part: Decimal, whole: Decimal) -> Result<Decimal, RiskError> {
    checked_div("replay", checked_mul("replay", part, dec!(100))?, whole)
}

/// Replay `amount` units of the scenario asset on `side`.
pub fn replay(
    scenario: &HistoricalScenario,
    side: ReplaySide,
    amount: Decimal,
) -> Result<ReplayOutcome, RiskError> {
    let amount = ensure_positive("amount", amount)?;
    let days = scenario.duration_days();

    let start_value = checked_mul("start_value", amount, scenario.start_price)?;
    let end_value = checked_mul("end_value", amount, scenario.end_price)?;
    let value_change = end_value - start_value;

    let apy = match side {
        ReplaySide::Supply => scenario.mid_supply_apy(),
        ReplaySide::Borrow => scenario.mid_borrow_apy(),
    };
    let interest = accrue_linear(start_value, apy, Decimal::from(days))?;
    let total = checked_add("total", value_change, interest)?;

    let profitable = match side {
        ReplaySide::Supply => total > Decimal::ZERO,
        // Debt shrank in USD by more than the interest it cost.
        ReplaySide::Borrow => value_change < Decimal::ZERO && value_change.abs() > interest,
    };

    debug!(
        scenario = scenario.id,
        ?side,
        %amount,
        %total,
        profitable,
        "historical replay"
    );

    Ok(ReplayOutcome {
        scenario_id: scenario.id,
        side,
        amount,
        duration_days: days,
        start_value,
        end_value,
        value_change,
        value_change_percent: percent_of(value_change, start_value)?,
        interest,
        interest_percent: percent_of(interest, start_value)?,
        total,
        total_percent: percent_of(total, start_value)?,
        profitable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(id: &str) -> HistoricalScenario {
        find_scenario(id).unwrap()
    }

    #[test]
    fn test_catalogue() {
        let ids: Vec<&str> = scenarios().iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "defi_summer_2020",
                "eth_bull_2021",
                "crypto_crash_2022",
                "stablecoin_depegging_2023"
            ]
        );
        assert!(find_scenario("tulip_mania_1637").is_none());
    }

    #[test]
    fn test_durations() {
        assert_eq!(scenario("stablecoin_depegging_2023").duration_days(), 3);
        assert_eq!(scenario("defi_summer_2020").duration_days(), 92);
        assert_eq!(scenario("eth_bull_2021").duration_days(), 304);
    }

    #[test]
    fn test_price_change_percent() {
        let s = scenario("stablecoin_depegging_2023");
        assert_eq!(s.price_change_percent().unwrap(), dec!(-13));
    }

    #[test]
    fn test_eth_bull_supply_is_profitable() {
        let out = replay(&scenario("eth_bull_2021"), ReplaySide::Supply, dec!(1)).unwrap();
        assert_eq!(out.start_value, dec!(730));
        assert_eq!(out.end_value, dec!(4800));
        assert_eq!(out.value_change, dec!(4070));
        assert!(out.interest > Decimal::ZERO);
        assert_eq!(out.total, out.value_change + out.interest);
        assert!(out.profitable);
    }

    #[test]
    fn test_crash_borrow_is_profitable() {
        let out = replay(&scenario("crypto_crash_2022"), ReplaySide::Borrow, dec!(0.5)).unwrap();
        assert_eq!(out.value_change, dec!(-15600));
        assert!(out.interest < dec!(15600));
        assert!(out.profitable);
    }

    #[test]
    fn test_bull_borrow_is_not_profitable() {
        let out = replay(&scenario("eth_bull_2021"), ReplaySide::Borrow, dec!(1)).unwrap();
        assert!(!out.profitable);
        assert!(out.total > out.value_change);
    }

    #[test]
    fn test_depeg_interest() {
        // 1000 USDC at mid supply APY 3% over 3 days: 1000 * 3 * 3 / 36500.
        let out = replay(
            &scenario("stablecoin_depegging_2023"),
            ReplaySide::Supply,
            dec!(1000),
        )
        .unwrap();
        assert!((out.interest - dec!(0.2465753424657534)).abs() < dec!(0.000000000001));
        assert_eq!(out.value_change, dec!(-130));
        assert!(!out.profitable);
    }

    #[test]
    fn test_amount_must_be_positive() {
        let err = replay(&scenario("eth_bull_2021"), ReplaySide::Supply, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "amount"));
    }
}
