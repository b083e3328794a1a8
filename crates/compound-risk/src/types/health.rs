use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SAFE_HF, DEFAULT_WARNING_HF, DEFAULT_WATCH_HF};

/// Health factor of a position.
///
/// A position without debt has no meaningful ratio; it is represented by its
/// own variant rather than a large sentinel number so that threshold
/// comparisons cannot misfire on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HealthFactor {
    NoDebt,
    Ratio(Decimal),
}

impl HealthFactor {
    pub fn ratio(&self) -> Option<Decimal> {
        match self {
            Self::NoDebt => None,
            Self::Ratio(r) => Some(*r),
        }
    }

    pub fn is_no_debt(&self) -> bool {
        matches!(self, Self::NoDebt)
    }

    /// Strictly below `threshold`. `NoDebt` is never below anything.
    pub fn is_below(&self, threshold: Decimal) -> bool {
        match self {
            Self::NoDebt => false,
            Self::Ratio(r) => *r < threshold,
        }
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDebt => write!(f, "no debt"),
            Self::Ratio(r) => write!(f, "{:.4}", r),
        }
    }
}

/// Health factor tier used for warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    /// Above the safe threshold, or no debt at all.
    Safe,
    Watch,
    Warning,
    /// Below the warning threshold, including liquidatable positions.
    Critical,
}

/// Lower bounds of each tier. A ratio exactly on a bound belongs to the tier
/// below it for `safe` (Safe requires strictly greater) and to the tier itself
/// for `watch` and `warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(with = "rust_decimal::serde::str")]
    pub safe: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub watch: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub warning: Decimal,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            safe: DEFAULT_SAFE_HF,
            watch: DEFAULT_WATCH_HF,
            warning: DEFAULT_WARNING_HF,
        }
    }
}

/// Derived risk figures for one position against one market table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Σ amount × price over supplied assets, without collateral factors.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_supplied_value: Decimal,
    /// Σ amount × price × collateral factor. Also the borrow limit.
    #[serde(with = "rust_decimal::serde::str")]
    pub adjusted_collateral_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_borrowed_value: Decimal,
    pub health_factor: HealthFactor,
    pub at_risk: bool,
    /// Remaining borrowing power in USD, never negative.
    #[serde(with = "rust_decimal::serde::str")]
    pub available_to_borrow: Decimal,
    /// Share of the borrow limit in use, in percent. `None` when debt exists
    /// against zero borrowing power.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub borrow_limit_used_percent: Option<Decimal>,
    pub tier: HealthTier,
}

/// Linear interest projection over a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestEstimate {
    #[serde(with = "rust_decimal::serde::str")]
    pub interest_earned: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub interest_paid: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub net_interest: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_no_debt_is_never_below() {
        assert!(!HealthFactor::NoDebt.is_below(dec!(1.3)));
        assert!(!HealthFactor::NoDebt.is_below(Decimal::MAX));
        assert!(HealthFactor::Ratio(dec!(1.2)).is_below(dec!(1.3)));
        assert!(!HealthFactor::Ratio(dec!(1.0)).is_below(dec!(1.0)));
    }

    #[test]
    fn test_health_factor_serde_is_tagged() {
        let json = serde_json::to_string(&HealthFactor::Ratio(dec!(1.125))).unwrap();
        assert_eq!(json, r#"{"kind":"ratio","value":"1.125"}"#);
        let json = serde_json::to_string(&HealthFactor::NoDebt).unwrap();
        assert_eq!(json, r#"{"kind":"no_debt"}"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(HealthFactor::NoDebt.to_string(), "no debt");
        assert_eq!(HealthFactor::Ratio(dec!(1.125)).to_string(), "1.1250");
    }
}
