use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Typed error hierarchy for the risk core.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum RiskError {
    // -- Evaluation ---------------------------------------------------------
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("no market data for symbol {symbol}")]
    MissingMarketData { symbol: String },

    #[error("market data invalid {}", describe_violations(.violations))]
    MarketDataInvalid { violations: Vec<MarketViolation> },

    // -- Actions ------------------------------------------------------------
    #[error("market for {symbol} not found")]
    UnknownMarket { symbol: String },

    #[error("not enough collateral: need ${requested_usd}, borrow limit leaves ${available_usd}")]
    InsufficientCollateral {
        requested_usd: Decimal,
        available_usd: Decimal,
    },

    #[error("{action} of {requested} {symbol} exceeds position balance {held}")]
    ExceedsPosition {
        action: String,
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    // -- Storage ------------------------------------------------------------
    #[error("storage error: {reason}")]
    Storage { reason: String },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// One failed invariant on a market table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketViolation {
    pub symbol: String,
    pub field: &'static str,
    pub value: Decimal,
    pub reason: &'static str,
}

impl fmt::Display for MarketViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {} ({})",
            self.symbol, self.field, self.value, self.reason
        )
    }
}

fn describe_violations(violations: &[MarketViolation]) -> String {
    format!(
        "({} violation{}): {}",
        violations.len(),
        if violations.len() == 1 { "" } else { "s" },
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_data_invalid_lists_every_violation() {
        let err = RiskError::MarketDataInvalid {
            violations: vec![
                MarketViolation {
                    symbol: "ETH".into(),
                    field: "collateral_factor",
                    value: dec!(1.2),
                    reason: "must be in [0, 1]",
                },
                MarketViolation {
                    symbol: "DAI".into(),
                    field: "price",
                    value: dec!(0),
                    reason: "must be > 0",
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 violations"));
        assert!(msg.contains("ETH.collateral_factor = 1.2"));
        assert!(msg.contains("DAI.price = 0"));
    }

    #[test]
    fn test_missing_market_names_symbol() {
        let err = RiskError::MissingMarketData {
            symbol: "XYZ".into(),
        };
        assert_eq!(err.to_string(), "no market data for symbol XYZ");
    }
}
