//! Decimal conversion and checked arithmetic helpers.
//!
//! Every value that reaches the evaluators is a `Decimal`. Floats coming from
//! a UI boundary go through [`decimal_from_f64`], which is the only place a
//! NaN or infinity can be observed and rejected.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::errors::RiskError;

/// Convert a float to `Decimal`, rejecting NaN and ±Infinity.
pub fn decimal_from_f64(field: &str, value: f64) -> Result<Decimal, RiskError> {
    if !value.is_finite() {
        return Err(RiskError::invalid(field, format!("{value} is not finite")));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| RiskError::invalid(field, format!("{value} is out of range")))
}

/// Reject negative values.
pub fn ensure_non_negative(field: &str, value: Decimal) -> Result<Decimal, RiskError> {
    if value < Decimal::ZERO {
        return Err(RiskError::invalid(field, format!("{value} is negative")));
    }
    Ok(value)
}

/// Reject zero and negative values.
pub fn ensure_positive(field: &str, value: Decimal) -> Result<Decimal, RiskError> {
    if value <= Decimal::ZERO {
        return Err(RiskError::invalid(field, format!("{value} must be > 0")));
    }
    Ok(value)
}

pub(crate) fn checked_mul(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, RiskError> {
    a.checked_mul(b)
        .ok_or_else(|| RiskError::invalid(field, "product overflows decimal range"))
}

pub(crate) fn checked_add(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, RiskError> {
    a.checked_add(b)
        .ok_or_else(|| RiskError::invalid(field, "sum overflows decimal range"))
}

pub(crate) fn checked_div(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, RiskError> {
    a.checked_div(b)
        .ok_or_else(|| RiskError::invalid(field, "quotient overflows decimal range"))
}
