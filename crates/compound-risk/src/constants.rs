use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

/// Health factor below which a position is eligible for liquidation.
pub const LIQUIDATION_THRESHOLD: Decimal = dec!(1);

/// Default health tier lower bounds.
pub const DEFAULT_SAFE_HF: Decimal = dec!(2.0);
pub const DEFAULT_WATCH_HF: Decimal = dec!(1.5);
pub const DEFAULT_WARNING_HF: Decimal = dec!(1.3);

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Underlying per cToken when a market omits its exchange rate.
pub const DEFAULT_EXCHANGE_RATE: Decimal = dec!(0.02);

// ---------------------------------------------------------------------------
// Interest
// ---------------------------------------------------------------------------

/// Percent-per-year → fraction-per-day divisor (100 × 365).
pub const PERCENT_DAYS_PER_YEAR: Decimal = dec!(36500);

// ---------------------------------------------------------------------------
// Stress
// ---------------------------------------------------------------------------

pub const MAX_STRESS_INTENSITY_PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// Env var naming the config directory.
pub const CONFIG_DIR_ENV: &str = "COMPOUND_RISK_CONFIG_DIR";
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Prefix of the daily-rolled log file.
pub const LOG_FILE_NAME: &str = "compound-risk.log";
pub const DEFAULT_LOG_FILTER: &str = "compound_risk=info,warn";
