pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::types::Asset;

/// Load and merge all config JSON files into a single [`RiskConfig`],
/// then apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   markets.json
///   risk.json
/// ```
///
/// # Environment variable overrides
///
/// | Env Var                          | Config Field                   |
/// |----------------------------------|--------------------------------|
/// | `COMPOUND_RISK_LOG_DIR`          | `app.logging.log_dir`          |
/// | `COMPOUND_RISK_STORE_PATH`       | `app.store.path`               |
/// | `COMPOUND_RISK_SESSION`          | `app.session.default_id`       |
/// | `COMPOUND_RISK_PROJECTION_DAYS`  | `risk.projection_days`         |
/// | `COMPOUND_RISK_STRESS_INTENSITY` | `risk.stress.intensity_percent`|
pub fn load_config(config_dir: &Path) -> Result<RiskConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig = serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let market_list: Vec<Asset> =
        serde_json::from_str(&read("markets.json")?).context("parsing markets.json")?;

    let risk: RiskSettings =
        serde_json::from_str(&read("risk.json")?).context("parsing risk.json")?;

    let mut config = RiskConfig {
        app,
        market_list,
        risk,
    };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    info!(
        markets = config.market_list.len(),
        projection_days = %config.risk.projection_days,
        "configuration loaded"
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Only non-empty env vars take effect. Parse failures are logged and skipped
/// (the JSON value remains).
fn apply_env_overrides(config: &mut RiskConfig) {
    // -- App -----------------------------------------------------------------
    if let Some(val) = env_string("COMPOUND_RISK_LOG_DIR") {
        info!(log_dir = %val, "env override: COMPOUND_RISK_LOG_DIR");
        config.app.logging.log_dir = val;
    }

    if let Some(val) = env_string("COMPOUND_RISK_STORE_PATH") {
        info!(path = %val, "env override: COMPOUND_RISK_STORE_PATH");
        config.app.store.path = val;
    }

    if let Some(val) = env_string("COMPOUND_RISK_SESSION") {
        info!(session = %val, "env override: COMPOUND_RISK_SESSION");
        config.app.session.default_id = val;
    }

    // -- Risk ----------------------------------------------------------------
    if let Some(val) = env_decimal("COMPOUND_RISK_PROJECTION_DAYS") {
        info!(%val, "env override: COMPOUND_RISK_PROJECTION_DAYS");
        config.risk.projection_days = val;
    }

    if let Some(val) = env_decimal("COMPOUND_RISK_STRESS_INTENSITY") {
        info!(%val, "env override: COMPOUND_RISK_STRESS_INTENSITY");
        config.risk.stress.intensity_percent = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `Decimal`.
fn env_decimal(key: &str) -> Option<Decimal> {
    let raw = env_string(key)?;
    match Decimal::from_str(raw.trim()) {
        Ok(val) => Some(val),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring unparseable env override");
            None
        }
    }
}
