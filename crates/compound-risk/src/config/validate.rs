use std::collections::BTreeSet;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use super::types::RiskConfig;
use crate::constants::{LIQUIDATION_THRESHOLD, MAX_STRESS_INTENSITY_PERCENT};
use crate::core::market::asset_violations;

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Called automatically by [`super::load_config`].
pub fn validate_config(config: &RiskConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_app_config(config, &mut errors);
    validate_markets(config, &mut errors);
    validate_risk_settings(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

fn validate_app_config(config: &RiskConfig, errors: &mut Vec<String>) {
    let app = &config.app;

    if app.logging.log_dir.trim().is_empty() {
        errors.push("app.logging: log_dir is empty".into());
    }
    if let Some(filter) = app.logging.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        if let Err(e) = EnvFilter::try_new(filter) {
            errors.push(format!("app.logging: filter {filter:?} does not parse ({e})"));
        }
    }
    if app.store.path.trim().is_empty() {
        errors.push("app.store: path is empty".into());
    }
    if app.session.default_id.trim().is_empty() {
        errors.push("app.session: default_id is empty".into());
    }
}

// ---------------------------------------------------------------------------
// markets.json
// ---------------------------------------------------------------------------

fn validate_markets(config: &RiskConfig, errors: &mut Vec<String>) {
    if config.market_list.is_empty() {
        errors.push("markets: must list at least one asset".into());
        return;
    }

    let mut seen = BTreeSet::new();
    for asset in &config.market_list {
        if asset.symbol.trim().is_empty() {
            errors.push("markets: asset with empty symbol".into());
            continue;
        }
        if !seen.insert(asset.symbol.as_str()) {
            errors.push(format!("markets: duplicate symbol {}", asset.symbol));
        }
        for violation in asset_violations(asset) {
            errors.push(format!("markets: {violation}"));
        }
    }
}

// ---------------------------------------------------------------------------
// risk.json
// ---------------------------------------------------------------------------

fn validate_risk_settings(config: &RiskConfig, errors: &mut Vec<String>) {
    let risk = &config.risk;
    let tiers = &risk.tiers;

    if tiers.safe <= tiers.watch {
        errors.push(format!(
            "risk.tiers: safe ({}) must be > watch ({})",
            tiers.safe, tiers.watch
        ));
    }
    if tiers.watch <= tiers.warning {
        errors.push(format!(
            "risk.tiers: watch ({}) must be > warning ({})",
            tiers.watch, tiers.warning
        ));
    }
    if tiers.warning <= LIQUIDATION_THRESHOLD {
        errors.push(format!(
            "risk.tiers: warning ({}) must be > {LIQUIDATION_THRESHOLD}",
            tiers.warning
        ));
    }

    if risk.projection_days < Decimal::ZERO {
        errors.push(format!(
            "risk: projection_days must be >= 0, got {}",
            risk.projection_days
        ));
    }

    let stress = &risk.stress;
    if stress.intensity_percent < Decimal::ZERO
        || stress.intensity_percent > MAX_STRESS_INTENSITY_PERCENT
    {
        errors.push(format!(
            "risk.stress: intensity_percent must be in [0, {MAX_STRESS_INTENSITY_PERCENT}], got {}",
            stress.intensity_percent
        ));
    }
    if stress.duration_days < Decimal::ZERO {
        errors.push(format!(
            "risk.stress: duration_days must be >= 0, got {}",
            stress.duration_days
        ));
    }
}
