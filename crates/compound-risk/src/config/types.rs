use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::stress::StressParams;
use crate::types::{Asset, MarketTable, TierThresholds};

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub app: AppConfig,
    /// `markets.json` as listed, duplicates included, so validation can see them.
    pub market_list: Vec<Asset>,
    pub risk: RiskSettings,
}

impl RiskConfig {
    pub fn market_table(&self) -> MarketTable {
        MarketTable::from_assets(self.market_list.iter().cloned())
    }
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
    /// Rolled daily; defaults to `compound-risk.log`.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// JSON document holding every session.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub default_id: String,
}

// ---------------------------------------------------------------------------
// risk.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    #[serde(default)]
    pub tiers: TierThresholds,
    #[serde(with = "rust_decimal::serde::str")]
    pub projection_days: Decimal,
    pub stress: StressParams,
}
