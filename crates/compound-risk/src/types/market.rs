use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXCHANGE_RATE;
use crate::errors::RiskError;

use super::numeric::decimal_from_f64;

/// Reference data for one lendable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    /// USD per unit.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Fraction of supplied USD value counted toward borrowing power, in [0, 1].
    #[serde(with = "rust_decimal::serde::str")]
    pub collateral_factor: Decimal,
    /// Annualized percentage, e.g. `2.53` for 2.53 %.
    #[serde(with = "rust_decimal::serde::str")]
    pub supply_apy: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub borrow_apy: Decimal,
    /// Held at a fixed USD price; stress price shocks leave it alone.
    #[serde(default)]
    pub pegged: bool,
    /// Receipt token minted on supply. Defaults to `c` + symbol.
    #[serde(default)]
    pub c_token_symbol: Option<String>,
    /// Underlying units per cToken.
    #[serde(
        default = "default_exchange_rate",
        with = "rust_decimal::serde::str"
    )]
    pub exchange_rate: Decimal,
}

fn default_exchange_rate() -> Decimal {
    DEFAULT_EXCHANGE_RATE
}

impl Asset {
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        collateral_factor: Decimal,
        supply_apy: Decimal,
        borrow_apy: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            price,
            collateral_factor,
            supply_apy,
            borrow_apy,
            pegged: false,
            c_token_symbol: None,
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }

    /// Build from float inputs, rejecting NaN and infinities.
    pub fn from_f64(
        symbol: impl Into<String>,
        price: f64,
        collateral_factor: f64,
        supply_apy: f64,
        borrow_apy: f64,
    ) -> Result<Self, RiskError> {
        let symbol = symbol.into();
        let field = |name: &str| format!("{symbol}.{name}");
        Ok(Self {
            price: decimal_from_f64(&field("price"), price)?,
            collateral_factor: decimal_from_f64(&field("collateral_factor"), collateral_factor)?,
            supply_apy: decimal_from_f64(&field("supply_apy"), supply_apy)?,
            borrow_apy: decimal_from_f64(&field("borrow_apy"), borrow_apy)?,
            name: String::new(),
            pegged: false,
            c_token_symbol: None,
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            symbol,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn pegged(mut self) -> Self {
        self.pegged = true;
        self
    }

    pub fn with_c_token(mut self, symbol: impl Into<String>, exchange_rate: Decimal) -> Self {
        self.c_token_symbol = Some(symbol.into());
        self.exchange_rate = exchange_rate;
        self
    }

    pub fn c_token(&self) -> String {
        self.c_token_symbol
            .clone()
            .unwrap_or_else(|| format!("c{}", self.symbol))
    }
}

/// Symbol → [`Asset`] lookup table handed to the evaluators.
///
/// Serialized as a plain list of assets. Later entries replace earlier ones
/// with the same symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Asset>", into = "Vec<Asset>")]
pub struct MarketTable {
    assets: BTreeMap<String, Asset>,
}

impl MarketTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        Self {
            assets: assets
                .into_iter()
                .map(|asset| (asset.symbol.clone(), asset))
                .collect(),
        }
    }

    pub fn insert(&mut self, asset: Asset) -> Option<Asset> {
        self.assets.insert(asset.symbol.clone(), asset)
    }

    pub fn get(&self, symbol: &str) -> Option<&Asset> {
        self.assets.get(symbol)
    }

    /// Look up a symbol referenced by a position.
    pub fn require(&self, symbol: &str) -> Result<&Asset, RiskError> {
        self.get(symbol).ok_or_else(|| RiskError::MissingMarketData {
            symbol: symbol.to_string(),
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.assets.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Copy of the table with every asset passed through `f`.
    pub fn map_assets(&self, f: impl FnMut(&Asset) -> Asset) -> Self {
        Self::from_assets(self.iter().map(f))
    }

    /// Built-in mock markets used when no external table is configured.
    pub fn defaults() -> Self {
        Self::from_assets([
            Asset::new("DAI", dec!(1.00), dec!(0.75), dec!(2.53), dec!(3.82))
                .with_name("Dai Stablecoin")
                .with_c_token("cDAI", dec!(0.02))
                .pegged(),
            Asset::new("USDC", dec!(1.00), dec!(0.80), dec!(2.12), dec!(3.45))
                .with_name("USD Coin")
                .with_c_token("cUSDC", dec!(0.022))
                .pegged(),
            Asset::new("ETH", dec!(3500.00), dec!(0.70), dec!(0.32), dec!(1.25))
                .with_name("Ethereum")
                .with_c_token("cETH", dec!(0.05)),
            Asset::new("WBTC", dec!(60000.00), dec!(0.65), dec!(0.21), dec!(1.12))
                .with_name("Wrapped Bitcoin")
                .with_c_token("cWBTC", dec!(0.02)),
        ])
    }
}

impl From<Vec<Asset>> for MarketTable {
    fn from(assets: Vec<Asset>) -> Self {
        Self::from_assets(assets)
    }
}

impl From<MarketTable> for Vec<Asset> {
    fn from(table: MarketTable) -> Self {
        table.assets.into_values().collect()
    }
}

impl FromIterator<Asset> for MarketTable {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        Self::from_assets(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_mock_markets() {
        let table = MarketTable::defaults();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("ETH").unwrap().price, dec!(3500));
        assert_eq!(table.get("WBTC").unwrap().collateral_factor, dec!(0.65));
        assert_eq!(
            table.symbols().collect::<Vec<_>>(),
            vec!["DAI", "ETH", "USDC", "WBTC"]
        );
        assert!(table.get("DAI").unwrap().pegged);
        assert!(!table.get("ETH").unwrap().pegged);
        assert_eq!(table.get("ETH").unwrap().c_token(), "cETH");
        assert_eq!(table.get("ETH").unwrap().exchange_rate, dec!(0.05));
    }

    #[test]
    fn test_require_missing_symbol() {
        let table = MarketTable::defaults();
        let err = table.require("XYZ").unwrap_err();
        assert!(matches!(err, RiskError::MissingMarketData { ref symbol } if symbol == "XYZ"));
    }

    #[test]
    fn test_from_f64_rejects_nan_price() {
        let err = Asset::from_f64("ETH", f64::NAN, 0.75, 1.0, 2.0).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "ETH.price"));
    }

    #[test]
    fn test_table_deserializes_from_list() {
        let json = r#"[
            { "symbol": "ETH", "name": "Ethereum", "price": "3000", "collateral_factor": "0.75", "supply_apy": "0.32", "borrow_apy": "1.25", "c_token_symbol": "cETHv2", "exchange_rate": "0.05" },
            { "symbol": "USDC", "price": "1", "collateral_factor": "0.8", "supply_apy": "2.12", "borrow_apy": "3.45" }
        ]"#;
        let table: MarketTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("ETH").unwrap().collateral_factor, dec!(0.75));
        assert_eq!(table.get("USDC").unwrap().name, "");
        assert!(!table.get("USDC").unwrap().pegged);
        assert_eq!(table.get("USDC").unwrap().c_token(), "cUSDC");
        assert_eq!(table.get("USDC").unwrap().exchange_rate, dec!(0.02));
        assert_eq!(table.get("ETH").unwrap().c_token(), "cETHv2");
        assert_eq!(table.get("ETH").unwrap().exchange_rate, dec!(0.05));
    }
}
