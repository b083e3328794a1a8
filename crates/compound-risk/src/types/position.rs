use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::RiskError;

use super::numeric::{decimal_from_f64, ensure_non_negative};

/// Supplied and borrowed holdings of one simulated user, in asset units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    #[serde(default, with = "decimal_map")]
    pub supplied: BTreeMap<String, Decimal>,
    #[serde(default, with = "decimal_map")]
    pub borrowed: BTreeMap<String, Decimal>,
}

impl PositionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from float holdings, rejecting NaN, infinities and negatives.
    pub fn from_f64<S, B>(supplied: S, borrowed: B) -> Result<Self, RiskError>
    where
        S: IntoIterator<Item = (String, f64)>,
        B: IntoIterator<Item = (String, f64)>,
    {
        let convert = |side: &str, entries: Vec<(String, f64)>| {
            entries
                .into_iter()
                .map(|(symbol, amount)| -> Result<(String, Decimal), RiskError> {
                    let field = format!("{side}.{symbol}");
                    let amount = ensure_non_negative(&field, decimal_from_f64(&field, amount)?)?;
                    Ok((symbol, amount))
                })
                .collect::<Result<BTreeMap<_, _>, RiskError>>()
        };
        Ok(Self {
            supplied: convert("supplied", supplied.into_iter().collect())?,
            borrowed: convert("borrowed", borrowed.into_iter().collect())?,
        })
    }

    pub fn with_supplied(mut self, symbol: impl Into<String>, amount: Decimal) -> Self {
        *self.supplied.entry(symbol.into()).or_default() += amount;
        self
    }

    pub fn with_borrowed(mut self, symbol: impl Into<String>, amount: Decimal) -> Self {
        *self.borrowed.entry(symbol.into()).or_default() += amount;
        self
    }

    pub fn supplied_amount(&self, symbol: &str) -> Decimal {
        self.supplied.get(symbol).copied().unwrap_or_default()
    }

    pub fn borrowed_amount(&self, symbol: &str) -> Decimal {
        self.borrowed.get(symbol).copied().unwrap_or_default()
    }

    /// `true` when no borrowed entry carries a positive amount.
    pub fn has_no_debt(&self) -> bool {
        self.borrowed.values().all(|a| *a <= Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.supplied.is_empty() && self.borrowed.is_empty()
    }

    /// Every symbol referenced on either side, deduplicated and sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        let mut all: Vec<&str> = self
            .supplied
            .keys()
            .chain(self.borrowed.keys())
            .map(String::as_str)
            .collect();
        all.sort_unstable();
        all.dedup();
        all.into_iter()
    }

    pub fn reset(&mut self) {
        self.supplied.clear();
        self.borrowed.clear();
    }
}

/// Closed set of position mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Supply,
    Borrow,
    Repay,
    Withdraw,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
            Self::Withdraw => "withdraw",
        }
    }
}

impl FromStr for ActionKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supply" => Ok(Self::Supply),
            "borrow" => Ok(Self::Borrow),
            "repay" => Ok(Self::Repay),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(RiskError::invalid(
                "action.kind",
                format!("unknown action {other:?}"),
            )),
        }
    }
}

/// One user action against a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl Action {
    pub fn new(kind: ActionKind, symbol: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            amount,
        }
    }

    pub fn supply(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ActionKind::Supply, symbol, amount)
    }

    pub fn borrow(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ActionKind::Borrow, symbol, amount)
    }

    pub fn repay(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ActionKind::Repay, symbol, amount)
    }

    pub fn withdraw(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ActionKind::Withdraw, symbol, amount)
    }
}

/// Parses `kind:SYMBOL:amount`, e.g. `supply:ETH:2.5`. Symbols are uppercased.
impl FromStr for Action {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [kind, symbol, amount] = parts.as_slice() else {
            return Err(RiskError::invalid(
                "action",
                format!("expected kind:SYMBOL:amount, got {s:?}"),
            ));
        };
        if symbol.trim().is_empty() {
            return Err(RiskError::invalid("action.symbol", "symbol is empty"));
        }
        let amount = Decimal::from_str(amount.trim())
            .map_err(|e| RiskError::invalid("action.amount", format!("{amount:?}: {e}")))?;
        Ok(Self::new(kind.parse()?, symbol.trim().to_uppercase(), amount))
    }
}

/// Symbol → `Decimal` maps serialized with string values.
mod decimal_map {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let as_strings: BTreeMap<&String, String> =
            map.iter().map(|(k, v)| (k, v.to_string())).collect();
        as_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Decimal>, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                Decimal::from_str(&v)
                    .map(|d| (k, d))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}
