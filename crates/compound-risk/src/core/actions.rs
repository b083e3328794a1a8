//! Position actions: supply, borrow, repay and withdraw.
//!
//! Each action is validated against the market table and the post-action
//! position is re-evaluated before anything is committed. A rejected action
//! leaves the snapshot exactly as it was.
//!
//! Borrow and withdraw are refused when the resulting debt would exceed the
//! adjusted collateral value (the borrow limit). Ending exactly on the limit
//! is allowed: that is a health factor of 1.0, which is not at risk.
//!
//! A supply mints `amount / exchange_rate` of the market's cToken; see
//! [`c_tokens_minted`].

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::RiskError;
use crate::types::numeric::{checked_add, checked_div, checked_mul, ensure_positive};
use crate::types::{
    Action, ActionKind, MarketTable, PositionSnapshot, RiskMetrics, TierThresholds,
};

use super::risk::evaluate_risk_with;

/// Apply `action` with the default tier thresholds.
pub fn apply_action(
    snapshot: &mut PositionSnapshot,
    market: &MarketTable,
    action: &Action,
) -> Result<RiskMetrics, RiskError> {
    apply_action_with(snapshot, market, action, &TierThresholds::default())
}

/// Apply `action` to `snapshot`, returning the post-action metrics.
pub fn apply_action_with(
    snapshot: &mut PositionSnapshot,
    market: &MarketTable,
    action: &Action,
    thresholds: &TierThresholds,
) -> Result<RiskMetrics, RiskError> {
    let symbol = action.symbol.as_str();
    let amount = ensure_positive(&format!("{}.amount", action.kind.as_str()), action.amount)?;
    let asset = market.get(symbol).ok_or_else(|| RiskError::UnknownMarket {
        symbol: symbol.to_string(),
    })?;

    let before = evaluate_risk_with(snapshot, market, thresholds)?;
    let mut next = snapshot.clone();

    match action.kind {
        ActionKind::Supply => {
            let held = next.supplied_amount(symbol);
            next.supplied
                .insert(symbol.to_string(), checked_add("supply", held, amount)?);
        }
        ActionKind::Borrow => {
            let held = next.borrowed_amount(symbol);
            next.borrowed
                .insert(symbol.to_string(), checked_add("borrow", held, amount)?);
        }
        ActionKind::Repay => {
            let held = next.borrowed_amount(symbol);
            reduce(&mut next.borrowed, action, held)?;
        }
        ActionKind::Withdraw => {
            let held = next.supplied_amount(symbol);
            reduce(&mut next.supplied, action, held)?;
        }
    }

    let after = evaluate_risk_with(&next, market, thresholds)?;

    if matches!(action.kind, ActionKind::Borrow | ActionKind::Withdraw)
        && after.total_borrowed_value > after.adjusted_collateral_value
    {
        let mut requested_usd = checked_mul("requested", amount, asset.price)?;
        if action.kind == ActionKind::Withdraw {
            requested_usd = checked_mul("requested", requested_usd, asset.collateral_factor)?;
        }
        warn!(
            action = action.kind.as_str(),
            symbol,
            %requested_usd,
            available_usd = %before.available_to_borrow,
            "action rejected: borrow limit exceeded"
        );
        return Err(RiskError::InsufficientCollateral {
            requested_usd,
            available_usd: before.available_to_borrow,
        });
    }

    debug!(
        action = action.kind.as_str(),
        symbol,
        %amount,
        health_factor = %after.health_factor,
        "action applied"
    );
    *snapshot = next;
    Ok(after)
}

/// Subtract `action.amount` from a holding, dropping the entry at zero.
fn reduce(
    holdings: &mut std::collections::BTreeMap<String, Decimal>,
    action: &Action,
    held: Decimal,
) -> Result<(), RiskError> {
    if action.amount > held {
        return Err(RiskError::ExceedsPosition {
            action: action.kind.as_str().to_string(),
            symbol: action.symbol.clone(),
            requested: action.amount,
            held,
        });
    }
    let remaining = held - action.amount;
    if remaining.is_zero() {
        holdings.remove(&action.symbol);
    } else {
        holdings.insert(action.symbol.clone(), remaining);
    }
    Ok(())
}

/// cTokens received for a supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CTokenMint {
    pub c_token_symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// cTokens minted by `action`, or `None` for anything but a supply.
pub fn c_tokens_minted(
    market: &MarketTable,
    action: &Action,
) -> Result<Option<CTokenMint>, RiskError> {
    if action.kind != ActionKind::Supply {
        return Ok(None);
    }
    let asset = market.get(&action.symbol).ok_or_else(|| RiskError::UnknownMarket {
        symbol: action.symbol.clone(),
    })?;
    let field = format!("{}.exchange_rate", asset.symbol);
    if asset.exchange_rate <= Decimal::ZERO {
        return Err(RiskError::invalid(field, format!("{} must be > 0", asset.exchange_rate)));
    }
    Ok(Some(CTokenMint {
        c_token_symbol: asset.c_token(),
        amount: checked_div(&field, action.amount, asset.exchange_rate)?,
    }))
}

// ---------------------------------------------------------------------------
// Multi-step plans
// ---------------------------------------------------------------------------

/// Result of one step in a plan.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// 1-based position in the plan.
    pub step: usize,
    pub action: Action,
    pub success: bool,
    pub message: String,
    /// Metrics after the step, present only when it succeeded.
    pub metrics: Option<RiskMetrics>,
    /// Set on successful supplies.
    pub minted: Option<CTokenMint>,
}

/// Result of running a whole plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub steps: Vec<StepOutcome>,
    pub completed: usize,
    pub failed: usize,
    pub final_metrics: RiskMetrics,
}

/// Run `steps` in order against `snapshot`.
///
/// A failed step is recorded and skipped; later steps still run against the
/// position as it stood after the last successful step.
pub fn run_plan(
    snapshot: &mut PositionSnapshot,
    market: &MarketTable,
    steps: &[Action],
    thresholds: &TierThresholds,
) -> Result<PlanOutcome, RiskError> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for (i, action) in steps.iter().enumerate() {
        let outcome = match apply_action_with(snapshot, market, action, thresholds) {
            Ok(metrics) => StepOutcome {
                step: i + 1,
                action: action.clone(),
                success: true,
                message: format!(
                    "{} {} {}",
                    past_tense(action.kind),
                    action.amount,
                    action.symbol
                ),
                metrics: Some(metrics),
                minted: c_tokens_minted(market, action)?,
            },
            Err(e) => StepOutcome {
                step: i + 1,
                action: action.clone(),
                success: false,
                message: e.to_string(),
                metrics: None,
                minted: None,
            },
        };
        outcomes.push(outcome);
    }

    let completed = outcomes.iter().filter(|o| o.success).count();
    let failed = outcomes.len() - completed;
    info!(steps = outcomes.len(), completed, failed, "plan executed");

    Ok(PlanOutcome {
        steps: outcomes,
        completed,
        failed,
        final_metrics: evaluate_risk_with(snapshot, market, thresholds)?,
    })
}

fn past_tense(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Supply => "supplied",
        ActionKind::Borrow => "borrowed",
        ActionKind::Repay => "repaid",
        ActionKind::Withdraw => "withdrew",
    }
}
