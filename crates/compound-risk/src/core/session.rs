//! Stateful simulation session backed by a [`PositionStore`].

use tracing::info;

use crate::errors::RiskError;
use crate::store::{ActionRecord, PositionStore, SessionRecord};
use crate::types::{Action, MarketTable, PositionSnapshot, RiskMetrics, TierThresholds};

use super::actions::apply_action_with;
use super::risk::evaluate_risk_with;

/// A user's simulated position, persisted after every accepted change.
///
/// Rejected actions are neither applied nor recorded.
pub struct SimulationSession<S: PositionStore> {
    store: S,
    id: String,
    record: SessionRecord,
    thresholds: TierThresholds,
}

impl<S: PositionStore> SimulationSession<S> {
    /// Resume `id` from `store`, or start an empty position if none exists.
    pub fn open(store: S, id: impl Into<String>) -> Result<Self, RiskError> {
        let id = id.into();
        let record = store.load(&id)?;
        let resumed = record.is_some();
        let record = record.unwrap_or_default();
        info!(
            session = %id,
            resumed,
            actions = record.history.len(),
            "simulation session opened"
        );
        Ok(Self {
            store,
            id,
            record,
            thresholds: TierThresholds::default(),
        })
    }

    pub fn with_thresholds(mut self, thresholds: TierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> &PositionSnapshot {
        &self.record.snapshot
    }

    pub fn history(&self) -> &[ActionRecord] {
        &self.record.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply and persist `action`.
    pub fn apply(&mut self, market: &MarketTable, action: Action) -> Result<RiskMetrics, RiskError> {
        let mut next = self.record.clone();
        let metrics = apply_action_with(&mut next.snapshot, market, &action, &self.thresholds)?;
        next.history.push(ActionRecord {
            action,
            applied_at: chrono::Utc::now().timestamp(),
        });
        self.store.save(&self.id, &next)?;
        self.record = next;
        Ok(metrics)
    }

    pub fn metrics(&self, market: &MarketTable) -> Result<RiskMetrics, RiskError> {
        evaluate_risk_with(&self.record.snapshot, market, &self.thresholds)
    }

    /// Clear the position and its history.
    pub fn reset(&mut self) -> Result<(), RiskError> {
        let cleared = SessionRecord::default();
        self.store.save(&self.id, &cleared)?;
        self.record = cleared;
        info!(session = %self.id, "simulation session reset");
        Ok(())
    }
}
