//! Persistence boundary for simulation sessions.
//!
//! The evaluators never touch storage. A [`SimulationSession`] owns a
//! [`PositionStore`] and writes the position plus its action history through
//! it after every change.
//!
//! [`SimulationSession`]: crate::core::session::SimulationSession

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RiskError;
use crate::types::{Action, PositionSnapshot};

/// One applied action, stamped with unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: Action,
    pub applied_at: i64,
}

/// Everything persisted for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub snapshot: PositionSnapshot,
    #[serde(default)]
    pub history: Vec<ActionRecord>,
}

pub trait PositionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, RiskError>;

    fn save(&mut self, session_id: &str, record: &SessionRecord) -> Result<(), RiskError>;

    /// Returns whether a record was removed.
    fn remove(&mut self, session_id: &str) -> Result<bool, RiskError>;

    fn session_ids(&self) -> Result<Vec<String>, RiskError>;
}

fn check_id(session_id: &str) -> Result<(), RiskError> {
    if session_id.trim().is_empty() {
        return Err(RiskError::Storage {
            reason: "session id is empty".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, RiskError> {
        check_id(session_id)?;
        Ok(self.records.get(session_id).cloned())
    }

    fn save(&mut self, session_id: &str, record: &SessionRecord) -> Result<(), RiskError> {
        check_id(session_id)?;
        self.records.insert(session_id.to_string(), record.clone());
        Ok(())
    }

    fn remove(&mut self, session_id: &str) -> Result<bool, RiskError> {
        check_id(session_id)?;
        Ok(self.records.remove(session_id).is_some())
    }

    fn session_ids(&self) -> Result<Vec<String>, RiskError> {
        Ok(self.records.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// All sessions in one JSON document keyed by session id.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target,
/// so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, SessionRecord>, RiskError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, doc: &BTreeMap<String, SessionRecord>) -> Result<(), RiskError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, serde_json::to_string_pretty(doc)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), sessions = doc.len(), "session store written");
        Ok(())
    }
}

impl PositionStore for JsonFileStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, RiskError> {
        check_id(session_id)?;
        Ok(self.read_document()?.remove(session_id))
    }

    fn save(&mut self, session_id: &str, record: &SessionRecord) -> Result<(), RiskError> {
        check_id(session_id)?;
        let mut doc = self.read_document()?;
        doc.insert(session_id.to_string(), record.clone());
        self.write_document(&doc)
    }

    fn remove(&mut self, session_id: &str) -> Result<bool, RiskError> {
        check_id(session_id)?;
        let mut doc = self.read_document()?;
        if doc.remove(session_id).is_none() {
            return Ok(false);
        }
        self.write_document(&doc)?;
        Ok(true)
    }

    fn session_ids(&self) -> Result<Vec<String>, RiskError> {
        Ok(self.read_document()?.into_keys().collect())
    }
}
