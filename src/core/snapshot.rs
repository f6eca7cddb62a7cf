//! Point-in-time description of what the FSM believes.

use super::clock::{monotonic_ns, wall_now};
use super::history::TransitionHistory;
use super::state::FsmState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Source tag stamped on snapshots produced by the FSM core.
pub const DEFAULT_SOURCE_MODULE: &str = "fsm_handler";

/// Reason carried by the first snapshot of every run.
pub const COLD_START_REASON: &str = "COLD_START";

pub fn new_snapshot_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn new_instance_id() -> String {
    Uuid::new_v4().to_string()
}

/// Immutable, self-contained FSM snapshot.
///
/// Every snapshot owns its own `history` and maps; holders of a snapshot
/// can go stale but never observe another holder's edits.
///
/// `version` only moves when `state` moves. Snapshots are derived from their
/// predecessor with [`crate::engine::derive`] and committed through the
/// [`crate::store::StateStore`].
///
/// # Example
///
/// ```rust
/// use qcore_state::core::{FsmState, Snapshot};
///
/// let first = Snapshot::cold_start("run-1");
/// assert_eq!(first.version, 0);
/// assert_eq!(first.state, FsmState::Booting);
/// assert_eq!(first.reason, "COLD_START");
/// assert_eq!(first.instance_id, "run-1");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub state: FsmState,
    pub prev_state: Option<FsmState>,
    /// Why the FSM is in `state`
    pub reason: String,
    pub monotonic_ns: u64,
    pub wall_time: DateTime<Utc>,
    /// Unique per snapshot
    pub snapshot_id: String,
    /// `snapshot_id` of the snapshot this one was derived from
    pub parent_snapshot_id: Option<String>,
    /// Unique per long-lived FSM run
    pub instance_id: String,
    pub source_module: String,
    /// Number of recorded state changes
    pub attempt_count: u32,
    pub history: TransitionHistory,
    pub context_data: HashMap<String, String>,
    pub state_metadata: HashMap<String, String>,
}

impl Snapshot {
    /// Create a version-0 snapshot in `state` with fresh identifiers.
    pub fn new(state: FsmState, reason: impl Into<String>) -> Self {
        Self {
            version: 0,
            state,
            prev_state: None,
            reason: reason.into(),
            monotonic_ns: monotonic_ns(),
            wall_time: wall_now(),
            snapshot_id: new_snapshot_id(),
            parent_snapshot_id: None,
            instance_id: new_instance_id(),
            source_module: DEFAULT_SOURCE_MODULE.to_string(),
            attempt_count: 0,
            history: TransitionHistory::new(),
            context_data: HashMap::new(),
            state_metadata: HashMap::new(),
        }
    }

    /// The canonical first snapshot of a run.
    pub fn cold_start(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Self::new(FsmState::Booting, COLD_START_REASON)
        }
    }

    /// Copy of this snapshot with a different version.
    ///
    /// [`crate::store::StateStore`] uses this when it repairs a
    /// non-increasing version.
    pub fn with_version(&self, version: u64) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_data.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state_metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this snapshot was derived directly from `other`.
    pub fn is_derived_from(&self, other: &Snapshot) -> bool {
        self.parent_snapshot_id.as_deref() == Some(other.snapshot_id.as_str())
    }

    /// Trigger label of the most recent recorded transition.
    pub fn last_trigger(&self) -> Option<&str> {
        self.history.last().map(|t| t.trigger.as_str())
    }
}
