//! Interchange representation of snapshots.
//!
//! States and statuses travel as integer codes so that a peer running a
//! newer enum can still be read: unknown codes decode to `Unspecified`.
//! Every field has a default, so a sparse document still decodes. Identity
//! fields are optional: only a missing value is replaced, an empty one is
//! kept as sent.

use super::FORMAT_VERSION;
use crate::core::{
    new_instance_id, new_snapshot_id, FsmState, Snapshot, Transition, TransitionHistory,
    TransitionStatus, DEFAULT_SOURCE_MODULE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One history entry on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireTransition {
    pub from_state: i32,
    pub to_state: i32,
    pub trigger: String,
    pub status: i32,
    pub error_message: String,
    pub monotonic_ns: u64,
    pub wall_time: DateTime<Utc>,
}

/// Versioned envelope for a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireSnapshot {
    pub format_version: u32,
    pub version: u64,
    pub state: i32,
    pub prev_state: Option<i32>,
    pub reason: String,
    pub monotonic_ns: u64,
    pub wall_time: DateTime<Utc>,
    pub snapshot_id: Option<String>,
    pub parent_snapshot_id: Option<String>,
    pub instance_id: Option<String>,
    pub source_module: Option<String>,
    pub attempt_count: u32,
    pub history: Vec<WireTransition>,
    pub context_data: HashMap<String, String>,
    pub state_metadata: HashMap<String, String>,
}

impl Default for WireSnapshot {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            version: 0,
            state: FsmState::Unspecified.code(),
            prev_state: None,
            reason: String::new(),
            monotonic_ns: 0,
            wall_time: DateTime::<Utc>::default(),
            snapshot_id: None,
            parent_snapshot_id: None,
            instance_id: None,
            source_module: None,
            attempt_count: 0,
            history: Vec::new(),
            context_data: HashMap::new(),
            state_metadata: HashMap::new(),
        }
    }
}

impl From<&Transition> for WireTransition {
    fn from(t: &Transition) -> Self {
        Self {
            from_state: t.from_state.code(),
            to_state: t.to_state.code(),
            trigger: t.trigger.clone(),
            status: t.status.code(),
            error_message: t.error_message.clone(),
            monotonic_ns: t.monotonic_ns,
            wall_time: t.wall_time,
        }
    }
}

impl From<WireTransition> for Transition {
    fn from(w: WireTransition) -> Self {
        // Clocks are kept as sent, zero included.
        Transition {
            from_state: FsmState::from_code(w.from_state),
            to_state: FsmState::from_code(w.to_state),
            trigger: w.trigger,
            status: TransitionStatus::from_code(w.status),
            error_message: w.error_message,
            monotonic_ns: w.monotonic_ns,
            wall_time: w.wall_time,
        }
    }
}

impl From<&Snapshot> for WireSnapshot {
    fn from(s: &Snapshot) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            version: s.version,
            state: s.state.code(),
            prev_state: s.prev_state.map(|p| p.code()),
            reason: s.reason.clone(),
            monotonic_ns: s.monotonic_ns,
            wall_time: s.wall_time,
            snapshot_id: Some(s.snapshot_id.clone()),
            parent_snapshot_id: s.parent_snapshot_id.clone(),
            instance_id: Some(s.instance_id.clone()),
            source_module: Some(s.source_module.clone()),
            attempt_count: s.attempt_count,
            history: s.history.transitions().iter().map(WireTransition::from).collect(),
            context_data: s.context_data.clone(),
            state_metadata: s.state_metadata.clone(),
        }
    }
}

impl From<WireSnapshot> for Snapshot {
    fn from(w: WireSnapshot) -> Self {
        let history: Vec<Transition> = w.history.into_iter().map(Transition::from).collect();
        Snapshot {
            version: w.version,
            state: FsmState::from_code(w.state),
            prev_state: w.prev_state.map(FsmState::from_code),
            reason: w.reason,
            monotonic_ns: w.monotonic_ns,
            wall_time: w.wall_time,
            snapshot_id: w.snapshot_id.unwrap_or_else(new_snapshot_id),
            parent_snapshot_id: w.parent_snapshot_id,
            instance_id: w.instance_id.unwrap_or_else(new_instance_id),
            source_module: w
                .source_module
                .unwrap_or_else(|| DEFAULT_SOURCE_MODULE.to_string()),
            attempt_count: w.attempt_count,
            history: TransitionHistory::from(history),
            context_data: w.context_data,
            state_metadata: w.state_metadata,
        }
    }
}
