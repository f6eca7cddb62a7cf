//! Operational counters for the state store.

use crate::core::FsmState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mutable counters kept under the store lock.
#[derive(Clone, Debug, Default)]
pub(crate) struct Counters {
    pub(crate) total_sets: u64,
    pub(crate) total_gets: u64,
    pub(crate) version_conflicts: u64,
    pub(crate) rejected_sets: u64,
    pub(crate) refreshes: u64,
    pub(crate) notifications_delivered: u64,
    pub(crate) notifications_missed: u64,
    pub(crate) subscribers_pruned: u64,
}

/// Point-in-time view of store activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreMetrics {
    /// Successful commits, including refreshes
    pub total_sets: u64,
    pub total_gets: u64,
    /// Non-advancing candidates, whether repaired or rejected
    pub version_conflicts: u64,
    /// Candidates refused by strict mode
    pub rejected_sets: u64,
    /// Same-version, same-state commits that were not fanned out
    pub refreshes: u64,
    pub notifications_delivered: u64,
    pub notifications_missed: u64,
    pub subscribers_pruned: u64,
    pub active_subscribers: usize,
    pub max_subscribers: usize,
    pub uptime: Duration,
    pub last_update_age: Option<Duration>,
    pub last_update_wall: Option<DateTime<Utc>>,
    pub current_version: Option<u64>,
    pub current_state: Option<FsmState>,
}

impl StoreMetrics {
    /// Fraction of set attempts that carried a non-advancing version.
    pub fn conflict_ratio(&self) -> f64 {
        ratio(self.version_conflicts, self.total_sets + self.rejected_sets)
    }

    /// Fraction of fan-out sends that timed out.
    pub fn missed_ratio(&self) -> f64 {
        ratio(
            self.notifications_missed,
            self.notifications_delivered + self.notifications_missed,
        )
    }

    /// Fraction of subscriber slots in use.
    pub fn subscriber_saturation(&self) -> f64 {
        ratio(self.active_subscribers as u64, self.max_subscribers as u64)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
