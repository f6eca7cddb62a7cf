//! Store configuration and version policy.

use super::health::HealthThresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 25;
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 32;

/// How `set` treats a candidate whose version does not advance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Reject with [`StoreError::VersionConflict`](super::StoreError::VersionConflict).
    Strict,
    /// Rewrite the version to `current + 1` and count the conflict.
    #[default]
    Repair,
}

/// Tunables for one [`StateStore`](super::StateStore).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Default bounded queue size per subscriber
    pub queue_capacity: usize,
    /// Longest a single fan-out send may wait on a full queue
    pub notify_timeout_ms: u64,
    pub max_subscribers: usize,
    pub health: HealthThresholds,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            notify_timeout_ms: DEFAULT_NOTIFY_TIMEOUT_MS,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            health: HealthThresholds::default(),
        }
    }
}

impl StoreConfig {
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}
