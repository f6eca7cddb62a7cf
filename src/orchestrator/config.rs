use crate::store::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_RECOVERY_DELAY_MS: u64 = 1_000;

/// Tunables for [`CycleOrchestrator`](super::CycleOrchestrator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Period the enclosing process invokes `run_tick` on
    pub tick_interval_ms: u64,
    /// Pause after a failed tick before returning
    pub recovery_delay_ms: u64,
    /// Policy used when the FSM phase commits to the store
    pub version_policy: VersionPolicy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            recovery_delay_ms: DEFAULT_RECOVERY_DELAY_MS,
            version_policy: VersionPolicy::default(),
        }
    }
}

impl CycleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}
