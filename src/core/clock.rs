//! Process-local clocks for snapshots and transitions.
//!
//! The monotonic clock is used for ordering and duration math; the wall
//! clock only for human-readable logs.

use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds elapsed since the first clock read in this process.
///
/// Never returns zero, so zero can mean "not set".
pub fn monotonic_ns() -> u64 {
    let anchor = ANCHOR.get_or_init(Instant::now);
    let elapsed = anchor.elapsed().as_nanos();
    u64::try_from(elapsed).unwrap_or(u64::MAX).max(1)
}

pub fn wall_now() -> DateTime<Utc> {
    Utc::now()
}
