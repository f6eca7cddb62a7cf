//! Pure derivation of the next snapshot from the current one.

use crate::core::clock::{monotonic_ns, wall_now};
use crate::core::{new_snapshot_id, FsmState, Snapshot, Transition};

/// Derive a new snapshot from `current`.
///
/// - `version`, `prev_state` and `attempt_count` only move when the state
///   changes.
/// - `transition`, when supplied, is appended to a copy of the history.
/// - `snapshot_id` and both clocks are fresh; `parent_snapshot_id` names
///   `current`; `instance_id` and `source_module` are carried over; maps are
///   copied.
/// - `version` and `attempt_count` saturate at their maximum. The store
///   rejects a saturated version that does not advance.
///
/// This never touches the store.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::{FsmState, Snapshot};
/// use qcore_state::engine::derive;
///
/// let current = Snapshot::cold_start("run");
/// let same = derive(&current, FsmState::Booting, "still booting", None);
/// assert_eq!(same.version, 0);
///
/// let next = derive(&current, FsmState::Idle, "BOOT_COMPLETE", None);
/// assert_eq!(next.version, 1);
/// assert_eq!(next.prev_state, Some(FsmState::Booting));
/// ```
pub fn derive(
    current: &Snapshot,
    next_state: FsmState,
    reason: impl Into<String>,
    transition: Option<Transition>,
) -> Snapshot {
    let changed = next_state != current.state;

    let history = match transition {
        Some(t) => current.history.record(t),
        None => current.history.clone(),
    };

    Snapshot {
        version: if changed {
            current.version.saturating_add(1)
        } else {
            current.version
        },
        state: next_state,
        prev_state: if changed {
            Some(current.state)
        } else {
            current.prev_state
        },
        reason: reason.into(),
        monotonic_ns: monotonic_ns(),
        wall_time: wall_now(),
        snapshot_id: new_snapshot_id(),
        parent_snapshot_id: Some(current.snapshot_id.clone()),
        instance_id: current.instance_id.clone(),
        source_module: current.source_module.clone(),
        attempt_count: if changed {
            current.attempt_count.saturating_add(1)
        } else {
            current.attempt_count
        },
        history,
        context_data: current.context_data.clone(),
        state_metadata: current.state_metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionStatus;

    fn boot_transition() -> Transition {
        Transition::new(
            FsmState::Booting,
            FsmState::Idle,
            "BOOT_COMPLETE",
            TransitionStatus::Success,
        )
    }

    #[test]
    fn state_change_bumps_version_and_attempts() {
        let current = Snapshot::cold_start("run");
        let next = derive(
            &current,
            FsmState::Idle,
            "BOOT_COMPLETE",
            Some(boot_transition()),
        );

        assert_eq!(next.version, 1);
        assert_eq!(next.attempt_count, 1);
        assert_eq!(next.prev_state, Some(FsmState::Booting));
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.reason, "BOOT_COMPLETE");
    }

    #[test]
    fn no_change_keeps_version_and_prev_state() {
        let booted = derive(
            &Snapshot::cold_start("run"),
            FsmState::Idle,
            "BOOT_COMPLETE",
            Some(boot_transition()),
        );
        let same = derive(&booted, FsmState::Idle, "NO_CHANGE", None);

        assert_eq!(same.version, booted.version);
        assert_eq!(same.attempt_count, booted.attempt_count);
        assert_eq!(same.prev_state, Some(FsmState::Booting));
        assert_eq!(same.history.len(), 1);
    }

    #[test]
    fn ids_are_fresh_but_instance_is_carried() {
        let current = Snapshot::cold_start("run-7");
        let next = derive(&current, FsmState::Idle, "BOOT_COMPLETE", None);

        assert_ne!(next.snapshot_id, current.snapshot_id);
        assert!(next.is_derived_from(&current));
        assert_eq!(next.instance_id, "run-7");
        assert_eq!(next.source_module, current.source_module);
    }

    #[test]
    fn derivation_does_not_touch_input() {
        let current = Snapshot::cold_start("run").with_context("k", "v");
        let before = current.clone();
        let mut next = derive(
            &current,
            FsmState::Error,
            "BIOS_ERROR",
            Some(boot_transition()),
        );
        next.context_data.insert("k".into(), "changed".into());

        assert_eq!(current, before);
        assert_eq!(current.context_data["k"], "v");
    }

    #[test]
    fn transition_without_state_change_still_recorded() {
        let current = Snapshot::cold_start("run");
        let failed = Transition::new(
            FsmState::Booting,
            FsmState::Booting,
            "TRANSITION_ERROR",
            TransitionStatus::Failed,
        );
        let next = derive(&current, FsmState::Booting, "TRANSITION_ERROR", Some(failed));

        assert_eq!(next.version, 0);
        assert_eq!(next.history.len(), 1);
    }

    #[test]
    fn counters_saturate_at_maximum() {
        let mut current = Snapshot::new(FsmState::Idle, "idle");
        current.version = u64::MAX;
        current.attempt_count = u32::MAX;

        let next = derive(&current, FsmState::Active, "PROPOSALS_READY", None);

        assert_eq!(next.version, u64::MAX);
        assert_eq!(next.attempt_count, u32::MAX);
        assert_eq!(next.prev_state, Some(FsmState::Idle));
    }
}
