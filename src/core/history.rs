//! Transition records and the append-only history carried by snapshots.
//!
//! Provides immutable tracking of FSM transitions over time, following
//! functional programming principles: recording returns a new history.

use super::clock::{monotonic_ns, wall_now};
use super::state::{FsmState, TransitionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state change, or an attempted one.
///
/// Transitions are immutable values. A changed fact is represented by a new
/// `Transition`, never by editing an existing one.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::{FsmState, Transition, TransitionStatus};
///
/// let transition = Transition::new(
///     FsmState::Booting,
///     FsmState::Idle,
///     "BOOT_COMPLETE",
///     TransitionStatus::Success,
/// );
/// assert!(transition.monotonic_ns > 0);
/// assert!(transition.error_message.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from_state: FsmState,
    pub to_state: FsmState,
    /// Label identifying the cause, e.g. `BOOT_COMPLETE`
    pub trigger: String,
    pub status: TransitionStatus,
    /// Empty when not applicable
    pub error_message: String,
    pub monotonic_ns: u64,
    pub wall_time: DateTime<Utc>,
}

impl Transition {
    /// Create a transition stamped with the current time on both clocks.
    pub fn new(
        from_state: FsmState,
        to_state: FsmState,
        trigger: impl Into<String>,
        status: TransitionStatus,
    ) -> Self {
        Self {
            from_state,
            to_state,
            trigger: trigger.into(),
            status,
            error_message: String::new(),
            monotonic_ns: monotonic_ns(),
            wall_time: wall_now(),
        }
    }

    /// Create a transition with explicit timestamps.
    ///
    /// A zero monotonic value or a Unix-epoch wall time is replaced with
    /// "now", matching the defaults of [`Transition::new`].
    pub fn at(
        from_state: FsmState,
        to_state: FsmState,
        trigger: impl Into<String>,
        status: TransitionStatus,
        monotonic: u64,
        wall_time: DateTime<Utc>,
    ) -> Self {
        Self {
            from_state,
            to_state,
            trigger: trigger.into(),
            status,
            error_message: String::new(),
            monotonic_ns: if monotonic == 0 { monotonic_ns() } else { monotonic },
            wall_time: if wall_time.timestamp() == 0 && wall_time.timestamp_subsec_nanos() == 0 {
                wall_now()
            } else {
                wall_time
            },
        }
    }

    /// Return a copy carrying an error message, typically with `Failed` status.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            ..self
        }
    }

    /// Check if the transition actually moved the FSM.
    pub fn changes_state(&self) -> bool {
        self.from_state != self.to_state
    }
}

/// Ordered history of transitions.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::{FsmState, Transition, TransitionHistory, TransitionStatus};
///
/// let history = TransitionHistory::new();
/// let history = history.record(Transition::new(
///     FsmState::Booting,
///     FsmState::Idle,
///     "BOOT_COMPLETE",
///     TransitionStatus::Success,
/// ));
/// let history = history.record(Transition::new(
///     FsmState::Idle,
///     FsmState::Active,
///     "PROPOSALS_RECEIVED",
///     TransitionStatus::Success,
/// ));
///
/// let path = history.get_path();
/// assert_eq!(path, vec![FsmState::Booting, FsmState::Idle, FsmState::Active]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<Transition>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: Transition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed.
    ///
    /// Returns the first transition's `from` state followed by the `to`
    /// state of each transition.
    pub fn get_path(&self) -> Vec<FsmState> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(first.from_state);
        }
        path.extend(self.transitions.iter().map(|t| t.to_state));
        path
    }

    /// Wall-clock span from the first to the last transition.
    ///
    /// Returns `None` if there are no transitions or if the wall clock went
    /// backwards between them.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.wall_time.signed_duration_since(first.wall_time);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn last(&self) -> Option<&Transition> {
        self.transitions.last()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl From<Vec<Transition>> for TransitionHistory {
    fn from(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }
}
