//! The FSM transition engine.
//!
//! `compute` maps the current state and the tick's environmental flags to
//! the next state and a trigger label. It is total: every input yields
//! exactly one answer, including "no change". `derive` turns that answer
//! into a new immutable snapshot.
//!
//! The engine holds only its immutable rule table, so one instance can be
//! shared across tasks.

mod derive;
mod rules;

pub use derive::derive;
pub use rules::{standard_rules, TransitionRule};

use crate::core::{FsmState, Snapshot, Transition, TransitionStatus, Trigger};

/// Environmental inputs for one FSM decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Conditions {
    pub bios_ok: bool,
    pub has_proposals: bool,
}

impl Conditions {
    pub fn new(bios_ok: bool, has_proposals: bool) -> Self {
        Self {
            bios_ok,
            has_proposals,
        }
    }
}

/// Stateless evaluator for a transition table.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::{FsmState, Trigger};
/// use qcore_state::engine::TransitionEngine;
///
/// let engine = TransitionEngine::new();
/// let (next, trigger) = engine.compute(FsmState::Booting, true, false);
/// assert_eq!(next, FsmState::Idle);
/// assert_eq!(trigger, Trigger::BootComplete);
/// ```
#[derive(Clone, Debug)]
pub struct TransitionEngine {
    rules: Vec<TransitionRule>,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionEngine {
    /// Engine over the standard agent table.
    pub fn new() -> Self {
        Self::with_rules(standard_rules())
    }

    pub fn with_rules(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Compute the next state and trigger.
    ///
    /// An `Unspecified` current state cannot be reasoned about; it yields
    /// `(current, TransitionError)` and a warning.
    pub fn compute(
        &self,
        current: FsmState,
        bios_ok: bool,
        has_proposals: bool,
    ) -> (FsmState, Trigger) {
        self.compute_with(current, &Conditions::new(bios_ok, has_proposals))
    }

    pub fn compute_with(&self, current: FsmState, conditions: &Conditions) -> (FsmState, Trigger) {
        if current == FsmState::Unspecified {
            tracing::warn!(
                state = %current,
                bios_ok = conditions.bios_ok,
                has_proposals = conditions.has_proposals,
                "Unrecognized FSM state, holding position"
            );
            return (current, Trigger::TransitionError);
        }

        self.rules
            .iter()
            .find(|rule| rule.applies(current, conditions))
            .map(|rule| (rule.to, rule.trigger))
            .unwrap_or((current, Trigger::NoChange))
    }

    /// Build the transition record for a computed move.
    ///
    /// `TransitionError` is recorded as `Failed`; everything else as
    /// `Success`.
    pub fn transition_for(&self, from: FsmState, to: FsmState, trigger: Trigger) -> Transition {
        match trigger {
            Trigger::TransitionError => {
                Transition::new(from, to, trigger.as_str(), TransitionStatus::Failed)
                    .with_error(format!("no transition defined from state {from}"))
            }
            _ => Transition::new(from, to, trigger.as_str(), TransitionStatus::Success),
        }
    }

    /// Run one full decision against `current`, returning the derived
    /// snapshot and the trigger that produced it.
    ///
    /// A transition is appended to the history only when the state moves.
    pub fn step(&self, current: &Snapshot, conditions: &Conditions) -> (Snapshot, Trigger) {
        let (next_state, trigger) = self.compute_with(current.state, conditions);
        let transition = (next_state != current.state)
            .then(|| self.transition_for(current.state, next_state, trigger));
        let next = derive(current, next_state, trigger.as_str(), transition);
        (next, trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TransitionEngine {
        TransitionEngine::new()
    }

    #[test]
    fn booting_transitions() {
        assert_eq!(
            engine().compute(FsmState::Booting, true, false),
            (FsmState::Idle, Trigger::BootComplete)
        );
        assert_eq!(
            engine().compute(FsmState::Booting, true, true),
            (FsmState::Idle, Trigger::BootComplete)
        );
        assert_eq!(
            engine().compute(FsmState::Booting, false, true),
            (FsmState::Error, Trigger::BiosError)
        );
    }

    #[test]
    fn idle_transitions() {
        assert_eq!(
            engine().compute(FsmState::Idle, false, false),
            (FsmState::Error, Trigger::BiosError)
        );
        assert_eq!(
            engine().compute(FsmState::Idle, true, true),
            (FsmState::Active, Trigger::ProposalsReceived)
        );
        assert_eq!(
            engine().compute(FsmState::Idle, true, false),
            (FsmState::Idle, Trigger::NoChange)
        );
    }

    #[test]
    fn active_transitions() {
        assert_eq!(
            engine().compute(FsmState::Active, false, true),
            (FsmState::Error, Trigger::BiosError)
        );
        assert_eq!(
            engine().compute(FsmState::Active, true, false),
            (FsmState::Idle, Trigger::NoProposals)
        );
        assert_eq!(
            engine().compute(FsmState::Active, true, true),
            (FsmState::Active, Trigger::NoChange)
        );
    }

    #[test]
    fn error_transitions() {
        assert_eq!(
            engine().compute(FsmState::Error, true, false),
            (FsmState::Idle, Trigger::ErrorCleared)
        );
        assert_eq!(
            engine().compute(FsmState::Error, true, true),
            (FsmState::Error, Trigger::NoChange)
        );
        assert_eq!(
            engine().compute(FsmState::Error, false, false),
            (FsmState::Error, Trigger::NoChange)
        );
    }

    #[test]
    fn full_transition_table() {
        use FsmState::*;
        use Trigger::*;

        #[rustfmt::skip]
        let table = [
            // state,  bios_ok, has_proposals, next, trigger
            (Booting, true,  true,  Idle,     BootComplete),
            (Booting, true,  false, Idle,     BootComplete),
            (Booting, false, true,  Error,    BiosError),
            (Booting, false, false, Error,    BiosError),
            (Idle,    true,  true,  Active,   ProposalsReceived),
            (Idle,    true,  false, Idle,     NoChange),
            (Idle,    false, true,  Error,    BiosError),
            (Idle,    false, false, Error,    BiosError),
            (Active,  true,  true,  Active,   NoChange),
            (Active,  true,  false, Idle,     NoProposals),
            (Active,  false, true,  Error,    BiosError),
            (Active,  false, false, Error,    BiosError),
            (Error,   true,  true,  Error,    NoChange),
            (Error,   true,  false, Idle,     ErrorCleared),
            (Error,   false, true,  Error,    NoChange),
            (Error,   false, false, Error,    NoChange),
            (Shutdown, true,  true,  Shutdown, NoChange),
            (Shutdown, true,  false, Shutdown, NoChange),
            (Shutdown, false, true,  Shutdown, NoChange),
            (Shutdown, false, false, Shutdown, NoChange),
        ];

        for (state, bios_ok, has_proposals, next, trigger) in table {
            assert_eq!(
                engine().compute(state, bios_ok, has_proposals),
                (next, trigger),
                "{state:?} bios_ok={bios_ok} has_proposals={has_proposals}"
            );
        }

        for (bios_ok, has_proposals) in [(true, true), (true, false), (false, true), (false, false)]
        {
            assert_eq!(
                engine().compute(Unspecified, bios_ok, has_proposals),
                (Unspecified, TransitionError)
            );
        }
    }

    #[test]
    fn shutdown_never_moves() {
        for (bios_ok, has_proposals) in [(true, true), (true, false), (false, true), (false, false)]
        {
            assert_eq!(
                engine().compute(FsmState::Shutdown, bios_ok, has_proposals),
                (FsmState::Shutdown, Trigger::NoChange)
            );
        }
    }

    #[test]
    fn unspecified_is_a_transition_error() {
        assert_eq!(
            engine().compute(FsmState::Unspecified, true, false),
            (FsmState::Unspecified, Trigger::TransitionError)
        );
    }

    #[test]
    fn transition_for_records_failure_on_error_trigger() {
        let t = engine().transition_for(
            FsmState::Unspecified,
            FsmState::Unspecified,
            Trigger::TransitionError,
        );
        assert_eq!(t.status, TransitionStatus::Failed);
        assert!(t.error_message.contains("UNSPECIFIED"));

        let ok = engine().transition_for(FsmState::Booting, FsmState::Idle, Trigger::BootComplete);
        assert_eq!(ok.status, TransitionStatus::Success);
        assert_eq!(ok.trigger, "BOOT_COMPLETE");
    }

    #[test]
    fn step_appends_history_only_on_change() {
        let cold = Snapshot::cold_start("run");
        let (booted, trigger) = engine().step(&cold, &Conditions::new(true, false));
        assert_eq!(trigger, Trigger::BootComplete);
        assert_eq!(booted.version, 1);
        assert_eq!(booted.history.len(), 1);

        let (same, trigger) = engine().step(&booted, &Conditions::new(true, false));
        assert_eq!(trigger, Trigger::NoChange);
        assert_eq!(same.version, 1);
        assert_eq!(same.history.len(), 1);
    }

    #[test]
    fn custom_rules_replace_the_table() {
        let engine = TransitionEngine::with_rules(vec![TransitionRule::new(
            FsmState::Idle,
            FsmState::Shutdown,
            Trigger::NoProposals,
            |c| !c.has_proposals,
        )]);

        assert_eq!(
            engine.compute(FsmState::Idle, true, false),
            (FsmState::Shutdown, Trigger::NoProposals)
        );
        assert_eq!(
            engine.compute(FsmState::Booting, true, false),
            (FsmState::Booting, Trigger::NoChange)
        );
    }
}
