//! Guarded transition rules and the standard agent table.

use super::Conditions;
use crate::core::{FsmState, Guard, Trigger};

/// One row of the transition table.
#[derive(Clone, Debug)]
pub struct TransitionRule {
    pub from: FsmState,
    pub to: FsmState,
    pub trigger: Trigger,
    pub guard: Guard<Conditions>,
}

impl TransitionRule {
    pub fn new<F>(from: FsmState, to: FsmState, trigger: Trigger, guard: F) -> Self
    where
        F: Fn(&Conditions) -> bool + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            trigger,
            guard: Guard::new(guard),
        }
    }

    /// Check if this rule fires for the current state and inputs (pure).
    pub fn applies(&self, current: FsmState, conditions: &Conditions) -> bool {
        if current != self.from {
            return false;
        }
        self.guard.check(conditions)
    }
}

/// The agent's transition table, in evaluation order.
///
/// Combinations that match no row fall through to `NO_CHANGE`.
pub fn standard_rules() -> Vec<TransitionRule> {
    use FsmState::*;

    vec![
        TransitionRule::new(Booting, Idle, Trigger::BootComplete, |c| c.bios_ok),
        TransitionRule::new(Booting, Error, Trigger::BiosError, |c| !c.bios_ok),
        TransitionRule::new(Idle, Error, Trigger::BiosError, |c| !c.bios_ok),
        TransitionRule::new(Idle, Active, Trigger::ProposalsReceived, |c| {
            c.bios_ok && c.has_proposals
        }),
        TransitionRule::new(Active, Error, Trigger::BiosError, |c| !c.bios_ok),
        TransitionRule::new(Active, Idle, Trigger::NoProposals, |c| {
            c.bios_ok && !c.has_proposals
        }),
        TransitionRule::new(Error, Idle, Trigger::ErrorCleared, |c| {
            c.bios_ok && !c.has_proposals
        }),
    ]
}
