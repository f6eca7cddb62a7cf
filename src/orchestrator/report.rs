//! Per-tick results.

use super::error::PhaseError;
use super::phases::{Decision, Phase};
use crate::core::{FsmState, Snapshot, Trigger};
use std::fmt;
use std::time::Duration;

/// Wall-clock time spent in each phase that ran.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseTimings {
    entries: Vec<(Phase, Duration)>,
}

impl PhaseTimings {
    pub(crate) fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.entries.push((phase, elapsed));
    }

    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, d)| *d)
    }

    /// Phases in the order they ran.
    pub fn phases(&self) -> Vec<Phase> {
        self.entries.iter().map(|(p, _)| *p).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Phase, Duration)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (phase, elapsed)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:.3}ms", phase, elapsed.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}

/// A tick that ran every phase.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub tick_id: u64,
    pub bios_ok: bool,
    pub trigger: Trigger,
    /// The snapshot as committed by the store
    pub snapshot: Snapshot,
    pub proposal_count: usize,
    pub decision: Decision,
    pub timings: PhaseTimings,
    pub total: Duration,
    /// Failed ticks seen so far, this one excluded
    pub cumulative_errors: u64,
}

impl TickReport {
    pub fn state(&self) -> FsmState {
        self.snapshot.state
    }
}

/// A tick aborted by a phase error.
#[derive(Clone, Debug)]
pub struct TickFailure {
    pub tick_id: u64,
    pub phase: Phase,
    pub error: PhaseError,
    /// Whether the safe-mode controller acknowledged the request
    pub safe_mode_engaged: bool,
    pub timings: PhaseTimings,
    pub total: Duration,
    /// Failed ticks so far, this one included
    pub cumulative_errors: u64,
}

/// What [`CycleOrchestrator::run_tick`](super::CycleOrchestrator::run_tick)
/// produced.
#[derive(Clone, Debug)]
pub enum TickOutcome {
    Completed(TickReport),
    /// The tick failed and the recovery path ran.
    Recovered(TickFailure),
}

impl TickOutcome {
    pub fn tick_id(&self) -> u64 {
        match self {
            TickOutcome::Completed(report) => report.tick_id,
            TickOutcome::Recovered(failure) => failure.tick_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TickOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Completed(report) => Some(report),
            TickOutcome::Recovered(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TickFailure> {
        match self {
            TickOutcome::Completed(_) => None,
            TickOutcome::Recovered(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_keep_run_order() {
        let mut timings = PhaseTimings::default();
        timings.record(Phase::UpdateContext, Duration::from_millis(2));
        timings.record(Phase::BiosCheck, Duration::from_micros(1500));

        assert_eq!(timings.phases(), vec![Phase::UpdateContext, Phase::BiosCheck]);
        assert_eq!(timings.get(Phase::BiosCheck), Some(Duration::from_micros(1500)));
        assert_eq!(timings.get(Phase::Fsm), None);
        assert_eq!(
            timings.to_string(),
            "update_context=2.000ms bios_check=1.500ms"
        );
    }
}
