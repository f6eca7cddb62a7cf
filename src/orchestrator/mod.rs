//! Per-tick phase sequencing with failure recovery.
//!
//! [`CycleOrchestrator::run_tick`] is the unit of work: it runs the five
//! phases in order, treats the store and engine pair as the authoritative
//! FSM, and delegates everything else to [`Collaborators`]. It runs no loop
//! of its own; the caller invokes it every `tick_interval` and handles
//! shutdown between ticks.
//!
//! A phase error aborts the rest of the tick. The orchestrator counts it,
//! asks the safe-mode controller to hold, waits `recovery_delay` and returns
//! [`TickOutcome::Recovered`]. Nothing escapes the tick boundary.

mod config;
mod error;
mod phases;
mod report;

pub use config::{CycleConfig, DEFAULT_RECOVERY_DELAY_MS, DEFAULT_TICK_INTERVAL_MS};
pub use error::{CollaboratorError, PhaseError};
pub use phases::{
    BiosChecker, CollaboratorResult, Collaborators, ContextProvider, Decision, DecisionMaker,
    Phase, Proposal, ProposalEvaluator, SafeModeController, TickContext,
};
pub use report::{PhaseTimings, TickFailure, TickOutcome, TickReport};

use crate::core::{FsmState, Snapshot, Trigger};
use crate::engine::{Conditions, TransitionEngine};
use crate::store::StateStore;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Counters across all ticks run so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrchestratorStats {
    pub ticks: u64,
    pub errors: u64,
    pub consecutive_errors: u64,
    /// State committed by the last completed tick
    pub last_state: Option<FsmState>,
}

/// Results of the phases of a tick that ran to the end.
struct PhaseResults {
    bios_ok: bool,
    trigger: Trigger,
    snapshot: Snapshot,
    proposal_count: usize,
    decision: Decision,
}

/// Drives one decision cycle at a time against a shared store.
pub struct CycleOrchestrator {
    store: Arc<StateStore>,
    engine: TransitionEngine,
    collaborators: Collaborators,
    config: CycleConfig,
    ticks: AtomicU64,
    errors: AtomicU64,
    consecutive_errors: AtomicU64,
    last_state: Mutex<Option<FsmState>>,
}

impl CycleOrchestrator {
    pub fn new(store: Arc<StateStore>, collaborators: Collaborators, config: CycleConfig) -> Self {
        Self::with_engine(store, TransitionEngine::new(), collaborators, config)
    }

    pub fn with_engine(
        store: Arc<StateStore>,
        engine: TransitionEngine,
        collaborators: Collaborators,
        config: CycleConfig,
    ) -> Self {
        Self {
            store,
            engine,
            collaborators,
            config,
            ticks: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            consecutive_errors: AtomicU64::new(0),
            last_state: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            consecutive_errors: self.consecutive_errors.load(Ordering::Relaxed),
            last_state: *self.last_state.lock(),
        }
    }

    /// Run one tick to completion or to its first error.
    pub async fn run_tick(&self) -> TickOutcome {
        let tick_id = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();
        let mut timings = PhaseTimings::default();

        match self.execute(tick_id, &mut timings).await {
            Ok(results) => {
                self.consecutive_errors.store(0, Ordering::Relaxed);
                *self.last_state.lock() = Some(results.snapshot.state);

                let total = started.elapsed();
                let cumulative_errors = self.errors.load(Ordering::Relaxed);
                info!(
                    tick_id,
                    bios_ok = results.bios_ok,
                    state = %results.snapshot.state,
                    version = results.snapshot.version,
                    trigger = %results.trigger,
                    proposals = results.proposal_count,
                    total_ms = total.as_secs_f64() * 1000.0,
                    phases = %timings,
                    errors = cumulative_errors,
                    "Tick completed"
                );

                TickOutcome::Completed(TickReport {
                    tick_id,
                    bios_ok: results.bios_ok,
                    trigger: results.trigger,
                    snapshot: results.snapshot,
                    proposal_count: results.proposal_count,
                    decision: results.decision,
                    timings,
                    total,
                    cumulative_errors,
                })
            }
            Err(err) => self.recover(tick_id, err, timings, started).await,
        }
    }

    async fn execute(
        &self,
        tick_id: u64,
        timings: &mut PhaseTimings,
    ) -> Result<PhaseResults, PhaseError> {
        let collaborators = &self.collaborators;

        let context = timed(timings, Phase::UpdateContext, async {
            collaborators
                .context
                .update_context(tick_id)
                .await
                .map_err(|e| PhaseError::collaborator(Phase::UpdateContext, e))
        })
        .await?;

        let bios_ok = timed(timings, Phase::BiosCheck, async {
            collaborators
                .bios
                .check(&context)
                .await
                .map_err(|e| PhaseError::collaborator(Phase::BiosCheck, e))
        })
        .await?;

        let has_proposals = context.has_proposals();
        let (snapshot, trigger) = timed(timings, Phase::Fsm, async {
            self.advance_fsm(tick_id, bios_ok, has_proposals).await
        })
        .await?;

        let ranked = timed(timings, Phase::EvaluateProposals, async {
            collaborators
                .evaluator
                .evaluate(&snapshot, &context)
                .await
                .map_err(|e| PhaseError::collaborator(Phase::EvaluateProposals, e))
        })
        .await?;

        let decision = timed(timings, Phase::MakeDecision, async {
            collaborators
                .decision
                .decide(&snapshot, &ranked)
                .await
                .map_err(|e| PhaseError::collaborator(Phase::MakeDecision, e))
        })
        .await?;

        Ok(PhaseResults {
            bios_ok,
            trigger,
            snapshot,
            proposal_count: context.proposals.len(),
            decision,
        })
    }

    /// Read, compute, derive and commit. The committed snapshot is returned.
    async fn advance_fsm(
        &self,
        tick_id: u64,
        bios_ok: bool,
        has_proposals: bool,
    ) -> Result<(Snapshot, Trigger), PhaseError> {
        let current = match self.store.get() {
            Some(snapshot) => snapshot,
            None => self.store.initialize_if_empty().await,
        };

        let conditions = Conditions::new(bios_ok, has_proposals);
        let (next, trigger) = self.engine.step(&current, &conditions);
        if trigger == Trigger::TransitionError {
            warn!(tick_id, state = %current.state, "FSM could not evaluate current state");
        }

        let committed = self.store.set(next, self.config.version_policy).await?;
        if committed.state != current.state {
            debug!(
                tick_id,
                from = %current.state,
                to = %committed.state,
                %trigger,
                version = committed.version,
                "FSM transition committed"
            );
        }

        Ok((committed, trigger))
    }

    async fn recover(
        &self,
        tick_id: u64,
        err: PhaseError,
        timings: PhaseTimings,
        started: Instant,
    ) -> TickOutcome {
        let errors = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
        let consecutive = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
        let phase = err.phase();

        error!(
            tick_id,
            %phase,
            error = %err,
            errors,
            consecutive,
            "Tick failed, entering safe mode"
        );

        let safe_mode_engaged = match self.collaborators.safe_mode.engage(tick_id, &err).await {
            Ok(()) => true,
            Err(engage_err) => {
                error!(tick_id, error = %engage_err, "Safe mode controller failed");
                false
            }
        };

        let delay = self.config.recovery_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        TickOutcome::Recovered(TickFailure {
            tick_id,
            phase,
            error: err,
            safe_mode_engaged,
            timings,
            total: started.elapsed(),
            cumulative_errors: errors,
        })
    }
}

async fn timed<T, F>(timings: &mut PhaseTimings, phase: Phase, work: F) -> Result<T, PhaseError>
where
    F: Future<Output = Result<T, PhaseError>>,
{
    let started = Instant::now();
    let result = work.await;
    timings.record(phase, started.elapsed());
    result
}
