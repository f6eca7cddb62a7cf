//! Tick phases and the collaborator seams the orchestrator calls out to.

use super::error::{CollaboratorError, PhaseError};
use crate::core::Snapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result type returned by collaborators.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// The steps of one tick, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    UpdateContext,
    BiosCheck,
    Fsm,
    EvaluateProposals,
    MakeDecision,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::UpdateContext,
        Phase::BiosCheck,
        Phase::Fsm,
        Phase::EvaluateProposals,
        Phase::MakeDecision,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::UpdateContext => "update_context",
            Phase::BiosCheck => "bios_check",
            Phase::Fsm => "fsm",
            Phase::EvaluateProposals => "evaluate_proposals",
            Phase::MakeDecision => "make_decision",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A candidate action produced outside this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub action: String,
    pub score: f64,
}

impl Proposal {
    pub fn new(id: impl Into<String>, action: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            score,
        }
    }
}

/// Inputs gathered at the start of a tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickContext {
    pub proposals: Vec<Proposal>,
    pub sensors: HashMap<String, String>,
}

impl TickContext {
    pub fn with_proposals(proposals: Vec<Proposal>) -> Self {
        Self {
            proposals,
            ..Self::default()
        }
    }

    pub fn has_proposals(&self) -> bool {
        !self.proposals.is_empty()
    }
}

/// What the decision phase chose to do this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Keep the current actuation.
    Hold,
    Execute(Proposal),
}

/// Pulls sensor and proposal context for a tick.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn update_context(&self, tick_id: u64) -> CollaboratorResult<TickContext>;
}

/// Platform health check feeding `bios_ok`.
#[async_trait]
pub trait BiosChecker: Send + Sync {
    async fn check(&self, context: &TickContext) -> CollaboratorResult<bool>;
}

/// Ranks the tick's proposals against the committed snapshot.
#[async_trait]
pub trait ProposalEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        snapshot: &Snapshot,
        context: &TickContext,
    ) -> CollaboratorResult<Vec<Proposal>>;
}

#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(&self, snapshot: &Snapshot, ranked: &[Proposal])
        -> CollaboratorResult<Decision>;
}

/// Puts actuation into a hold/neutral state after a failed tick.
#[async_trait]
pub trait SafeModeController: Send + Sync {
    async fn engage(&self, tick_id: u64, cause: &PhaseError) -> CollaboratorResult<()>;
}

/// Everything the orchestrator delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub context: Arc<dyn ContextProvider>,
    pub bios: Arc<dyn BiosChecker>,
    pub evaluator: Arc<dyn ProposalEvaluator>,
    pub decision: Arc<dyn DecisionMaker>,
    pub safe_mode: Arc<dyn SafeModeController>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
