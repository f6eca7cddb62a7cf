//! Drive the cycle orchestrator on a fixed tick with simulated collaborators.
//!
//! ```text
//! RUST_LOG=debug cargo run --example agent_cycle
//! ```
//!
//! An optional first argument names a TOML file in the `CoreConfig` layout.
//! The loop stops on Ctrl-C between ticks, or after 40 ticks.

use async_trait::async_trait;
use qcore_state::codec::{JsonCodec, SnapshotCodec};
use qcore_state::config::CoreConfig;
use qcore_state::core::{FsmState, Snapshot};
use qcore_state::orchestrator::{
    BiosChecker, CollaboratorError, CollaboratorResult, Collaborators, ContextProvider,
    CycleOrchestrator, Decision, DecisionMaker, PhaseError, Proposal, ProposalEvaluator,
    SafeModeController, TickContext, TickOutcome,
};
use qcore_state::store::StateStore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_TICKS: u64 = 40;

/// Deterministic stand-in for sensors, BIOS and the planner.
struct SimulatedPlatform;

#[async_trait]
impl ContextProvider for SimulatedPlatform {
    async fn update_context(&self, tick_id: u64) -> CollaboratorResult<TickContext> {
        let mut context = TickContext::default();
        if tick_id % 5 >= 2 {
            context.proposals.push(Proposal::new(
                format!("survey-{tick_id}"),
                "survey",
                (tick_id % 10) as f64 / 10.0,
            ));
        }
        context
            .sensors
            .insert("battery".to_string(), format!("{}%", 100 - tick_id % 30));
        Ok(context)
    }
}

#[async_trait]
impl BiosChecker for SimulatedPlatform {
    async fn check(&self, context: &TickContext) -> CollaboratorResult<bool> {
        match context.sensors.get("battery").map(String::as_str) {
            Some("77%") => Err(CollaboratorError::new("power rail telemetry dropped")),
            Some("80%") | Some("79%") => Ok(false),
            _ => Ok(true),
        }
    }
}

#[async_trait]
impl ProposalEvaluator for SimulatedPlatform {
    async fn evaluate(
        &self,
        _snapshot: &Snapshot,
        context: &TickContext,
    ) -> CollaboratorResult<Vec<Proposal>> {
        let mut ranked = context.proposals.clone();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

#[async_trait]
impl DecisionMaker for SimulatedPlatform {
    async fn decide(&self, snapshot: &Snapshot, ranked: &[Proposal]) -> CollaboratorResult<Decision> {
        Ok(match (snapshot.state, ranked.first()) {
            (FsmState::Active, Some(best)) => Decision::Execute(best.clone()),
            _ => Decision::Hold,
        })
    }
}

#[async_trait]
impl SafeModeController for SimulatedPlatform {
    async fn engage(&self, tick_id: u64, cause: &PhaseError) -> CollaboratorResult<()> {
        warn!(tick_id, %cause, "Actuators commanded to neutral");
        Ok(())
    }
}

fn load_config() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(CoreConfig::from_toml_str(&std::fs::read_to_string(path)?)?),
        None => Ok(CoreConfig {
            cycle: qcore_state::orchestrator::CycleConfig {
                tick_interval_ms: 200,
                recovery_delay_ms: 300,
                ..Default::default()
            },
            ..Default::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,qcore_state=info,agent_cycle=info")),
        )
        .init();

    let config = load_config()?;
    let store = Arc::new(StateStore::new(config.store.clone()));

    // Telemetry feed: encode every committed snapshot as it arrives.
    let mut feed = store.subscribe("telemetry")?;
    let telemetry = tokio::spawn(async move {
        let codec = JsonCodec::default();
        while let Some(snapshot) = feed.recv().await {
            match codec.encode(&snapshot) {
                Ok(bytes) => info!(
                    version = snapshot.version,
                    state = %snapshot.state,
                    bytes = bytes.len(),
                    "Telemetry frame"
                ),
                Err(err) => warn!(%err, "Failed to encode telemetry frame"),
            }
        }
    });

    let platform = Arc::new(SimulatedPlatform);
    let collaborators = Collaborators {
        context: platform.clone(),
        bios: platform.clone(),
        evaluator: platform.clone(),
        decision: platform.clone(),
        safe_mode: platform,
    };
    let orchestrator =
        CycleOrchestrator::new(Arc::clone(&store), collaborators, config.cycle.clone());

    info!(
        instance_id = store.instance_id(),
        tick_interval_ms = config.cycle.tick_interval_ms,
        version_policy = ?config.cycle.version_policy,
        "Starting agent cycle"
    );

    let mut interval = tokio::time::interval(config.cycle.tick_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            _ = interval.tick() => {
                if let TickOutcome::Recovered(failure) = orchestrator.run_tick().await {
                    warn!(tick_id = failure.tick_id, phase = %failure.phase, "Tick recovered");
                }
                if orchestrator.stats().ticks >= MAX_TICKS {
                    break;
                }
            }
        }
    }

    let stats = orchestrator.stats();
    let health = store.health_check();
    info!(
        ticks = stats.ticks,
        errors = stats.errors,
        last_state = ?stats.last_state,
        healthy = health.healthy,
        warnings = health.warnings.len(),
        "Agent cycle stopped"
    );

    drop(orchestrator);
    telemetry.abort();
    Ok(())
}
