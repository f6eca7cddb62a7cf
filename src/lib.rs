//! qcore-state: versioned agent-state synchronization core
//!
//! The crate keeps one authoritative record of what an agent's finite state
//! machine believes, and drives it forward one decision cycle at a time.
//! It follows a "pure core, imperative shell" split: the data model and the
//! transition engine are pure functions over immutable values, while the
//! store and orchestrator own all concurrency and I/O.
//!
//! # Core Concepts
//!
//! - **Snapshot**: Immutable, versioned description of the FSM at one instant
//! - **Transition Engine**: Total, table-driven `(state, bios_ok, has_proposals) -> (state, trigger)`
//! - **State Store**: Single writer, many readers, bounded fan-out to subscribers
//! - **Cycle Orchestrator**: Runs one tick of phases and recovers from failures
//! - **Codec**: Lossless JSON and binary encodings of snapshots
//!
//! # Example
//!
//! ```rust
//! use qcore_state::core::FsmState;
//! use qcore_state::engine::{Conditions, TransitionEngine};
//! use qcore_state::store::StateStore;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = StateStore::default();
//! let engine = TransitionEngine::new();
//!
//! let current = store.initialize_if_empty().await;
//! let (next, _trigger) = engine.step(&current, &Conditions::new(true, false));
//! let committed = store.set_or_bump(next).await.unwrap();
//!
//! assert_eq!(committed.state, FsmState::Idle);
//! assert_eq!(store.get().unwrap().version, 1);
//! # });
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod engine;
pub mod orchestrator;
pub mod store;

pub use crate::codec::{BinaryCodec, CodecError, JsonCodec, SnapshotCodec};
pub use crate::config::{ConfigError, CoreConfig};
pub use crate::core::{FsmState, Snapshot, Transition, TransitionHistory, TransitionStatus, Trigger};
pub use crate::engine::{derive, Conditions, TransitionEngine};
pub use crate::orchestrator::{
    Collaborators, CycleConfig, CycleOrchestrator, PhaseError, TickOutcome,
};
pub use crate::store::{StateStore, StoreConfig, StoreError, Subscription, VersionPolicy};
