//! Core value types of the FSM.
//!
//! This module contains the pure data model:
//! - FSM states, transition statuses, and trigger labels
//! - Immutable transitions and the append-only history
//! - Immutable snapshots
//! - Guard predicates used by the transition table
//!
//! Nothing in this module performs I/O or holds shared state.

pub mod clock;
mod guard;
mod history;
mod snapshot;
mod state;

pub use guard::Guard;
pub use history::{Transition, TransitionHistory};
pub use snapshot::{
    new_instance_id, new_snapshot_id, Snapshot, COLD_START_REASON, DEFAULT_SOURCE_MODULE,
};
pub use state::{FsmState, Trigger, TransitionStatus};
