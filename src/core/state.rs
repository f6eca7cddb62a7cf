//! FSM state, transition status, and trigger labels.
//!
//! These are closed enumerations. Each one has a stable wire name and a
//! stable numeric code so the codec can translate them without guessing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of the agent's finite-state machine.
///
/// There is no total order between states; only the transition table in
/// [`crate::engine`] defines which moves are legal.
///
/// # Example
///
/// ```rust
/// use qcore_state::core::FsmState;
///
/// assert_eq!(FsmState::Error.name(), "ERROR_STATE");
/// assert_eq!(FsmState::from_code(2), FsmState::Idle);
/// assert_eq!(FsmState::from_code(99), FsmState::Unspecified);
/// assert!(FsmState::Error.is_error());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FsmState {
    Unspecified,
    Booting,
    Idle,
    Active,
    #[serde(rename = "ERROR_STATE")]
    Error,
    Shutdown,
}

impl FsmState {
    /// Every state, in wire-code order.
    pub const ALL: [FsmState; 6] = [
        FsmState::Unspecified,
        FsmState::Booting,
        FsmState::Idle,
        FsmState::Active,
        FsmState::Error,
        FsmState::Shutdown,
    ];

    /// Wire name used in logs and the interchange format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Booting => "BOOTING",
            Self::Idle => "IDLE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR_STATE",
            Self::Shutdown => "SHUTDOWN",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Booting => 1,
            Self::Idle => 2,
            Self::Active => 3,
            Self::Error => 4,
            Self::Shutdown => 5,
        }
    }

    /// Decode a wire code. Unknown codes map to [`FsmState::Unspecified`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Booting,
            2 => Self::Idle,
            3 => Self::Active,
            4 => Self::Error,
            5 => Self::Shutdown,
            _ => Self::Unspecified,
        }
    }

    /// Check if this is a terminal state.
    ///
    /// No transition in the standard table leaves `Shutdown`.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome recorded on a [`Transition`](crate::core::Transition).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionStatus {
    Unspecified,
    Success,
    Failed,
    Pending,
}

impl TransitionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Success => 1,
            Self::Failed => 2,
            Self::Pending => 3,
        }
    }

    /// Decode a wire code. Unknown codes map to [`TransitionStatus::Unspecified`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::Failed,
            3 => Self::Pending,
            _ => Self::Unspecified,
        }
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed view of the trigger labels produced by the transition engine.
///
/// Transitions store the label as a plain string so that collaborators can
/// record causes the engine does not know about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Trigger {
    BootComplete,
    BiosError,
    ProposalsReceived,
    NoProposals,
    ErrorCleared,
    NoChange,
    /// The current state is not a position the table knows how to leave.
    TransitionError,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BootComplete => "BOOT_COMPLETE",
            Self::BiosError => "BIOS_ERROR",
            Self::ProposalsReceived => "PROPOSALS_RECEIVED",
            Self::NoProposals => "NO_PROPOSALS",
            Self::ErrorCleared => "ERROR_CLEARED",
            Self::NoChange => "NO_CHANGE",
            Self::TransitionError => "TRANSITION_ERROR",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
