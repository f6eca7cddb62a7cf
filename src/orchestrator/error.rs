use super::phases::Phase;
use crate::store::StoreError;
use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for CollaboratorError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CollaboratorError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Error that aborted a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseError {
    #[error("{phase} phase failed: {message}")]
    Collaborator { phase: Phase, message: String },

    #[error("store rejected snapshot: {0}")]
    Store(#[from] StoreError),
}

impl PhaseError {
    pub fn collaborator(phase: Phase, source: CollaboratorError) -> Self {
        PhaseError::Collaborator {
            phase,
            message: source.0,
        }
    }

    /// The phase the error was raised in.
    pub fn phase(&self) -> Phase {
        match self {
            PhaseError::Collaborator { phase, .. } => *phase,
            PhaseError::Store(_) => Phase::Fsm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_belong_to_fsm_phase() {
        let err = PhaseError::from(StoreError::VersionConflict {
            candidate: 3,
            current: 4,
        });
        assert_eq!(err.phase(), Phase::Fsm);
        assert!(err.to_string().contains("version 3"));
    }

    #[test]
    fn collaborator_errors_name_their_phase() {
        let err = PhaseError::collaborator(Phase::BiosCheck, "sensor bus timeout".into());
        assert_eq!(err.phase(), Phase::BiosCheck);
        assert_eq!(err.to_string(), "bios_check phase failed: sensor bus timeout");
    }
}
