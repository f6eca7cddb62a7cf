//! Store error types.

use thiserror::Error;

/// Structural errors surfaced synchronously by [`StateStore`](super::StateStore).
///
/// These are caller mistakes or explicit policy violations, never transient
/// conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The candidate snapshot or a call argument is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Strict mode rejected a candidate whose version does not advance
    #[error("Version conflict: candidate version {candidate} does not exceed current version {current}")]
    VersionConflict { candidate: u64, current: u64 },

    /// The configured maximum number of subscribers is already registered
    #[error("Subscriber limit exceeded: {limit} subscribers already registered")]
    SubscriberLimitExceeded { limit: usize },
}
