//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding snapshots
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Encoding to JSON or binary failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Input could not be decoded as a wire snapshot
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Input was written by a newer format than this build understands
    #[error("Unsupported wire format version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
