//! Wire codec for snapshots.
//!
//! Translates a [`Snapshot`] to and from a versioned interchange envelope,
//! [`WireSnapshot`], in two encodings: JSON for humans and tooling, bincode
//! for compact transport. Round-trips are lossless for every snapshot field
//! including the transition history.
//!
//! # Example
//!
//! ```rust
//! use qcore_state::codec::{JsonCodec, SnapshotCodec};
//! use qcore_state::core::Snapshot;
//!
//! let snapshot = Snapshot::cold_start("run-1").with_context("site", "pad-39A");
//! let codec = JsonCodec::default();
//!
//! let bytes = codec.encode(&snapshot).unwrap();
//! let restored = codec.decode(&bytes).unwrap();
//! assert_eq!(restored, snapshot);
//! ```

pub mod error;
mod wire;

pub use error::CodecError;
pub use wire::{WireSnapshot, WireTransition};

use crate::core::Snapshot;
use serde::Deserialize;

/// Current wire format version.
pub const FORMAT_VERSION: u32 = 1;

/// Replaceable translation between snapshots and bytes.
pub trait SnapshotCodec: Send + Sync {
    /// Short name for logs, e.g. `"json"`.
    fn name(&self) -> &'static str;

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot, CodecError>;
}

/// JSON encoding. Unknown fields are ignored and missing ones defaulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

#[derive(Deserialize)]
struct FormatHeader {
    #[serde(default = "current_format")]
    format_version: u32,
}

fn current_format() -> u32 {
    FORMAT_VERSION
}

impl SnapshotCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, CodecError> {
        let wire = WireSnapshot::from(snapshot);
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&wire)
        } else {
            serde_json::to_vec(&wire)
        };
        encoded.map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot, CodecError> {
        let header: FormatHeader = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        check_version(header.format_version)?;

        let wire: WireSnapshot = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        Ok(Snapshot::from(wire))
    }
}

/// Compact bincode encoding.
///
/// The format version is the leading field, so it can be checked before
/// the rest of the payload is interpreted.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCodec;

impl SnapshotCodec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(&WireSnapshot::from(snapshot))
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot, CodecError> {
        let format_version: u32 = bincode::deserialize(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        check_version(format_version)?;

        let wire: WireSnapshot = bincode::deserialize(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        Ok(Snapshot::from(wire))
    }
}

fn check_version(found: u32) -> Result<(), CodecError> {
    if found > FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        });
    }
    Ok(())
}
