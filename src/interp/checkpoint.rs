//! Checkpoint beans for resuming an exchange in a fresh interpreter.
//!
//! States marked [`resumable`](crate::machine::State::resumable) invoke the
//! interpreter's checkpointer hook on entry with a serializable bean; a new
//! interpreter over the same machine can later pick the exchange up from
//! there via [`Interp::resume`](super::Interp::resume). Durable storage of
//! beans is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Checkpoint format version accepted by this build.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors from checkpoint encoding and decoding.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint serialization failed: {0}")]
    Serialize(String),

    #[error("checkpoint deserialization failed: {0}")]
    Deserialize(String),

    #[error("unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Serializable snapshot of where an exchange can be picked up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version, validated on decode.
    pub version: u32,
    /// Unique checkpoint identifier.
    pub id: Uuid,
    /// Name of the machine the exchange runs.
    pub machine: String,
    /// When the checkpoint was taken.
    pub taken_at: DateTime<Utc>,
    /// Name of the resumable state that was entered.
    pub resume_state: String,
}

impl Checkpoint {
    pub(crate) fn new(machine: &str, resume_state: &str) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            machine: machine.to_string(),
            taken_at: Utc::now(),
            resume_state: resume_state.to_string(),
        }
    }

    fn check_version(self) -> Result<Self, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(self)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::Serialize(e.to_string()))
    }

    /// Decode from JSON, validating the format version.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let cp: Checkpoint =
            serde_json::from_str(json).map_err(|e| CheckpointError::Deserialize(e.to_string()))?;
        cp.check_version()
    }

    /// Encode as compact binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::Serialize(e.to_string()))
    }

    /// Decode from binary, validating the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let cp: Checkpoint =
            bincode::deserialize(bytes).map_err(|e| CheckpointError::Deserialize(e.to_string()))?;
        cp.check_version()
    }
}
