/// Save/load of the world state as a versioned JSON envelope. Reading and
/// writing the bytes is left to the host.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::state::WorldState;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

/// A saved session. Restoring it reproduces the state exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// Seconds since the Unix epoch at save time.
    pub timestamp: u64,

    pub state: WorldState,
}

impl SaveEnvelope {
    pub fn new(state: WorldState) -> Self {
        Self {
            version: SAVE_VERSION,
            timestamp: unix_now(),
            state,
        }
    }

    /// Fails with `VersionMismatch` for envelopes written by another
    /// format version.
    pub fn check_version(&self) -> Result<(), PersistError> {
        if self.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode without checking the version; `load_game` decides what to do
    /// with a foreign one.
    pub fn from_json(input: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// `SystemTime` is unavailable on `wasm32-unknown-unknown`; the bindings
/// stamp envelopes themselves.
#[cfg(target_arch = "wasm32")]
fn unix_now() -> u64 {
    0
}

#[cfg(not(target_arch = "wasm32"))]
fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
