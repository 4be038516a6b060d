use crate::scope::ScopePath;
use nameplate_common::{Location, NameplateError, Result};
use serde::{Deserialize, Serialize};

/// A unit of work handed to a worker process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Name of the work factory the worker should initialize with
    pub factory: String,

    /// Opaque serialized unit of work, interpreted by the factory
    pub payload: Vec<u8>,

    /// Application scope the work originated from
    pub origin: ScopePath,

    /// Where the worker must report its outcome
    pub reply_location: Location,
}

impl SpawnRequest {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| NameplateError::protocol(format!("spawn request encode: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| NameplateError::protocol(format!("spawn request decode: {e}")))
    }
}

/// What a worker reports back before exiting
///
/// The absence of any report is a third, implicit outcome: the
/// supervisor treats a closed reply channel as an abrupt exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnOutcome {
    Completed,
    Failed { message: String },
}

impl SpawnOutcome {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| NameplateError::protocol(format!("spawn outcome encode: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| NameplateError::protocol(format!("spawn outcome decode: {e}")))
    }
}
