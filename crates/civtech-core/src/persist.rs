//! The persisted-state boundary.
//!
//! The host owns the storage container; the engine only sees an opaque
//! key-value store through [`PersistedState`]. Records written here carry a
//! magic number and version header and are encoded with `bitcode`.

use crate::packs::ResourceVector;
use crate::progress::{ResearchProgress, ValidationError};
use crate::tree::TechTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a stored progress record.
pub const PROGRESS_MAGIC: u32 = 0xC1F7_0001;

/// Current record version. Increment when breaking the record layout.
pub const RECORD_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures at the persisted-state boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state backend failed: {0}")]
    Backend(String),

    #[error("bitcode encoding failed: {0}")]
    Encode(String),

    #[error("bitcode decoding failed: {0}")]
    Decode(String),

    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", PROGRESS_MAGIC, .0)]
    InvalidMagic(u32),

    #[error("unsupported record version {0} (this build reads {RECORD_VERSION})")]
    UnsupportedVersion(u32),

    #[error("stored record names unknown technology `{0}`")]
    UnknownTechnology(String),

    #[error("stored record for `{technology}` holds {value} of pack {index}")]
    NegativePacks {
        technology: String,
        index: usize,
        value: i64,
    },
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Opaque key-value store supplied by the host. Implementations may block
/// or fail; values must survive process restarts for the durability
/// guarantees built on top of them to hold.
pub trait PersistedState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError>;
}

/// In-process store. Durable only for the life of the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PersistedState for MemoryState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress records
// ---------------------------------------------------------------------------

/// Stored form of a [`ResearchProgress`]. Names the technology rather than
/// its id so records survive a tree reload that renumbers technologies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub magic: u32,
    pub version: u32,
    pub technology: String,
    pub packs: ResourceVector,
}

impl ProgressRecord {
    pub fn new(progress: &ResearchProgress) -> Self {
        Self {
            magic: PROGRESS_MAGIC,
            version: RECORD_VERSION,
            technology: progress.technology_name().to_string(),
            packs: progress.accumulated().clone(),
        }
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.magic != PROGRESS_MAGIC {
            return Err(StateError::InvalidMagic(self.magic));
        }
        if self.version != RECORD_VERSION {
            return Err(StateError::UnsupportedVersion(self.version));
        }
        if let Some((index, value)) = self.packs.first_negative() {
            return Err(StateError::NegativePacks {
                technology: self.technology.clone(),
                index,
                value,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, StateError> {
        bitcode::serialize(self).map_err(|e| StateError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, StateError> {
        let record: ProgressRecord =
            bitcode::deserialize(data).map_err(|e| StateError::Decode(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Resolve the record against `tree`.
    pub fn into_progress(self, tree: &TechTree) -> Result<ResearchProgress, StateError> {
        ResearchProgress::resume(tree, &self.technology, self.packs).map_err(|err| match err {
            ValidationError::NegativePacks { index, value }
            | ValidationError::NegativeDelta { index, value } => StateError::NegativePacks {
                technology: self.technology,
                index,
                value,
            },
            ValidationError::UnknownTechnology(name) => StateError::UnknownTechnology(name),
        })
    }
}

/// Store `progress` under `key`.
pub fn save_progress<S>(state: &mut S, key: &str, progress: &ResearchProgress) -> Result<(), StateError>
where
    S: PersistedState + ?Sized,
{
    let bytes = ProgressRecord::new(progress).encode()?;
    state.put(key, bytes)
}

/// Load the progress stored under `key`, resolved against `tree`.
/// `Ok(None)` when nothing is stored.
pub fn load_progress<S>(
    state: &S,
    key: &str,
    tree: &TechTree,
) -> Result<Option<ResearchProgress>, StateError>
where
    S: PersistedState + ?Sized,
{
    let Some(bytes) = state.get(key)? else {
        return Ok(None);
    };
    ProgressRecord::decode(&bytes)?.into_progress(tree).map(Some)
}

// ===========================================================================
// Tests
// ===========================================================================
