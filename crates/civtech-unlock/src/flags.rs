//! Durable "already fired" flags and the researched-technologies query.
//!
//! Both are host collaborators. The flags are the persistence boundary for
//! at-most-once firing and must survive restarts; [`StateUnlockFlags`]
//! provides that on top of any [`PersistedState`].

use civtech_core::id::{ActorId, TechId};
use civtech_core::persist::{PersistedState, StateError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Researched-technologies query
// ---------------------------------------------------------------------------

/// Failure of the host's researched-technologies query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct QueryError(pub String);

/// Every technology an actor has completed, including the one behind the
/// notification currently being handled.
pub trait ResearchedTechnologies {
    fn researched_by(&self, actor: ActorId) -> Result<HashSet<TechId>, QueryError>;
}

impl ResearchedTechnologies for HashMap<ActorId, HashSet<TechId>> {
    fn researched_by(&self, actor: ActorId) -> Result<HashSet<TechId>, QueryError> {
        Ok(self.get(&actor).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Durable flags
// ---------------------------------------------------------------------------

/// Per (unlockable, actor) record that the unlock already happened.
pub trait DurableUnlockFlags {
    fn is_set(&self, unlockable: &str, actor: ActorId) -> Result<bool, StateError>;
    fn set(&mut self, unlockable: &str, actor: ActorId) -> Result<(), StateError>;
}

/// Flags held in memory. Not durable across restarts; for tests and hosts
/// that persist the set themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUnlockFlags {
    fired: HashSet<(String, ActorId)>,
}

impl MemoryUnlockFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

impl DurableUnlockFlags for MemoryUnlockFlags {
    fn is_set(&self, unlockable: &str, actor: ActorId) -> Result<bool, StateError> {
        Ok(self.fired.contains(&(unlockable.to_string(), actor)))
    }

    fn set(&mut self, unlockable: &str, actor: ActorId) -> Result<(), StateError> {
        self.fired.insert((unlockable.to_string(), actor));
        Ok(())
    }
}

/// Magic number identifying a stored fired flag.
pub const FLAG_MAGIC: u32 = 0xC1F7_0002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FlagRecord {
    magic: u32,
    fired: bool,
}

/// Flags stored in the host's persisted state under
/// `unlock/<unlockable>/<actor>`.
#[derive(Debug, Clone, Default)]
pub struct StateUnlockFlags<S> {
    state: S,
}

impl<S: PersistedState> StateUnlockFlags<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_inner(self) -> S {
        self.state
    }

    fn key(unlockable: &str, actor: ActorId) -> String {
        format!("unlock/{unlockable}/{}", actor.0)
    }
}

impl<S: PersistedState> DurableUnlockFlags for StateUnlockFlags<S> {
    fn is_set(&self, unlockable: &str, actor: ActorId) -> Result<bool, StateError> {
        let Some(bytes) = self.state.get(&Self::key(unlockable, actor))? else {
            return Ok(false);
        };
        let record: FlagRecord =
            bitcode::deserialize(&bytes).map_err(|e| StateError::Decode(e.to_string()))?;
        if record.magic != FLAG_MAGIC {
            return Err(StateError::InvalidMagic(record.magic));
        }
        Ok(record.fired)
    }

    fn set(&mut self, unlockable: &str, actor: ActorId) -> Result<(), StateError> {
        let record = FlagRecord {
            magic: FLAG_MAGIC,
            fired: true,
        };
        let bytes = bitcode::serialize(&record).map_err(|e| StateError::Encode(e.to_string()))?;
        self.state.put(&Self::key(unlockable, actor), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civtech_core::persist::MemoryState;

    #[test]
    fn memory_flags_are_per_actor() {
        let mut flags = MemoryUnlockFlags::new();
        flags.set("base:farm", ActorId(1)).unwrap();
        assert!(flags.is_set("base:farm", ActorId(1)).unwrap());
        assert!(!flags.is_set("base:farm", ActorId(2)).unwrap());
        assert!(!flags.is_set("base:mine", ActorId(1)).unwrap());
    }

    #[test]
    fn state_flags_survive_reopening_the_store() {
        let mut flags = StateUnlockFlags::new(MemoryState::new());
        flags.set("base:farm", ActorId(7)).unwrap();
        let state = flags.into_inner();
        assert_eq!(state.len(), 1);

        let reopened = StateUnlockFlags::new(state);
        assert!(reopened.is_set("base:farm", ActorId(7)).unwrap());
        assert!(!reopened.is_set("base:farm", ActorId(8)).unwrap());
    }

    #[test]
    fn foreign_bytes_under_flag_key_are_an_error() {
        let mut state = MemoryState::new();
        let record = FlagRecord {
            magic: 0x1234,
            fired: true,
        };
        state
            .put("unlock/base:farm/1", bitcode::serialize(&record).unwrap())
            .unwrap();
        let flags = StateUnlockFlags::new(state);
        assert_eq!(
            flags.is_set("base:farm", ActorId(1)),
            Err(StateError::InvalidMagic(0x1234))
        );
    }

    #[test]
    fn map_answers_researched_query() {
        let mut known: HashMap<ActorId, HashSet<TechId>> = HashMap::new();
        known.insert(ActorId(1), [TechId(0), TechId(2)].into_iter().collect());
        assert_eq!(known.researched_by(ActorId(1)).unwrap().len(), 2);
        assert!(known.researched_by(ActorId(9)).unwrap().is_empty());
    }
}
