use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a technology within one built tree. Equal to the technology's
/// declaration index, so ids are only meaningful against the tree that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

impl TechId {
    /// Position of the technology in declaration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a researching actor (a player, a team). Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Identifies a registered unlockable by registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnlockIndex(pub u32);
