//! The two events that cross the engine boundary.
//!
//! [`TechnologyResearched`] is the single inbound notification the host
//! reports once per genuine completion. [`UnlockFired`] is emitted once per
//! (unlockable, actor) so the host can apply world-visible effects.

use crate::id::{ActorId, TechId};
use serde::{Deserialize, Serialize};

/// An actor has completed a technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TechnologyResearched {
    pub actor: ActorId,
    pub technology: TechId,
}

/// An unlockable has fired for an actor. Never emitted twice for the same
/// pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnlockFired {
    /// Namespaced unlockable name.
    pub unlockable: String,
    pub actor: ActorId,
}
