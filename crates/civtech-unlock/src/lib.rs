//! Civtech Unlock -- fires gated effects when technologies complete.
//!
//! An [`Unlockable`](unlockable::Unlockable) names the technologies it
//! waits on. The [`UnlockRegistry`](registry::UnlockRegistry) resolves those
//! names against a shared tree at registration, then reacts to each
//! [`TechnologyResearched`](civtech_core::event::TechnologyResearched)
//! notification by firing every unlockable the actor now qualifies for,
//! once per actor.
//!
//! The host supplies two collaborators: the researched-technologies query
//! and the durable fired flags (see [`flags`]).

pub mod flags;
pub mod registry;
pub mod unlockable;

pub use flags::{
    DurableUnlockFlags, MemoryUnlockFlags, QueryError, ResearchedTechnologies, StateUnlockFlags,
};
pub use registry::{CollaboratorError, PropagationError, RegistryError, UnlockRegistry};
pub use unlockable::{UnlockError, Unlockable, UnlockableDef};
