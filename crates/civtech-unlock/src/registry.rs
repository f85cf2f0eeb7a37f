//! The unlockable registry and completion propagation.
//!
//! Unlockables are registered once at startup, in order. When the host
//! reports that an actor completed a technology, every registered
//! unlockable is checked against the actor's researched set and fired at
//! most once for that actor.
//!
//! # At-most-once
//!
//! The durable flag is read before firing and written after a successful
//! unlock. A session cache of fired pairs backs it up, so a flag store that
//! fails to record still cannot cause a second fire in this process.
//!
//! # Failures
//!
//! A failing collaborator never stops the batch. Each failure is recorded,
//! the remaining unlockables are still evaluated, and the failures come back
//! together as [`PropagationError::CollaboratorFailure`]. Unlocks that did
//! fire in that call are held for [`UnlockRegistry::drain_events`]; a
//! successful call returns its events and holds nothing.

use crate::flags::{DurableUnlockFlags, QueryError, ResearchedTechnologies};
use crate::unlockable::{UnlockError, Unlockable};
use civtech_core::event::{TechnologyResearched, UnlockFired};
use civtech_core::id::{ActorId, TechId, UnlockIndex};
use civtech_core::persist::StateError;
use civtech_core::tree::TechTree;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while registering unlockables or swapping the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unlockable `{unlockable}` requires unknown technology `{technology}`")]
    UnknownTechnology {
        unlockable: String,
        technology: String,
    },

    #[error("duplicate unlockable name `{0}`")]
    DuplicateName(String),
}

/// One collaborator failure during propagation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("researched-technologies query failed: {0}")]
    Query(#[source] QueryError),

    #[error("fired-flag store failed for `{unlockable}`: {source}")]
    Flags {
        unlockable: String,
        #[source]
        source: StateError,
    },

    #[error("unlock `{unlockable}` failed: {source}")]
    Unlock {
        unlockable: String,
        #[source]
        source: UnlockError,
    },
}

/// Errors returned from propagation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropagationError {
    #[error("technology {0:?} is not in the current tree")]
    UnknownTechnology(TechId),

    #[error("{} collaborator failure(s) while propagating for {}", .failures.len(), .actor)]
    CollaboratorFailure {
        actor: ActorId,
        failures: Vec<CollaboratorError>,
    },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Entry {
    unlockable: Box<dyn Unlockable>,
    /// Resolved once from `required_techs()`.
    required: Vec<TechId>,
}

/// Holds registered unlockables and fires them on technology completion.
///
/// Propagation takes `&mut self`, so calls on one registry are serialized.
pub struct UnlockRegistry {
    tree: Arc<TechTree>,
    entries: Vec<Entry>,
    by_name: HashMap<String, UnlockIndex>,
    /// Pairs fired by this registry, checked alongside the durable flags.
    fired: HashSet<(UnlockIndex, ActorId)>,
    /// Fired during calls that returned an error. At most one per pair.
    events: Vec<UnlockFired>,
}

impl UnlockRegistry {
    pub fn new(tree: Arc<TechTree>) -> Self {
        Self {
            tree,
            entries: Vec::new(),
            by_name: HashMap::new(),
            fired: HashSet::new(),
            events: Vec::new(),
        }
    }

    // -- Registration API --

    /// Register an unlockable. Its required technologies are resolved
    /// against the current tree now and cached.
    pub fn register<U>(&mut self, unlockable: U) -> Result<UnlockIndex, RegistryError>
    where
        U: Unlockable + 'static,
    {
        self.register_boxed(Box::new(unlockable))
    }

    pub fn register_boxed(
        &mut self,
        unlockable: Box<dyn Unlockable>,
    ) -> Result<UnlockIndex, RegistryError> {
        let name = unlockable.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let required = resolve(&self.tree, unlockable.as_ref())?;
        if required.is_empty() {
            tracing::debug!(unlockable = %name, "registered with no required technologies; fires only on rescan");
        }

        let index = UnlockIndex(self.entries.len() as u32);
        self.entries.push(Entry {
            unlockable,
            required,
        });
        self.by_name.insert(name, index);
        Ok(index)
    }

    /// Swap in a rebuilt tree. Every cached requirement is resolved again;
    /// if any fails, the current tree and caches stay in place.
    pub fn replace_tree(&mut self, tree: Arc<TechTree>) -> Result<(), RegistryError> {
        let resolved = self
            .entries
            .iter()
            .map(|entry| resolve(&tree, entry.unlockable.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        for (entry, required) in self.entries.iter_mut().zip(resolved) {
            entry.required = required;
        }
        self.tree = tree;
        tracing::debug!(technologies = self.tree.len(), "unlock registry switched tree");
        Ok(())
    }

    // -- Query API --

    pub fn tree(&self) -> &Arc<TechTree> {
        &self.tree
    }

    pub fn get(&self, index: UnlockIndex) -> Option<&dyn Unlockable> {
        self.entries
            .get(index.0 as usize)
            .map(|e| e.unlockable.as_ref())
    }

    pub fn index_of(&self, name: &str) -> Option<UnlockIndex> {
        self.by_name.get(name).copied()
    }

    /// Cached requirement of a registered unlockable.
    pub fn required_of(&self, index: UnlockIndex) -> Option<&[TechId]> {
        self.entries
            .get(index.0 as usize)
            .map(|e| e.required.as_slice())
    }

    /// Every unlockable requiring `technology`, in registration order.
    pub fn unlockables_for(&self, technology: TechId) -> Vec<&dyn Unlockable> {
        self.entries
            .iter()
            .filter(|e| e.required.contains(&technology))
            .map(|e| e.unlockable.as_ref())
            .collect()
    }

    /// Like [`unlockables_for`](Self::unlockables_for), restricted to
    /// visible unlockables. Display only.
    pub fn visible_unlockables_for(&self, technology: TechId) -> Vec<&dyn Unlockable> {
        self.unlockables_for(technology)
            .into_iter()
            .filter(|u| u.visible())
            .collect()
    }

    /// Whether `name` has fired for `actor`, per this session or the flags.
    pub fn is_fired_for<F>(&self, name: &str, actor: ActorId, flags: &F) -> Result<bool, StateError>
    where
        F: DurableUnlockFlags + ?Sized,
    {
        if let Some(index) = self.index_of(name)
            && self.fired.contains(&(index, actor))
        {
            return Ok(true);
        }
        flags.is_set(name, actor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -- Propagation --

    /// React to `notification`: fire, in registration order, every
    /// unlockable with a non-empty requirement that the actor's researched
    /// set now covers and that has not fired for the actor yet.
    ///
    /// Returns the unlocks fired by this call. On error, the unlocks that
    /// did fire are kept for [`drain_events`](Self::drain_events).
    pub fn on_technology_researched<R, F>(
        &mut self,
        notification: TechnologyResearched,
        researched: &R,
        flags: &mut F,
    ) -> Result<Vec<UnlockFired>, PropagationError>
    where
        R: ResearchedTechnologies + ?Sized,
        F: DurableUnlockFlags + ?Sized,
    {
        let TechnologyResearched { actor, technology } = notification;
        if self.tree.technology(technology).is_none() {
            return Err(PropagationError::UnknownTechnology(technology));
        }

        let mut known = query(researched, actor)?;
        if known.insert(technology) {
            tracing::debug!(
                %actor,
                ?technology,
                "researched set did not include the notified technology"
            );
        }
        self.evaluate(actor, &known, flags, false)
    }

    /// Evaluate every unlockable for `actor`, including those with no
    /// required technologies. Use after loading an actor whose unlocks may
    /// have been missed.
    pub fn rescan<R, F>(
        &mut self,
        actor: ActorId,
        researched: &R,
        flags: &mut F,
    ) -> Result<Vec<UnlockFired>, PropagationError>
    where
        R: ResearchedTechnologies + ?Sized,
        F: DurableUnlockFlags + ?Sized,
    {
        let known = query(researched, actor)?;
        self.evaluate(actor, &known, flags, true)
    }

    fn evaluate<F>(
        &mut self,
        actor: ActorId,
        known: &HashSet<TechId>,
        flags: &mut F,
        include_inert: bool,
    ) -> Result<Vec<UnlockFired>, PropagationError>
    where
        F: DurableUnlockFlags + ?Sized,
    {
        let mut fired = Vec::new();
        let mut failures = Vec::new();

        for (position, entry) in self.entries.iter().enumerate() {
            let index = UnlockIndex(position as u32);
            let name = entry.unlockable.name();

            if entry.required.is_empty() && !include_inert {
                continue;
            }
            if self.fired.contains(&(index, actor)) {
                continue;
            }
            match flags.is_set(name, actor) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(source) => {
                    tracing::warn!(%actor, unlockable = %name, error = %source, "fired-flag lookup failed");
                    failures.push(CollaboratorError::Flags {
                        unlockable: name.to_string(),
                        source,
                    });
                    continue;
                }
            }
            if !entry.required.iter().all(|t| known.contains(t)) {
                continue;
            }

            if let Err(source) = entry.unlockable.unlock(actor) {
                tracing::warn!(%actor, unlockable = %name, error = %source, "unlock failed");
                failures.push(CollaboratorError::Unlock {
                    unlockable: name.to_string(),
                    source,
                });
                continue;
            }

            self.fired.insert((index, actor));
            fired.push(UnlockFired {
                unlockable: name.to_string(),
                actor,
            });
            tracing::info!(%actor, unlockable = %name, "unlock fired");

            if let Err(source) = flags.set(name, actor) {
                tracing::warn!(%actor, unlockable = %name, error = %source, "fired flag not recorded");
                failures.push(CollaboratorError::Flags {
                    unlockable: name.to_string(),
                    source,
                });
            }
        }

        if failures.is_empty() {
            Ok(fired)
        } else {
            self.events.extend(fired);
            Err(PropagationError::CollaboratorFailure { actor, failures })
        }
    }

    // -- Event API --

    /// Drain events fired by calls that returned an error. Returns events
    /// and clears the internal list.
    pub fn drain_events(&mut self) -> Vec<UnlockFired> {
        std::mem::take(&mut self.events)
    }

    /// Get a read-only view of pending events.
    pub fn pending_events(&self) -> &[UnlockFired] {
        &self.events
    }
}

impl std::fmt::Debug for UnlockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockRegistry")
            .field("technologies", &self.tree.len())
            .field("unlockables", &self.by_name.len())
            .field("fired", &self.fired.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve an unlockable's required names against `tree`, without
/// duplicates.
fn resolve(tree: &TechTree, unlockable: &dyn Unlockable) -> Result<Vec<TechId>, RegistryError> {
    let mut required = Vec::new();
    for name in unlockable.required_techs() {
        let id = tree
            .id_of(name)
            .ok_or_else(|| RegistryError::UnknownTechnology {
                unlockable: unlockable.name().to_string(),
                technology: name.clone(),
            })?;
        if !required.contains(&id) {
            required.push(id);
        }
    }
    Ok(required)
}

fn query<R>(researched: &R, actor: ActorId) -> Result<HashSet<TechId>, PropagationError>
where
    R: ResearchedTechnologies + ?Sized,
{
    researched.researched_by(actor).map_err(|err| {
        tracing::warn!(%actor, error = %err, "researched-technologies query failed");
        PropagationError::CollaboratorFailure {
            actor,
            failures: vec![CollaboratorError::Query(err)],
        }
    })
}

// ===========================================================================
// Tests
// ===========================================================================
