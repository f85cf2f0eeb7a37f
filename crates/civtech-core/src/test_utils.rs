//! Shared test fixtures for unit tests, integration tests and the other
//! workspace crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::id::{ActorId, TechId};
use crate::tree::{EffectDescription, TechDeclaration, TechTree};

// ===========================================================================
// Actors
// ===========================================================================

pub fn alice() -> ActorId {
    ActorId(1)
}

pub fn bob() -> ActorId {
    ActorId(2)
}

// ===========================================================================
// Trees
// ===========================================================================

/// Declarations for a small ancient-era tree:
///
/// ```text
/// agriculture ─┬─> pottery ──┐
///              │             ├─> writing
/// mining ──────┴─> bronze ───┘
/// ```
pub fn ancient_declarations() -> Vec<TechDeclaration> {
    vec![
        TechDeclaration::new("agriculture", [2, 0, 0])
            .with_effect(EffectDescription::Building("farm".to_string())),
        TechDeclaration::new("mining", [1, 1]),
        TechDeclaration::new("pottery", [3, 1]).with_parents(["agriculture"]),
        TechDeclaration::new("bronze", [2, 2, 1]).with_parents(["mining", "agriculture"]),
        TechDeclaration::new("writing", [4, 2, 2]).with_parents(["pottery", "bronze"]),
    ]
}

pub fn ancient_tree() -> TechTree {
    match TechTree::build(ancient_declarations()) {
        Ok(tree) => tree,
        Err(err) => panic!("fixture tree is invalid: {err}"),
    }
}

/// Id of `name` in `tree`; panics if absent.
pub fn tech(tree: &TechTree, name: &str) -> TechId {
    match tree.id_of(name) {
        Some(id) => id,
        None => panic!("no technology named `{name}` in fixture tree"),
    }
}
