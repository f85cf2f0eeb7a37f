//! Serde data file structs for technology and unlockable definitions.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON, or TOML data files and then converted into engine types by the
//! loader.

use civtech_core::tree::{EffectDescription, TechDeclaration};
use civtech_unlock::unlockable::UnlockableDef;
use serde::Deserialize;

// ===========================================================================
// Technologies
// ===========================================================================

/// A technology definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyData {
    pub name: String,
    /// Required science packs, one entry per pack type.
    #[serde(default)]
    pub packs: Vec<i64>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub effects: Vec<EffectData>,
}

/// What a technology or unlockable is described as providing. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum EffectData {
    Recipe(String),
    Building(String),
    Custom(String),
}

impl From<EffectData> for EffectDescription {
    fn from(data: EffectData) -> Self {
        match data {
            EffectData::Recipe(name) => EffectDescription::Recipe(name),
            EffectData::Building(name) => EffectDescription::Building(name),
            EffectData::Custom(key) => EffectDescription::Custom(key),
        }
    }
}

impl From<TechnologyData> for TechDeclaration {
    fn from(data: TechnologyData) -> Self {
        let mut decl = TechDeclaration::new(data.name, data.packs).with_parents(data.parents);
        for effect in data.effects {
            decl = decl.with_effect(effect.into());
        }
        decl
    }
}

// ===========================================================================
// Unlockables
// ===========================================================================

/// An unlockable definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct UnlockableData {
    pub name: String,
    /// Namespace of the providing content pack. Defaults to `unknown`.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub effect: EffectData,
}

fn default_true() -> bool {
    true
}

impl From<UnlockableData> for UnlockableDef {
    fn from(data: UnlockableData) -> Self {
        let mut def = UnlockableDef::new(data.source.as_deref(), &data.name, data.effect.into());
        def.required = data.requires;
        def.visible = data.visible;
        def
    }
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of technologies in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlTechnologies {
    pub technologies: Vec<TechnologyData>,
}

/// Wrapper for a list of unlockables in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlUnlockables {
    pub unlockables: Vec<UnlockableData>,
}

// ===========================================================================
// Tests
// ===========================================================================
