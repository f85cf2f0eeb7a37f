//! The unlockable contract.
//!
//! An unlockable is an effect gated behind a fixed set of technologies. The
//! set of implementers is open: hosts implement [`Unlockable`] for their own
//! effect kinds. [`UnlockableDef`] covers the common case of an effect the
//! host applies itself when it sees the `UnlockFired` event.

use civtech_core::id::ActorId;
use civtech_core::tree::EffectDescription;
use serde::{Deserialize, Serialize};

/// Namespace used when the providing source is unknown.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// `"<source>:<name>"`, falling back to [`UNKNOWN_SOURCE`].
pub fn namespaced_name(source: Option<&str>, name: &str) -> String {
    format!("{}:{name}", source.unwrap_or(UNKNOWN_SOURCE))
}

/// Raised by [`Unlockable::unlock`]. The registry reports it and moves on
/// to the next unlockable; the fired flag is not recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UnlockError(pub String);

/// Something that happens once per actor after every required technology
/// has been researched.
pub trait Unlockable: Send + Sync {
    /// Namespaced, unique within a registry. Keys the durable fired flag.
    fn name(&self) -> &str;

    /// Names of the technologies that must all be researched. Must return
    /// the same list on every call; the registry resolves it once.
    ///
    /// An empty list makes the unlockable inert on the completion path; only
    /// an explicit rescan can fire it.
    fn required_techs(&self) -> &[String];

    /// Whether to list this in user-facing summaries.
    fn visible(&self) -> bool {
        true
    }

    /// Apply the effect for `actor`.
    fn unlock(&self, actor: ActorId) -> Result<(), UnlockError>;
}

/// Declarative unlockable. Its own `unlock` does nothing; the host applies
/// `effect` in response to the fired event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockableDef {
    pub name: String,
    pub required: Vec<String>,
    pub visible: bool,
    pub effect: EffectDescription,
}

impl UnlockableDef {
    pub fn new(source: Option<&str>, name: &str, effect: EffectDescription) -> Self {
        Self {
            name: namespaced_name(source, name),
            required: Vec::new(),
            visible: true,
            effect,
        }
    }

    pub fn requires(mut self, tech: impl Into<String>) -> Self {
        self.required.push(tech.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

impl Unlockable for UnlockableDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_techs(&self) -> &[String] {
        &self.required
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn unlock(&self, _actor: ActorId) -> Result<(), UnlockError> {
        Ok(())
    }
}
