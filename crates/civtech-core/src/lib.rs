//! Civtech Core -- the technology graph and research progress model.
//!
//! Technologies form a directed acyclic graph. Each one requires
//! accumulated quantities of typed science packs before it counts as
//! researched. This crate holds the pieces with no knowledge of unlock
//! propagation:
//!
//! - [`packs::ResourceVector`] -- per-pack-type quantities with padded
//!   addition, clamped deficit and a satisfaction check.
//! - [`tree::TechTree`] -- immutable graph built once from
//!   [`tree::TechDeclaration`]s; rejects cycles and dangling parents.
//! - [`progress::ResearchProgress`] -- one actor's (or one artifact's)
//!   packs toward one technology, classified as pending, researching or
//!   researched.
//! - [`persist`] -- the opaque key-value boundary to the host's saved
//!   state, with versioned `bitcode` records.
//! - [`event`] -- the completion notification and the unlock event.
//!
//! # Sharing the tree
//!
//! Build a tree once and share it as `Arc<TechTree>`. A reload builds a new
//! tree and swaps the handle; a failed build leaves the old one in place:
//!
//! ```rust,ignore
//! let next = TechTree::build(declarations)?;
//! current = Arc::new(next);
//! ```

pub mod event;
pub mod id;
pub mod packs;
pub mod persist;
pub mod progress;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
