//! Research progress: packs accumulated toward one technology by one actor
//! or carried artifact, and the tri-state status derived from them.

use crate::event::TechnologyResearched;
use crate::id::{ActorId, TechId};
use crate::packs::ResourceVector;
use crate::tree::{TechTree, Technology};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected progress updates. The progress is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("negative delta {value} for pack {index}")]
    NegativeDelta { index: usize, value: i64 },

    #[error("negative accumulated count {value} for pack {index}")]
    NegativePacks { index: usize, value: i64 },

    #[error("unknown technology `{0}`")]
    UnknownTechnology(String),
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a piece of research stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResearchStatus {
    /// No progress on any required pack type.
    Pending,
    /// Some progress, not yet complete.
    Researching,
    /// Every requirement met.
    Researched,
}

impl ResearchStatus {
    /// Visual variant index: 0 for none, 1 for some, 2 for all progress.
    pub fn display_variant(self) -> u8 {
        match self {
            ResearchStatus::Pending => 0,
            ResearchStatus::Researching => 1,
            ResearchStatus::Researched => 2,
        }
    }

    pub fn from_display_variant(variant: u8) -> Option<Self> {
        match variant {
            0 => Some(ResearchStatus::Pending),
            1 => Some(ResearchStatus::Researching),
            2 => Some(ResearchStatus::Researched),
            _ => None,
        }
    }
}

/// Classify `accumulated` against `required`.
///
/// A requirement with no nonzero entry is researched outright. Otherwise the
/// walk covers the required indices and stops at the end of `accumulated`:
/// an index missing from `accumulated` counts as unmet even when its
/// requirement is zero, so `[2]` against `[2, 0]` is still researching.
/// Progress means a positive accumulated entry at any walked index.
pub fn classify(accumulated: &ResourceVector, required: &ResourceVector) -> ResearchStatus {
    if required.is_zero() {
        return ResearchStatus::Researched;
    }

    let have = accumulated.as_slice();
    let mut all_satisfied = true;
    let mut any_progress = false;

    for (index, &need) in required.as_slice().iter().enumerate() {
        let Some(&got) = have.get(index) else {
            all_satisfied = false;
            break;
        };
        if got > 0 {
            any_progress = true;
        }
        if got < need {
            all_satisfied = false;
        }
    }

    if all_satisfied {
        ResearchStatus::Researched
    } else if any_progress {
        ResearchStatus::Researching
    } else {
        ResearchStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Held and needed counts for one pack type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackCount {
    pub have: i64,
    pub need: i64,
}

/// Progress toward one technology. Owned by the actor or artifact that
/// tracks it; never shared between handlers.
///
/// The requirement is captured from the tree on construction, so status
/// queries need no tree handle. Stored progress goes through
/// [`ProgressRecord`](crate::persist::ProgressRecord), which validates on
/// the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchProgress {
    technology: TechId,
    name: String,
    required: ResourceVector,
    accumulated: ResourceVector,
}

impl ResearchProgress {
    /// Fresh progress with nothing accumulated.
    pub fn new(technology: &Technology) -> Self {
        Self {
            technology: technology.id,
            name: technology.name.clone(),
            required: technology.required.clone(),
            accumulated: ResourceVector::default(),
        }
    }

    /// Progress materialized with packs already accumulated, e.g. from a
    /// stored artifact. Negative counts are rejected.
    pub fn with_packs(
        technology: &Technology,
        accumulated: ResourceVector,
    ) -> Result<Self, ValidationError> {
        if let Some((index, value)) = accumulated.first_negative() {
            return Err(ValidationError::NegativePacks { index, value });
        }
        Ok(Self {
            accumulated,
            ..Self::new(technology)
        })
    }

    /// Fresh progress for the technology called `name`.
    pub fn start(tree: &TechTree, name: &str) -> Result<Self, ValidationError> {
        Self::resume(tree, name, ResourceVector::default())
    }

    /// Rebuild progress for `name` against `tree`, e.g. after the tree was
    /// reloaded.
    pub fn resume(
        tree: &TechTree,
        name: &str,
        accumulated: ResourceVector,
    ) -> Result<Self, ValidationError> {
        let tech = tree
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTechnology(name.to_string()))?;
        Self::with_packs(tech, accumulated)
    }

    pub fn technology(&self) -> TechId {
        self.technology
    }

    pub fn technology_name(&self) -> &str {
        &self.name
    }

    pub fn required(&self) -> &ResourceVector {
        &self.required
    }

    pub fn accumulated(&self) -> &ResourceVector {
        &self.accumulated
    }

    pub fn status(&self) -> ResearchStatus {
        classify(&self.accumulated, &self.required)
    }

    pub fn is_researched(&self) -> bool {
        self.status() == ResearchStatus::Researched
    }

    /// Add packs. Rejects the whole delta if any entry is negative.
    pub fn add_resources(&mut self, delta: &[i64]) -> Result<ResearchStatus, ValidationError> {
        if let Some((index, &value)) = delta.iter().enumerate().find(|&(_, &v)| v < 0) {
            return Err(ValidationError::NegativeDelta { index, value });
        }

        let before = self.status();
        self.accumulated = self.accumulated.add(&ResourceVector::from(delta));
        let after = self.status();

        if after != before {
            tracing::debug!(
                technology = %self.name,
                from = ?before,
                to = ?after,
                "research status changed"
            );
        }
        Ok(after)
    }

    /// Packs still needed. Already-satisfied pack types report zero.
    pub fn outstanding(&self) -> ResourceVector {
        self.accumulated.deficit(&self.required)
    }

    /// Held/needed counts per pack type, up to the longer of the two vectors,
    /// with trailing entries that are zero on both sides dropped.
    pub fn pack_counts(&self) -> Vec<PackCount> {
        let len = self.accumulated.len().max(self.required.len());
        let mut counts: Vec<PackCount> = (0..len)
            .map(|i| PackCount {
                have: self.accumulated.get(i),
                need: self.required.get(i),
            })
            .collect();
        while counts.last().is_some_and(|c| c.have == 0 && c.need == 0) {
            counts.pop();
        }
        counts
    }

    /// Turn finished research into the completion notification for `actor`.
    ///
    /// Returns `None` while research is unfinished, and when `known` (the
    /// actor's researched set) already holds the technology.
    pub fn claim(&self, actor: ActorId, known: &HashSet<TechId>) -> Option<TechnologyResearched> {
        if !self.is_researched() || known.contains(&self.technology) {
            return None;
        }
        Some(TechnologyResearched {
            actor,
            technology: self.technology,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TechDeclaration;

    fn v<const N: usize>(entries: [i64; N]) -> ResourceVector {
        ResourceVector::from(entries)
    }

    fn tree() -> TechTree {
        TechTree::build(vec![
            TechDeclaration::new("agriculture", [2, 0, 0]),
            TechDeclaration::new("fire", ResourceVector::default()),
            TechDeclaration::new("writing", [2, 3]).with_parents(["agriculture"]),
        ])
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // classify
    // -----------------------------------------------------------------------

    #[test]
    fn empty_requirement_is_researched() {
        assert_eq!(classify(&v([3]), &v([])), ResearchStatus::Researched);
        assert_eq!(classify(&v([]), &v([])), ResearchStatus::Researched);
    }

    #[test]
    fn zero_requirement_is_researched_regardless_of_length() {
        assert_eq!(classify(&v([]), &v([0, 0])), ResearchStatus::Researched);
        assert_eq!(classify(&v([5, 5, 5]), &v([0])), ResearchStatus::Researched);
    }

    #[test]
    fn nothing_accumulated_is_pending() {
        assert_eq!(classify(&v([]), &v([2])), ResearchStatus::Pending);
        assert_eq!(classify(&v([0, 0]), &v([2, 1])), ResearchStatus::Pending);
    }

    #[test]
    fn partial_progress_is_researching() {
        assert_eq!(classify(&v([1, 0, 0]), &v([2, 0, 0])), ResearchStatus::Researching);
        assert_eq!(classify(&v([0, 1]), &v([2, 3])), ResearchStatus::Researching);
    }

    #[test]
    fn satisfied_index_counts_as_progress() {
        assert_eq!(classify(&v([2, 0]), &v([2, 3])), ResearchStatus::Researching);
    }

    #[test]
    fn satisfied_zero_index_is_not_progress() {
        assert_eq!(classify(&v([0, 0]), &v([0, 3])), ResearchStatus::Pending);
    }

    #[test]
    fn short_accumulation_with_trailing_zero_requirement_is_researching() {
        // Deficit is zero here, but the walk runs off the end of the
        // accumulated vector.
        assert!(v([2]).satisfies(&v([2, 0])));
        assert_eq!(classify(&v([2]), &v([2, 0])), ResearchStatus::Researching);
        assert_eq!(classify(&v([2, 0]), &v([2, 0])), ResearchStatus::Researched);
    }

    #[test]
    fn short_accumulation_keeps_earlier_progress() {
        assert_eq!(classify(&v([1]), &v([2, 2])), ResearchStatus::Researching);
        assert_eq!(classify(&v([0]), &v([2, 2])), ResearchStatus::Pending);
    }

    #[test]
    fn entries_past_requirement_are_ignored() {
        assert_eq!(classify(&v([0, 7]), &v([2])), ResearchStatus::Pending);
        assert_eq!(classify(&v([2, 7]), &v([2])), ResearchStatus::Researched);
    }

    #[test]
    fn display_variant_round_trip() {
        for status in [
            ResearchStatus::Pending,
            ResearchStatus::Researching,
            ResearchStatus::Researched,
        ] {
            let variant = status.display_variant();
            assert_eq!(ResearchStatus::from_display_variant(variant), Some(status));
        }
        assert_eq!(ResearchStatus::from_display_variant(3), None);
    }

    // -----------------------------------------------------------------------
    // ResearchProgress
    // -----------------------------------------------------------------------

    #[test]
    fn agriculture_scenario() {
        let tree = tree();
        let mut progress = ResearchProgress::start(&tree, "agriculture").unwrap();
        assert_eq!(progress.status(), ResearchStatus::Pending);

        let status = progress.add_resources(&[1, 0, 0]).unwrap();
        assert_eq!(status, ResearchStatus::Researching);
        assert_eq!(progress.outstanding(), v([1, 0, 0]));

        let status = progress.add_resources(&[1, 0, 0]).unwrap();
        assert_eq!(status, ResearchStatus::Researched);
        assert_eq!(progress.outstanding(), v([0, 0, 0]));
        assert_eq!(progress.accumulated(), &v([2, 0, 0]));
    }

    #[test]
    fn negative_delta_leaves_progress_unchanged() {
        let tree = tree();
        let mut progress = ResearchProgress::start(&tree, "writing").unwrap();
        progress.add_resources(&[1]).unwrap();

        let result = progress.add_resources(&[1, -2]);
        assert_eq!(result, Err(ValidationError::NegativeDelta { index: 1, value: -2 }));
        assert_eq!(progress.accumulated(), &v([1]));
        assert_eq!(progress.status(), ResearchStatus::Researching);
    }

    #[test]
    fn empty_requirement_progress_is_researched_from_the_start() {
        let tree = tree();
        let progress = ResearchProgress::start(&tree, "fire").unwrap();
        assert_eq!(progress.status(), ResearchStatus::Researched);
        assert!(progress.outstanding().is_empty());
    }

    #[test]
    fn surplus_does_not_leave_researched() {
        let tree = tree();
        let mut progress = ResearchProgress::start(&tree, "writing").unwrap();
        progress.add_resources(&[2, 3]).unwrap();
        let status = progress.add_resources(&[10, 10, 10]).unwrap();
        assert_eq!(status, ResearchStatus::Researched);
        assert_eq!(progress.outstanding(), v([0, 0]));
    }

    #[test]
    fn unknown_technology_rejected() {
        let tree = tree();
        let result = ResearchProgress::start(&tree, "bronze_working");
        assert_eq!(
            result,
            Err(ValidationError::UnknownTechnology("bronze_working".to_string()))
        );
    }

    #[test]
    fn pack_counts_trim_trailing_empty_entries() {
        let tree = tree();
        let mut progress = ResearchProgress::start(&tree, "agriculture").unwrap();
        progress.add_resources(&[1]).unwrap();
        assert_eq!(progress.pack_counts(), vec![PackCount { have: 1, need: 2 }]);

        let writing = ResearchProgress::resume(&tree, "writing", v([0, 1, 4])).unwrap();
        assert_eq!(
            writing.pack_counts(),
            vec![
                PackCount { have: 0, need: 2 },
                PackCount { have: 1, need: 3 },
                PackCount { have: 4, need: 0 },
            ]
        );
    }

    #[test]
    fn resume_rejects_negative_packs() {
        let tree = tree();
        let result = ResearchProgress::resume(&tree, "agriculture", v([1, -5]));
        assert_eq!(
            result,
            Err(ValidationError::NegativePacks {
                index: 1,
                value: -5
            })
        );

        let agriculture = tree.get("agriculture").unwrap();
        let progress = ResearchProgress::with_packs(agriculture, v([1, 0])).unwrap();
        assert_eq!(progress.outstanding().as_slice(), [1, 0, 0]);
    }

    #[test]
    fn claim_only_when_researched_and_new() {
        let tree = tree();
        let actor = ActorId(1);
        let mut progress = ResearchProgress::start(&tree, "agriculture").unwrap();
        let known = HashSet::new();
        assert_eq!(progress.claim(actor, &known), None);

        // [2] alone leaves the trailing pack types unwalked.
        progress.add_resources(&[2]).unwrap();
        assert_eq!(progress.claim(actor, &known), None);

        progress.add_resources(&[0, 0, 0]).unwrap();
        let note = progress.claim(actor, &known).unwrap();
        assert_eq!(note.actor, actor);
        assert_eq!(note.technology, tree.id_of("agriculture").unwrap());

        let known: HashSet<TechId> = [note.technology].into_iter().collect();
        assert_eq!(progress.claim(actor, &known), None);
    }
}
