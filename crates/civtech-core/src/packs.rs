//! Resource vectors: per-pack-type quantities of science packs.
//!
//! Index `i` of a vector is the count of pack type `i`. Vectors of different
//! lengths are compared and combined as if the shorter one were padded with
//! zeros, except where noted.

use serde::{Deserialize, Serialize};

/// Quantities per science-pack type.
///
/// Equality compares the stored entries as-is, so `[1]` and `[1, 0]` are
/// different vectors. Use [`ResourceVector::satisfies`] for padded
/// comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector(Vec<i64>);

impl ResourceVector {
    pub fn new(entries: Vec<i64>) -> Self {
        Self(entries)
    }

    /// A vector of `len` zero entries.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Entry at `index`, or zero past the end.
    pub fn get(&self, index: usize) -> i64 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// True when every entry is zero. An empty vector is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// First negative entry as `(index, value)`, if any.
    pub fn first_negative(&self) -> Option<(usize, i64)> {
        self.0.iter().copied().enumerate().find(|&(_, v)| v < 0)
    }

    /// Element-wise sum. The shorter input is zero-padded; the result has
    /// the length of the longer one.
    pub fn add(&self, other: &ResourceVector) -> ResourceVector {
        let len = self.len().max(other.len());
        (0..len)
            .map(|i| self.get(i).saturating_add(other.get(i)))
            .collect()
    }

    /// What is still missing to reach `need`, treating `self` as what is
    /// held. Entries past the end of `self` count as zero held; entries of
    /// `self` past the end of `need` are ignored. Surplus is clamped to zero,
    /// so the result never has negative entries. The result has the length
    /// of `need`.
    pub fn deficit(&self, need: &ResourceVector) -> ResourceVector {
        need.0
            .iter()
            .enumerate()
            .map(|(i, &n)| n.saturating_sub(self.get(i)).max(0))
            .collect()
    }

    /// True when `self` covers `need`: for every required index either the
    /// requirement is zero or `self` holds at least that much.
    pub fn satisfies(&self, need: &ResourceVector) -> bool {
        need.0
            .iter()
            .enumerate()
            .all(|(i, &n)| n == 0 || self.0.get(i).is_some_and(|&have| have >= n))
    }
}

impl From<Vec<i64>> for ResourceVector {
    fn from(entries: Vec<i64>) -> Self {
        Self(entries)
    }
}

impl From<&[i64]> for ResourceVector {
    fn from(entries: &[i64]) -> Self {
        Self(entries.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for ResourceVector {
    fn from(entries: [i64; N]) -> Self {
        Self(entries.to_vec())
    }
}

impl FromIterator<i64> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
