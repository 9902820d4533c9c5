//! Sparse numeric vectors keyed by dictionary index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An ordered `index -> value` accumulator. Absent indices are zero.
///
/// [`SparseVector::add`] sums into an existing entry, so colliding features
/// accumulate. An entry whose contributions cancel out to exactly zero is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: BTreeMap<u32, f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        SparseVector {
            entries: BTreeMap::new(),
        }
    }

    /// Add `value` to the entry at `index`.
    pub fn add(&mut self, index: u32, value: f64) {
        *self.entries.entry(index).or_insert(0.0) += value;
    }

    /// Overwrite the entry at `index`.
    pub fn set(&mut self, index: u32, value: f64) {
        self.entries.insert(index, value);
    }

    pub fn get(&self, index: u32) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn remove(&mut self, index: u32) -> Option<f64> {
        self.entries.remove(&index)
    }

    /// Entries in strictly ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.entries.iter().map(|(index, value)| (*index, *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Euclidean length of the vector.
    pub fn l2_norm(&self) -> f64 {
        self.entries.values().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        for value in self.entries.values_mut() {
            *value *= factor;
        }
    }

    /// Scale to unit length. A zero vector is left unchanged.
    pub fn normalize_l2(&mut self) {
        let norm = self.l2_norm();
        if norm > 0.0 {
            self.scale(1.0 / norm);
        }
    }

    /// First entry that is NaN or infinite, if any.
    pub fn first_non_finite(&self) -> Option<(u32, f64)> {
        self.iter().find(|(_, value)| !value.is_finite())
    }
}

impl FromIterator<(u32, f64)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        let mut vector = SparseVector::new();
        for (index, value) in iter {
            vector.add(index, value);
        }
        vector
    }
}
