//! The growing seed set.

use crate::bitrow::BitRow;

/// Ordered set of distinct seed vertices with O(1) membership.
#[derive(Debug, Clone, Default)]
pub struct SeedSet {
    order: Vec<usize>,
    members: BitRow,
}

impl SeedSet {
    pub fn new(num_vertices: usize) -> Self {
        Self {
            order: Vec::new(),
            members: BitRow::with_size(num_vertices),
        }
    }

    /// Append `v`; returns `false` and leaves the set untouched if present.
    pub fn insert(&mut self, v: usize) -> bool {
        if !self.members.insert(v) {
            return false;
        }
        self.order.push(v);
        true
    }

    #[inline]
    pub fn contains(&self, v: usize) -> bool {
        self.members.get(v)
    }

    /// Seeds in selection order.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.order
    }
}
