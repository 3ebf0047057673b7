//! Rank-local score buffer shared by all workers of a node.

use std::sync::atomic::{AtomicI64, Ordering};

/// Partial marginal-spread sums for the block currently being counted.
///
/// Workers add concurrently with relaxed atomics; the phase join orders those
/// writes before [`LocalScores::drain_into`] reads them.
#[derive(Debug)]
pub struct LocalScores {
    slots: Vec<AtomicI64>,
}

impl LocalScores {
    pub fn new(block_size: usize) -> Self {
        Self {
            slots: (0..block_size).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn add(&self, slot: usize, count: i64) {
        self.slots[slot].fetch_add(count, Ordering::Relaxed);
    }

    pub fn get(&self, slot: usize) -> i64 {
        self.slots[slot].load(Ordering::Relaxed)
    }

    /// Copy the sums into `out` and zero the buffer.
    pub fn drain_into(&self, out: &mut [i64]) {
        for (dst, src) in out.iter_mut().zip(&self.slots) {
            *dst = src.swap(0, Ordering::AcqRel);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.slots.iter().all(|s| s.load(Ordering::Relaxed) == 0)
    }
}
