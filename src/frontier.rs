//! Per-sample reachability cache for one greedy round.
//!
//! Each slot is written once during the frontier phase and read-only during
//! counting. Clearing at the end of a round needs `&mut self`, so no reader
//! can observe a stale frontier from an earlier round.

use once_cell::sync::OnceCell;

use crate::bitrow::ReachSet;
use crate::error::SeedSelectionError;

/// Write-once-per-round frontier slots, one per diffusion sample.
#[derive(Debug, Default)]
pub struct FrontierCache {
    slots: Vec<OnceCell<ReachSet>>,
}

impl FrontierCache {
    pub fn new(num_samples: usize) -> Self {
        Self {
            slots: (0..num_samples).map(|_| OnceCell::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Publish the frontier of `sample`. Fails if it was already built this round.
    pub fn publish(&self, sample: usize, reach: ReachSet) -> Result<(), SeedSelectionError> {
        self.slots[sample]
            .set(reach)
            .map_err(|_| SeedSelectionError::FrontierRewritten(sample))
    }

    pub fn get(&self, sample: usize) -> Result<&ReachSet, SeedSelectionError> {
        self.slots[sample]
            .get()
            .ok_or(SeedSelectionError::FrontierMissing(sample))
    }

    /// Spread of the current seed set under `sample`.
    pub fn base_count(&self, sample: usize) -> Result<usize, SeedSelectionError> {
        Ok(self.get(sample)?.count_ones())
    }

    /// Drop every frontier.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.take();
        }
    }

    /// True when no slot holds a frontier.
    pub fn is_clear(&self) -> bool {
        self.slots.iter().all(|s| s.get().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_write_once_until_cleared() {
        let mut cache = FrontierCache::new(2);
        assert!(cache.is_clear());
        cache.publish(1, ReachSet::full(3)).unwrap();
        assert_eq!(cache.base_count(1).unwrap(), 3);
        assert_eq!(
            cache.publish(1, ReachSet::with_size(3)),
            Err(SeedSelectionError::FrontierRewritten(1))
        );
        assert_eq!(cache.get(0), Err(SeedSelectionError::FrontierMissing(0)));
        cache.clear();
        assert!(cache.is_clear());
        cache.publish(1, ReachSet::with_size(3)).unwrap();
        assert_eq!(cache.base_count(1).unwrap(), 0);
    }
}
