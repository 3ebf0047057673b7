//! Vertex ownership blocks.
//!
//! Vertex ids `0..n` are split into `world_size` contiguous blocks of
//! `ceil(n / world_size)` ids. Block `p` belongs to rank `p`; the last blocks
//! may be short or empty when `n` is not a multiple of `world_size`.

use std::ops::Range;

/// Block decomposition of the vertex id space across ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPartition {
    num_vertices: usize,
    world_size: usize,
    block_size: usize,
}

impl BlockPartition {
    /// # Panics
    /// Panics if `world_size == 0`.
    pub fn new(num_vertices: usize, world_size: usize) -> Self {
        assert!(world_size > 0, "world size must be positive");
        Self {
            num_vertices,
            world_size,
            block_size: num_vertices.div_ceil(world_size).max(1),
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Rank owning vertex `v`.
    #[inline]
    pub fn owner(&self, v: usize) -> usize {
        v / self.block_size
    }

    /// Slot of `v` inside its owner's block.
    #[inline]
    pub fn offset(&self, v: usize) -> usize {
        v % self.block_size
    }

    /// Global id of slot `offset` in block `rank`.
    #[inline]
    pub fn global_id(&self, rank: usize, offset: usize) -> usize {
        rank * self.block_size + offset
    }

    /// Vertex ids owned by `rank`; empty past the end of the id space.
    pub fn block_range(&self, rank: usize) -> Range<usize> {
        let start = (rank * self.block_size).min(self.num_vertices);
        let end = (start + self.block_size).min(self.num_vertices);
        start..end
    }

    /// Blocks in the order `rank` visits them: `(p + rank) % world_size`.
    pub fn visit_order(&self, rank: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.world_size).map(move |p| (p + rank) % self.world_size)
    }
}
