//! CPU traversal worker.

use std::ops::Range;

use super::RoundContext;
use crate::error::SeedSelectionError;
use crate::graph::{InfluenceGraph, TraversalScratch};

/// Worker running breadth-first traversals on the calling thread.
#[derive(Debug, Default)]
pub struct CpuWorker {
    scratch: TraversalScratch,
}

impl CpuWorker {
    /// Claims per step; amortizes cursor contention against per-item BFS cost.
    pub const BATCH_SIZE: usize = 8;

    pub fn new(num_vertices: usize) -> Self {
        Self {
            scratch: TraversalScratch::new(num_vertices),
        }
    }

    pub fn build_frontier<G>(&mut self, ctx: &RoundContext<'_, G>) -> Result<(), SeedSelectionError>
    where
        G: InfluenceGraph + ?Sized,
    {
        for batch in ctx.cursor.batches(Self::BATCH_SIZE, ctx.samples.len()) {
            for sample in batch {
                let reach = ctx
                    .graph
                    .reach_from_seeds(&ctx.samples[sample], ctx.seeds.as_slice());
                ctx.frontier.publish(sample, reach)?;
            }
        }
        Ok(())
    }

    pub fn build_counters<G>(
        &mut self,
        ctx: &RoundContext<'_, G>,
        block: Range<usize>,
        sample: usize,
        base_count: usize,
    ) -> Result<(), SeedSelectionError>
    where
        G: InfluenceGraph + ?Sized,
    {
        let frontier = ctx.frontier.get(sample)?;
        let mask = &ctx.samples[sample];
        for batch in ctx.cursor.batches(Self::BATCH_SIZE, block.len()) {
            for slot in batch {
                let v = block.start + slot;
                if ctx.seeds.contains(v) {
                    continue;
                }
                let count = if frontier.get(v) {
                    base_count
                } else {
                    ctx.graph
                        .extend_reach(mask, v, frontier, base_count, &mut self.scratch)
                };
                ctx.scores.add(slot, count as i64);
            }
        }
        Ok(())
    }
}
