//! Traversal workers: the units that drain a [`TaskCursor`] during a phase.
//!
//! A worker is either a CPU worker or a GPU worker; both answer the same two
//! phase calls and dispatch happens through [`TraversalWorker`]'s match.
//! Workers only own scratch state. Everything shared across workers of a
//! round (graph, samples, seed set, frontier cache, local scores, cursor)
//! travels in a [`RoundContext`].

pub mod cpu;
pub mod device;
pub mod gpu;

use std::ops::Range;

use crate::bitrow::EdgeMask;
use crate::cursor::TaskCursor;
use crate::error::SeedSelectionError;
use crate::frontier::FrontierCache;
use crate::graph::InfluenceGraph;
use crate::scores::LocalScores;
use crate::seeds::SeedSet;

pub use cpu::CpuWorker;
pub use device::{HostDevice, TraversalDevice};
pub use gpu::GpuWorker;

/// Shared, read-mostly state of one greedy round.
pub struct RoundContext<'a, G: InfluenceGraph + ?Sized> {
    pub graph: &'a G,
    pub samples: &'a [EdgeMask],
    pub seeds: &'a SeedSet,
    pub frontier: &'a FrontierCache,
    pub scores: &'a LocalScores,
    pub cursor: &'a TaskCursor,
}

/// Capability of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Cpu,
    Gpu,
}

/// A CPU or GPU traversal worker.
pub enum TraversalWorker {
    Cpu(CpuWorker),
    Gpu(GpuWorker),
}

impl TraversalWorker {
    pub fn kind(&self) -> WorkerKind {
        match self {
            TraversalWorker::Cpu(_) => WorkerKind::Cpu,
            TraversalWorker::Gpu(_) => WorkerKind::Gpu,
        }
    }

    /// Items claimed from the cursor per step.
    pub fn batch_size(&self) -> usize {
        match self {
            TraversalWorker::Cpu(_) => CpuWorker::BATCH_SIZE,
            TraversalWorker::Gpu(_) => GpuWorker::BATCH_SIZE,
        }
    }

    /// Claim samples until the cursor is drained, building each one's frontier.
    pub fn build_frontier<G>(&mut self, ctx: &RoundContext<'_, G>) -> Result<(), SeedSelectionError>
    where
        G: InfluenceGraph + ?Sized,
    {
        match self {
            TraversalWorker::Cpu(w) => w.build_frontier(ctx),
            TraversalWorker::Gpu(w) => w.build_frontier(ctx),
        }
    }

    /// Claim vertices of `block` until drained, adding each candidate's
    /// spread under `sample` into the local scores.
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
        match self {
            TraversalWorker::Cpu(w) => w.build_counters(ctx, block, sample, base_count),
            TraversalWorker::Gpu(w) => w.build_counters(ctx, block, sample, base_count),
        }
    }
}

impl From<CpuWorker> for TraversalWorker {
    fn from(w: CpuWorker) -> Self {
        TraversalWorker::Cpu(w)
    }
}

impl From<GpuWorker> for TraversalWorker {
    fn from(w: GpuWorker) -> Self {
        TraversalWorker::Gpu(w)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::graph::CsrGraph;

    /// Owns everything a [`RoundContext`] borrows.
    pub struct Fixture {
        pub graph: CsrGraph,
        pub samples: Vec<EdgeMask>,
        pub seeds: SeedSet,
        pub frontier: FrontierCache,
        pub scores: LocalScores,
        pub cursor: TaskCursor,
    }

    impl Fixture {
        pub fn new(graph: CsrGraph, samples: Vec<EdgeMask>, seeds: &[usize], block: usize) -> Self {
            let mut set = SeedSet::new(graph.num_vertices());
            for &s in seeds {
                set.insert(s);
            }
            Self {
                frontier: FrontierCache::new(samples.len()),
                scores: LocalScores::new(block),
                cursor: TaskCursor::new(),
                seeds: set,
                graph,
                samples,
            }
        }

        pub fn ctx(&self) -> RoundContext<'_, CsrGraph> {
            RoundContext {
                graph: &self.graph,
                samples: &self.samples,
                seeds: &self.seeds,
                frontier: &self.frontier,
                scores: &self.scores,
                cursor: &self.cursor,
            }
        }

        pub fn scores(&self) -> Vec<i64> {
            (0..self.scores.len()).map(|i| self.scores.get(i)).collect()
        }
    }

    /// `0 -> 1 -> 2 -> 3` plus an isolated `4`, and two samples: all live,
    /// and `1 -> 2` blocked.
    pub fn chain_fixture(seeds: &[usize]) -> Fixture {
        let graph = CsrGraph::from_edges(5, &[(0, 1), (1, 2), (2, 3)]);
        let mut cut = EdgeMask::full(3);
        cut.unset(1);
        Fixture::new(graph, vec![EdgeMask::full(3), cut], seeds, 5)
    }
}
