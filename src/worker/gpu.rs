//! GPU traversal worker.
//!
//! Each claimed sample or vertex launches one device traversal, followed by
//! an explicit synchronize before the result is read back. The live-edge
//! mask changes from sample to sample, so the edge filter is re-uploaded
//! every time a batch switches masks.

use std::ops::Range;

use log::debug;

use super::RoundContext;
use super::device::{TraversalDevice, WORD_BITS};
use crate::bitrow::{EdgeMask, ReachSet};
use crate::error::SeedSelectionError;
use crate::graph::InfluenceGraph;

/// Worker delegating traversals to a [`TraversalDevice`].
pub struct GpuWorker {
    device: Box<dyn TraversalDevice>,
    num_vertices: usize,
    edge_filter: Vec<u32>,
    visited: Vec<u32>,
    base_bitmap: Vec<u32>,
}

impl GpuWorker {
    /// The device parallelizes each traversal; the outer batch only needs to
    /// keep it busy.
    pub const BATCH_SIZE: usize = 2;

    pub fn new<G>(graph: &G, device: Box<dyn TraversalDevice>) -> Self
    where
        G: InfluenceGraph + ?Sized,
    {
        let words = device.bitmap_words();
        debug!("GPU worker on device {}", device.device_id());
        Self {
            num_vertices: graph.num_vertices(),
            edge_filter: vec![0; graph.num_edges()],
            visited: vec![0; words],
            base_bitmap: vec![0; words],
            device,
        }
    }

    fn upload_mask(&mut self, mask: &EdgeMask) -> Result<(), SeedSelectionError> {
        for (e, slot) in self.edge_filter.iter_mut().enumerate() {
            *slot = u32::from(mask.get(e));
        }
        self.device.upload_edge_filter(&self.edge_filter)
    }

    fn run(&mut self, sources: &[u32], base_count: u32) -> Result<u32, SeedSelectionError> {
        self.device.launch_traversal(sources, base_count)?;
        self.device.synchronize()?;
        self.device.read_visited(&mut self.visited)
    }

    pub fn build_frontier<G>(&mut self, ctx: &RoundContext<'_, G>) -> Result<(), SeedSelectionError>
    where
        G: InfluenceGraph + ?Sized,
    {
        let sources: Vec<u32> = ctx.seeds.as_slice().iter().map(|&s| s as u32).collect();
        for batch in ctx.cursor.batches(Self::BATCH_SIZE, ctx.samples.len()) {
            for sample in batch {
                self.upload_mask(&ctx.samples[sample])?;
                self.visited.iter_mut().for_each(|w| *w = 0);
                self.device.upload_visited(&self.visited)?;
                self.run(&sources, 0)?;

                let mut reach = ReachSet::with_size(self.num_vertices);
                for v in 0..self.num_vertices {
                    if (self.visited[v / WORD_BITS] >> (v % WORD_BITS)) & 1 == 1 {
                        reach.set(v);
                    }
                }
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
        let mut prepared = false;
        for batch in ctx.cursor.batches(Self::BATCH_SIZE, block.len()) {
            if !prepared {
                self.upload_mask(&ctx.samples[sample])?;
                self.base_bitmap.iter_mut().for_each(|w| *w = 0);
                for v in frontier.ones() {
                    self.base_bitmap[v / WORD_BITS] |= 1 << (v % WORD_BITS);
                }
                prepared = true;
            }
            for slot in batch {
                let v = block.start + slot;
                if ctx.seeds.contains(v) {
                    continue;
                }
                let count = if frontier.get(v) {
                    base_count
                } else {
                    self.device.upload_visited(&self.base_bitmap)?;
                    self.run(&[v as u32], base_count as u32)? as usize
                };
                ctx.scores.add(slot, count as i64);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::worker::device::HostDevice;
    use crate::worker::test_support::chain_fixture;
    use crate::worker::{CpuWorker, TraversalWorker};

    fn gpu_for(f: &crate::worker::test_support::Fixture) -> GpuWorker {
        let dev = HostDevice::new(&f.graph, 0, DeviceConfig::default()).unwrap();
        GpuWorker::new(&f.graph, Box::new(dev))
    }

    #[test]
    fn gpu_and_cpu_agree_on_frontiers_and_counts() {
        for seeds in [&[][..], &[0][..], &[2, 4][..]] {
            let cpu = chain_fixture(seeds);
            let gpu = chain_fixture(seeds);
            let mut cw = TraversalWorker::from(CpuWorker::new(5));
            let mut gw = TraversalWorker::from(gpu_for(&gpu));
            cw.build_frontier(&cpu.ctx()).unwrap();
            gw.build_frontier(&gpu.ctx()).unwrap();
            for sample in 0..2 {
                assert_eq!(cpu.frontier.get(sample), gpu.frontier.get(sample));
                let base = cpu.frontier.base_count(sample).unwrap();
                cpu.cursor.reset();
                gpu.cursor.reset();
                cw.build_counters(&cpu.ctx(), 0..5, sample, base).unwrap();
                gw.build_counters(&gpu.ctx(), 0..5, sample, base).unwrap();
            }
            assert_eq!(cpu.scores(), gpu.scores(), "seeds = {seeds:?}");
        }
    }

    #[test]
    fn batch_sizes_by_kind() {
        let f = chain_fixture(&[]);
        let w = TraversalWorker::from(gpu_for(&f));
        assert_eq!(w.batch_size(), 2);
        assert_eq!(w.kind(), crate::worker::WorkerKind::Gpu);
        assert_eq!(TraversalWorker::from(CpuWorker::new(5)).batch_size(), 8);
    }
}
