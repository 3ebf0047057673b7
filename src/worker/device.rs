//! Traversal device interface and the host-emulated device.
//!
//! A device keeps its own copy of the graph, an edge filter (one `u32` per
//! edge, non-zero = live) and a visited bitmap (`u32` words). A traversal is
//! launched asynchronously; its bitmap and count can only be read back after
//! [`TraversalDevice::synchronize`]. Reading before the sync is an error.

use log::trace;

use crate::config::DeviceConfig;
use crate::error::SeedSelectionError;
use crate::graph::InfluenceGraph;

/// Bits per bitmap word.
pub const WORD_BITS: usize = u32::BITS as usize;

/// Accelerator able to run masked breadth-first traversals.
pub trait TraversalDevice: Send {
    fn device_id(&self) -> usize;

    /// Words in the visited bitmap (`ceil(n / 32)`).
    fn bitmap_words(&self) -> usize;

    /// Replace the device edge filter.
    fn upload_edge_filter(&mut self, filter: &[u32]) -> Result<(), SeedSelectionError>;

    /// Replace the device visited bitmap.
    fn upload_visited(&mut self, bitmap: &[u32]) -> Result<(), SeedSelectionError>;

    /// Start a traversal from `sources` over live edges, counting up from
    /// `base_count` for every newly visited vertex.
    fn launch_traversal(&mut self, sources: &[u32], base_count: u32) -> Result<(), SeedSelectionError>;

    /// Wait for the last launch to finish.
    fn synchronize(&mut self) -> Result<(), SeedSelectionError>;

    /// Copy the visited bitmap to `out` and return the visited count.
    fn read_visited(&mut self, out: &mut [u32]) -> Result<u32, SeedSelectionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KernelState {
    Idle,
    InFlight,
    Done,
}

/// Device emulated in host memory.
///
/// Runs a level-synchronous traversal over device-resident CSR arrays; each
/// level is processed in grid-sized chunks of `max_blocks * block_size`
/// vertices.
#[derive(Debug)]
pub struct HostDevice {
    id: usize,
    config: DeviceConfig,
    offsets: Vec<u32>,
    targets: Vec<u32>,
    edge_filter: Vec<u32>,
    visited: Vec<u32>,
    count: u32,
    state: KernelState,
}

impl HostDevice {
    /// Allocate device memory for `graph` on device `id`.
    pub fn new<G>(graph: &G, id: usize, config: DeviceConfig) -> Result<Self, SeedSelectionError>
    where
        G: InfluenceGraph + ?Sized,
    {
        let n = graph.num_vertices();
        let m = graph.num_edges();
        let too_big = |what: &str| SeedSelectionError::Device {
            device: id,
            reason: format!("{what} exceeds the 32-bit device index range"),
        };
        if u32::try_from(n).is_err() {
            return Err(too_big("vertex count"));
        }
        if u32::try_from(m).is_err() {
            return Err(too_big("edge count"));
        }
        let words = n.div_ceil(WORD_BITS);
        let bytes = std::mem::size_of::<u32>() * ((n + 1) + 2 * m + words);
        if let Some(limit) = config.memory_limit {
            if bytes > limit {
                return Err(SeedSelectionError::Device {
                    device: id,
                    reason: format!("allocation of {bytes} bytes exceeds device memory of {limit}"),
                });
            }
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::with_capacity(m);
        offsets.push(0u32);
        for v in 0..n {
            for e in graph.out_edges(v) {
                targets.push(graph.edge_target(e) as u32);
            }
            offsets.push(targets.len() as u32);
        }
        trace!("device {id}: uploaded graph ({n} vertices, {m} edges, {bytes} bytes)");
        Ok(Self {
            id,
            config,
            offsets,
            targets,
            edge_filter: vec![0; m],
            visited: vec![0; words],
            count: 0,
            state: KernelState::Idle,
        })
    }

    fn threads(&self) -> usize {
        self.config.max_blocks.saturating_mul(self.config.block_size).max(1)
    }

    fn error(&self, reason: impl Into<String>) -> SeedSelectionError {
        SeedSelectionError::Device {
            device: self.id,
            reason: reason.into(),
        }
    }

    #[inline]
    fn test_and_set(visited: &mut [u32], v: usize) -> bool {
        let word = &mut visited[v / WORD_BITS];
        let bit = 1u32 << (v % WORD_BITS);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    fn run_kernel(&mut self, sources: &[u32], base_count: u32) {
        let mut count = base_count;
        let mut level: Vec<u32> = Vec::with_capacity(sources.len());
        for &s in sources {
            if Self::test_and_set(&mut self.visited, s as usize) {
                count += 1;
                level.push(s);
            }
        }
        let chunk = self.threads();
        while !level.is_empty() {
            let mut next = Vec::new();
            for grid in level.chunks(chunk) {
                for &u in grid {
                    let u = u as usize;
                    for e in self.offsets[u] as usize..self.offsets[u + 1] as usize {
                        if self.edge_filter[e] == 0 {
                            continue;
                        }
                        let t = self.targets[e];
                        if Self::test_and_set(&mut self.visited, t as usize) {
                            count += 1;
                            next.push(t);
                        }
                    }
                }
            }
            level = next;
        }
        self.count = count;
    }
}

impl TraversalDevice for HostDevice {
    fn device_id(&self) -> usize {
        self.id
    }

    fn bitmap_words(&self) -> usize {
        self.visited.len()
    }

    fn upload_edge_filter(&mut self, filter: &[u32]) -> Result<(), SeedSelectionError> {
        if filter.len() != self.edge_filter.len() {
            return Err(self.error(format!(
                "edge filter of {} entries for {} edges",
                filter.len(),
                self.edge_filter.len()
            )));
        }
        self.edge_filter.copy_from_slice(filter);
        Ok(())
    }

    fn upload_visited(&mut self, bitmap: &[u32]) -> Result<(), SeedSelectionError> {
        if bitmap.len() != self.visited.len() {
            return Err(self.error("visited bitmap size mismatch"));
        }
        if self.state == KernelState::InFlight {
            return Err(self.error("upload while a traversal is in flight"));
        }
        self.visited.copy_from_slice(bitmap);
        Ok(())
    }

    fn launch_traversal(&mut self, sources: &[u32], base_count: u32) -> Result<(), SeedSelectionError> {
        if self.state == KernelState::InFlight {
            return Err(self.error("launch while a traversal is in flight"));
        }
        let n = self.offsets.len() - 1;
        if let Some(&bad) = sources.iter().find(|&&s| s as usize >= n) {
            return Err(self.error(format!("source vertex {bad} out of range")));
        }
        self.run_kernel(sources, base_count);
        self.state = KernelState::InFlight;
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), SeedSelectionError> {
        if self.state == KernelState::InFlight {
            self.state = KernelState::Done;
        }
        Ok(())
    }

    fn read_visited(&mut self, out: &mut [u32]) -> Result<u32, SeedSelectionError> {
        match self.state {
            KernelState::Done => {}
            KernelState::InFlight => return Err(self.error("read back before synchronize")),
            KernelState::Idle => return Err(self.error("read back with no traversal launched")),
        }
        if out.len() != self.visited.len() {
            return Err(self.error("visited bitmap size mismatch"));
        }
        out.copy_from_slice(&self.visited);
        Ok(self.count)
    }
}
