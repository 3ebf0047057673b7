#![cfg_attr(docsrs, feature(doc_cfg))]
//! # hillclimb
//!
//! hillclimb selects `k` seed vertices of a large graph that greedily
//! maximize an estimated influence spread. The spread of a candidate is
//! estimated over a fixed set of sampled diffusion realizations (edge masks),
//! and each greedy round picks the vertex with the largest summed spread.
//!
//! ## Execution model
//! - Intra-node: a fixed pool of CPU and GPU traversal workers drains a
//!   lock-free [`TaskCursor`](cursor::TaskCursor) in fork/join phases.
//! - Inter-node: vertex ids are split into per-rank ownership blocks; every
//!   rank scores every block against its own samples and adds the sums into
//!   the owner through a [`ScoreWindow`](window::ScoreWindow). The cohort then
//!   agrees on one winner per round: highest score, lower rank on ties.
//! - Backends: [`SerialWindow`](window::SerialWindow) for one rank,
//!   [`LocalWindow`](window::LocalWindow) for several ranks on threads of one
//!   process, and `MpiWindow` behind the `mpi-support` feature.
//!
//! ## Determinism
//!
//! For a fixed graph, sample set and topology the seed set and the order in
//! which seeds are picked are reproducible. Sample providers derive their
//! randomness from a configured seed only.
//!
//! ## Usage
//! ```
//! use hillclimb::prelude::*;
//!
//! let graph = CsrGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
//! let samples = vec![EdgeMask::full(graph.num_edges())];
//! let cfg = HillClimbingConfig { k: 1, cpu_workers: 2, ..Default::default() };
//! let mut record = ExecutionRecord::default();
//! let window = SerialWindow::new(BlockPartition::new(graph.num_vertices(), 1).block_size());
//! let seeds = seed_selection(&graph, &samples, &cfg, window, &mut record).unwrap();
//! assert_eq!(seeds, vec![0]);
//! ```

pub mod accumulator;
pub mod bitrow;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod graph;
pub mod partition;
pub mod pool;
pub mod record;
pub mod sampling;
pub mod scores;
pub mod seeds;
pub mod window;
pub mod worker;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::accumulator::{Candidate, ScoreAccumulator};
    pub use crate::bitrow::{BitRow, EdgeMask, ReachSet};
    pub use crate::config::{DeviceConfig, HillClimbingConfig};
    pub use crate::cursor::TaskCursor;
    pub use crate::engine::{SeedSelectionEngine, hill_climbing, seed_selection};
    pub use crate::error::SeedSelectionError;
    pub use crate::graph::{CsrGraph, InfluenceGraph};
    pub use crate::partition::BlockPartition;
    pub use crate::record::{ExecutionRecord, RoundRecord};
    pub use crate::sampling::{IndependentCascade, SampleProvider};
    #[cfg(feature = "mpi-support")]
    pub use crate::window::MpiWindow;
    pub use crate::window::{LocalWindow, ScoreWindow, SerialWindow};
    pub use crate::worker::{
        CpuWorker, GpuWorker, HostDevice, TraversalDevice, TraversalWorker, WorkerKind,
    };
}
