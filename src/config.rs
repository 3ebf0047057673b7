//! Run configuration.
//!
//! Plain structs with `Default`, deserializable so a driver can load them
//! from JSON. Command-line parsing lives with the caller.

use serde::{Deserialize, Serialize};

use crate::error::SeedSelectionError;

/// Parameters of one hill-climbing run. Must be identical on every rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingConfig {
    /// Number of seeds to select.
    pub k: usize,
    /// Total diffusion samples across the cohort; each rank draws
    /// `samples / world_size`, at least one.
    pub samples: usize,
    pub cpu_workers: usize,
    pub gpu_workers: usize,
    /// Base seed for sample generation.
    pub seed: u64,
    pub device: DeviceConfig,
}

impl Default for HillClimbingConfig {
    fn default() -> Self {
        Self {
            k: 10,
            samples: 256,
            cpu_workers: 4,
            gpu_workers: 0,
            seed: 42,
            device: DeviceConfig::default(),
        }
    }
}

impl HillClimbingConfig {
    /// Local sanity checks against a graph of `num_vertices` vertices.
    pub fn validate(&self, num_vertices: usize) -> Result<(), SeedSelectionError> {
        if self.k > num_vertices {
            return Err(SeedSelectionError::TooManySeeds {
                k: self.k,
                vertices: num_vertices,
            });
        }
        if self.samples == 0 {
            return Err(SeedSelectionError::NoSamples { rank: 0 });
        }
        if self.cpu_workers + self.gpu_workers == 0 {
            return Err(SeedSelectionError::NoWorkers);
        }
        Ok(())
    }

    /// Samples drawn by each of `world_size` ranks.
    pub fn samples_per_rank(&self, world_size: usize) -> usize {
        if self.samples == 0 {
            return 0;
        }
        (self.samples / world_size.max(1)).max(1)
    }
}

/// Geometry and capacity of traversal devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Devices available per node; GPU worker `i` uses device `i % devices`.
    pub devices: usize,
    /// Thread blocks a device runs at once, shared by its workers.
    pub max_blocks: usize,
    /// Threads per block.
    pub block_size: usize,
    /// Bytes a device may allocate; `None` for unlimited.
    pub memory_limit: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            devices: 1,
            max_blocks: 80,
            block_size: 256,
            memory_limit: None,
        }
    }
}

impl DeviceConfig {
    /// Share of the grid given to each of `workers` workers.
    pub fn per_worker(&self, workers: usize) -> Self {
        Self {
            max_blocks: (self.max_blocks / workers.max(1)).max(1),
            ..*self
        }
    }
}
