//! SeedSelectionError: unified error type for the hillclimb public API.
//!
//! Every failure is fatal for the run. Configuration errors are reported
//! before the first round, resource errors at construction, and
//! synchronization errors abort mid-run with no partial result.

use thiserror::Error;

/// Unified error type for seed selection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedSelectionError {
    /// More seeds were requested than the graph has vertices.
    #[error("Configuration error: requested {k} seeds but the graph has {vertices} vertices")]
    TooManySeeds { k: usize, vertices: usize },
    /// A rank entered selection without any diffusion sample.
    #[error("Configuration error: rank {rank} has no diffusion samples")]
    NoSamples { rank: usize },
    /// Neither CPU nor GPU workers were configured.
    #[error("Configuration error: at least one traversal worker is required")]
    NoWorkers,
    /// An edge mask does not cover exactly the edges of the graph.
    #[error("Configuration error: sample {sample} masks {got} edges, graph has {expected}")]
    MaskLength {
        sample: usize,
        expected: usize,
        got: usize,
    },
    /// Ranks disagree on a value that must be identical cohort-wide.
    #[error("Configuration error: ranks disagree on {0}")]
    InconsistentConfig(String),
    /// The worker thread pool could not be built.
    #[error("Resource error: worker pool: {0}")]
    WorkerPool(String),
    /// A traversal device failed to allocate, transfer or launch.
    #[error("Resource error: device {device}: {reason}")]
    Device { device: usize, reason: String },
    /// The score window could not be created.
    #[error("Resource error: score window: {0}")]
    Window(String),
    /// A collective or one-sided operation failed.
    #[error("Synchronization error: {0}")]
    Communication(String),
    /// A window operation was issued in the wrong epoch state.
    #[error("Synchronization error: {0}")]
    EpochState(&'static str),
    /// Two workers built the frontier of the same sample in one round.
    #[error("Frontier for sample {0} was written twice in one round")]
    FrontierRewritten(usize),
    /// The counting phase read a frontier that was never built.
    #[error("Frontier for sample {0} has not been built this round")]
    FrontierMissing(usize),
}
