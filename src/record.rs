//! Execution record: timing sink filled in by the engine, owned by the caller.

use std::time::Duration;

use serde::Serialize;

/// Timings and metadata of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionRecord {
    /// Wall-clock time spent generating this rank's samples.
    pub sampling: Duration,
    /// Wall-clock time of the whole selection phase.
    pub seed_selection: Duration,
    /// Accumulation epochs closed during selection.
    pub epochs: usize,
    pub rounds: Vec<RoundRecord>,
}

/// One greedy round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub seed: usize,
    /// Summed spread estimate of the chosen seed over all samples.
    pub score: i64,
    pub frontier: Duration,
    pub counting: Duration,
    pub selection: Duration,
}

impl ExecutionRecord {
    /// Seeds in the order they were chosen.
    pub fn selection_order(&self) -> Vec<usize> {
        self.rounds.iter().map(|r| r.seed).collect()
    }
}
