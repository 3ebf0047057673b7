//! Barrier-synchronized worker pool.
//!
//! One phase = one fork/join: every worker is handed the phase closure on the
//! pool's threads, and [`WorkerPool::run_phase`] returns only after all of
//! them are done. Nothing runs between phases.

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::SeedSelectionError;
use crate::worker::{TraversalWorker, WorkerKind};

/// Fixed set of workers plus the threads that run them.
pub struct WorkerPool {
    threads: ThreadPool,
    workers: Vec<TraversalWorker>,
}

impl WorkerPool {
    pub fn new(workers: Vec<TraversalWorker>) -> Result<Self, SeedSelectionError> {
        let threads = ThreadPoolBuilder::new()
            .num_threads(workers.len().max(1))
            .thread_name(|i| format!("hc-worker-{i}"))
            .build()
            .map_err(|e| SeedSelectionError::WorkerPool(e.to_string()))?;
        for (i, w) in workers.iter().enumerate() {
            debug!("> mapping: worker {i}\t-> {:?}", w.kind());
        }
        Ok(Self { threads, workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Number of workers of `kind`.
    pub fn count(&self, kind: WorkerKind) -> usize {
        self.workers.iter().filter(|w| w.kind() == kind).count()
    }

    /// Run `phase` once on every worker and wait for all of them.
    ///
    /// Returns the error of the lowest-indexed failing worker.
    pub fn run_phase<F>(&mut self, phase: F) -> Result<(), SeedSelectionError>
    where
        F: Fn(&mut TraversalWorker) -> Result<(), SeedSelectionError> + Sync,
    {
        let mut outcomes: Vec<Result<(), SeedSelectionError>> =
            (0..self.workers.len()).map(|_| Ok(())).collect();
        let phase = &phase;
        let workers = &mut self.workers;
        self.threads.scope(|s| {
            for (worker, outcome) in workers.iter_mut().zip(outcomes.iter_mut()) {
                s.spawn(move |_| *outcome = phase(worker));
            }
        });
        outcomes.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::CpuWorker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_worker_runs_once_per_phase() {
        let workers = (0..3).map(|_| TraversalWorker::from(CpuWorker::new(4))).collect();
        let mut pool = WorkerPool::new(workers).unwrap();
        let calls = AtomicUsize::new(0);
        for _ in 0..5 {
            pool.run_phase(|_| {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 15);
        assert_eq!(pool.count(WorkerKind::Cpu), 3);
    }

    #[test]
    fn phase_error_is_reported_after_join() {
        let workers = (0..2).map(|_| TraversalWorker::from(CpuWorker::new(4))).collect();
        let mut pool = WorkerPool::new(workers).unwrap();
        let done = AtomicUsize::new(0);
        let res = pool.run_phase(|_| {
            done.fetch_add(1, Ordering::Relaxed);
            Err(SeedSelectionError::FrontierMissing(7))
        });
        assert_eq!(res, Err(SeedSelectionError::FrontierMissing(7)));
        assert_eq!(done.load(Ordering::Relaxed), 2);
    }
}
