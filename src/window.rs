//! One-sided score windows: the substrate behind distributed accumulation.
//!
//! Every rank exposes an *owned* buffer of `block_len` scores. Between
//! [`ScoreWindow::open_epoch`] and [`ScoreWindow::close_epoch`] any rank may
//! add a buffer into any target's owned buffer; after the epoch closes each
//! owned buffer holds the full cohort-wide sum. Reading owned scores while an
//! epoch is open is rejected.
//!
//! Backends:
//! - [`SerialWindow`]: world size 1, no communication.
//! - [`LocalWindow`]: one handle per rank inside a single process, each rank
//!   on its own thread; true one-sided `fetch_add` into shared atomics.
//! - `MpiWindow` (feature `mpi-support`): staged accumulation reduced per
//!   target at epoch close.
//!
//! All collective calls block until every rank of the cohort arrives. A rank
//! that stops calling them stalls the rest; there is no recovery.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use crate::error::SeedSelectionError;

/// Distributed accumulation service with epoch fences.
pub trait ScoreWindow {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Length of every owned buffer.
    fn block_len(&self) -> usize;

    /// Collective: start an accumulation epoch.
    fn open_epoch(&mut self) -> Result<(), SeedSelectionError>;

    /// Add `local` element-wise into `target`'s owned buffer.
    ///
    /// Safe for concurrent use by many ranks against one target.
    fn accumulate_sum(&mut self, target: usize, local: &[i64]) -> Result<(), SeedSelectionError>;

    /// Collective: close the epoch; afterwards owned buffers are fully reduced.
    fn close_epoch(&mut self) -> Result<(), SeedSelectionError>;

    /// Copy this rank's owned buffer into `out`. Only valid with no epoch open.
    fn read_owned(&self, out: &mut [i64]) -> Result<(), SeedSelectionError>;

    /// Zero this rank's owned buffer. Only valid with no epoch open.
    fn clear_owned(&mut self) -> Result<(), SeedSelectionError>;

    /// Collective: concatenate every rank's `local` in rank order.
    fn all_gather(&mut self, local: &[i64]) -> Result<Vec<i64>, SeedSelectionError>;

    /// Number of epochs closed so far.
    fn epochs_closed(&self) -> usize;
}

/// Open/closed bookkeeping shared by the backends.
#[derive(Debug, Default, Clone, Copy)]
struct EpochState {
    open: bool,
    closed: usize,
}

impl EpochState {
    fn open(&mut self) -> Result<(), SeedSelectionError> {
        if self.open {
            return Err(SeedSelectionError::EpochState("epoch opened twice"));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SeedSelectionError> {
        if !self.open {
            return Err(SeedSelectionError::EpochState("no epoch to close"));
        }
        self.open = false;
        self.closed += 1;
        Ok(())
    }

    fn require_open(&self) -> Result<(), SeedSelectionError> {
        if self.open {
            Ok(())
        } else {
            Err(SeedSelectionError::EpochState(
                "accumulate outside an open epoch",
            ))
        }
    }

    fn require_closed(&self) -> Result<(), SeedSelectionError> {
        if self.open {
            Err(SeedSelectionError::EpochState(
                "owned scores touched while an epoch is open",
            ))
        } else {
            Ok(())
        }
    }
}

fn check_target(target: usize, size: usize, len: usize, block_len: usize) -> Result<(), SeedSelectionError> {
    if target >= size {
        return Err(SeedSelectionError::Communication(format!(
            "accumulate target {target} outside cohort of {size}"
        )));
    }
    if len != block_len {
        return Err(SeedSelectionError::Communication(format!(
            "accumulate of {len} scores into a window of {block_len}"
        )));
    }
    Ok(())
}

// --- SerialWindow: single rank ---

/// Window for a cohort of exactly one rank.
#[derive(Debug, Clone)]
pub struct SerialWindow {
    owned: Vec<i64>,
    epoch: EpochState,
}

impl SerialWindow {
    pub fn new(block_len: usize) -> Self {
        Self {
            owned: vec![0; block_len],
            epoch: EpochState::default(),
        }
    }
}

impl ScoreWindow for SerialWindow {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn block_len(&self) -> usize {
        self.owned.len()
    }

    fn open_epoch(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.open()
    }

    fn accumulate_sum(&mut self, target: usize, local: &[i64]) -> Result<(), SeedSelectionError> {
        self.epoch.require_open()?;
        check_target(target, 1, local.len(), self.owned.len())?;
        for (dst, src) in self.owned.iter_mut().zip(local) {
            *dst += *src;
        }
        Ok(())
    }

    fn close_epoch(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.close()
    }

    fn read_owned(&self, out: &mut [i64]) -> Result<(), SeedSelectionError> {
        self.epoch.require_closed()?;
        out.copy_from_slice(&self.owned);
        Ok(())
    }

    fn clear_owned(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.require_closed()?;
        self.owned.iter_mut().for_each(|s| *s = 0);
        Ok(())
    }

    fn all_gather(&mut self, local: &[i64]) -> Result<Vec<i64>, SeedSelectionError> {
        Ok(local.to_vec())
    }

    fn epochs_closed(&self) -> usize {
        self.epoch.closed
    }
}

// --- LocalWindow: thread-per-rank cohort in one process ---

struct LocalShared {
    owned: Vec<Vec<AtomicI64>>,
    fence: Barrier,
    gather: Mutex<Vec<Vec<i64>>>,
}

/// One rank's handle onto an in-process cohort.
///
/// Build the whole cohort with [`LocalWindow::cohort`] and move each handle
/// onto its own thread; collective calls block on a shared barrier.
pub struct LocalWindow {
    rank: usize,
    block_len: usize,
    shared: Arc<LocalShared>,
    epoch: EpochState,
}

impl LocalWindow {
    /// Handles for ranks `0..size`, in rank order.
    pub fn cohort(size: usize, block_len: usize) -> Vec<LocalWindow> {
        let shared = Arc::new(LocalShared {
            owned: (0..size)
                .map(|_| (0..block_len).map(|_| AtomicI64::new(0)).collect())
                .collect(),
            fence: Barrier::new(size),
            gather: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| LocalWindow {
                rank,
                block_len,
                shared: Arc::clone(&shared),
                epoch: EpochState::default(),
            })
            .collect()
    }

    fn fence(&self) {
        self.shared.fence.wait();
    }
}

impl ScoreWindow for LocalWindow {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.owned.len()
    }

    fn block_len(&self) -> usize {
        self.block_len
    }

    fn open_epoch(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.open()?;
        self.fence();
        Ok(())
    }

    fn accumulate_sum(&mut self, target: usize, local: &[i64]) -> Result<(), SeedSelectionError> {
        self.epoch.require_open()?;
        check_target(target, self.size(), local.len(), self.block_len)?;
        for (dst, &src) in self.shared.owned[target].iter().zip(local) {
            if src != 0 {
                dst.fetch_add(src, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn close_epoch(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.close()?;
        // Barrier wait orders every rank's fetch_add before any read below.
        self.fence();
        Ok(())
    }

    fn read_owned(&self, out: &mut [i64]) -> Result<(), SeedSelectionError> {
        self.epoch.require_closed()?;
        for (dst, src) in out.iter_mut().zip(&self.shared.owned[self.rank]) {
            *dst = src.load(Ordering::Relaxed);
        }
        Ok(())
    }

    fn clear_owned(&mut self) -> Result<(), SeedSelectionError> {
        self.epoch.require_closed()?;
        for slot in &self.shared.owned[self.rank] {
            slot.store(0, Ordering::Relaxed);
        }
        Ok(())
    }

    fn all_gather(&mut self, local: &[i64]) -> Result<Vec<i64>, SeedSelectionError> {
        self.shared.gather.lock()[self.rank] = local.to_vec();
        self.fence();
        let rows = self.shared.gather.lock().clone();
        // Nobody may overwrite a slot until every rank has copied the table.
        self.fence();
        if rows.iter().any(|r| r.len() != local.len()) {
            return Err(SeedSelectionError::Communication(
                "all_gather called with different lengths across ranks".into(),
            ));
        }
        Ok(rows.concat())
    }

    fn epochs_closed(&self) -> usize {
        self.epoch.closed
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Window over an MPI communicator.
    ///
    /// Contributions are staged per target rank and summed into each owner
    /// with one rooted reduction per rank when the epoch closes. MPI errors
    /// abort the job through the communicator's default error handler.
    pub struct MpiWindow {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        block_len: usize,
        owned: Vec<i64>,
        staged: Vec<i64>,
        epoch: EpochState,
    }

    impl MpiWindow {
        /// Create a window over `world`. Collective in spirit: every rank must
        /// pass the same `block_len`.
        pub fn new(world: SimpleCommunicator, block_len: usize) -> Result<Self, SeedSelectionError> {
            let rank = usize::try_from(world.rank())
                .map_err(|_| SeedSelectionError::Window("negative MPI rank".into()))?;
            let size = usize::try_from(world.size())
                .map_err(|_| SeedSelectionError::Window("invalid MPI world size".into()))?;
            let staged_len = size
                .checked_mul(block_len)
                .ok_or_else(|| SeedSelectionError::Window("staging buffer overflows usize".into()))?;
            Ok(Self {
                world,
                rank,
                size,
                block_len,
                owned: vec![0; block_len],
                staged: vec![0; staged_len],
                epoch: EpochState::default(),
            })
        }
    }

    impl ScoreWindow for MpiWindow {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn block_len(&self) -> usize {
            self.block_len
        }

        fn open_epoch(&mut self) -> Result<(), SeedSelectionError> {
            self.epoch.open()?;
            self.world.barrier();
            Ok(())
        }

        fn accumulate_sum(&mut self, target: usize, local: &[i64]) -> Result<(), SeedSelectionError> {
            self.epoch.require_open()?;
            check_target(target, self.size, local.len(), self.block_len)?;
            let start = target * self.block_len;
            for (dst, src) in self.staged[start..start + self.block_len].iter_mut().zip(local) {
                *dst += *src;
            }
            Ok(())
        }

        fn close_epoch(&mut self) -> Result<(), SeedSelectionError> {
            self.epoch.close()?;
            let mut recv = vec![0i64; self.block_len];
            for root in 0..self.size {
                let chunk = &self.staged[root * self.block_len..(root + 1) * self.block_len];
                let process = self.world.process_at_rank(root as i32);
                if root == self.rank {
                    process.reduce_into_root(chunk, &mut recv[..], SystemOperation::sum());
                    for (dst, src) in self.owned.iter_mut().zip(&recv) {
                        *dst += *src;
                    }
                } else {
                    process.reduce_into(chunk, SystemOperation::sum());
                }
            }
            self.staged.iter_mut().for_each(|s| *s = 0);
            Ok(())
        }

        fn read_owned(&self, out: &mut [i64]) -> Result<(), SeedSelectionError> {
            self.epoch.require_closed()?;
            out.copy_from_slice(&self.owned);
            Ok(())
        }

        fn clear_owned(&mut self) -> Result<(), SeedSelectionError> {
            self.epoch.require_closed()?;
            self.owned.iter_mut().for_each(|s| *s = 0);
            Ok(())
        }

        fn all_gather(&mut self, local: &[i64]) -> Result<Vec<i64>, SeedSelectionError> {
            let mut out = vec![0i64; local.len() * self.size];
            self.world.all_gather_into(local, &mut out[..]);
            Ok(out)
        }

        fn epochs_closed(&self) -> usize {
            self.epoch.closed
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiWindow;
