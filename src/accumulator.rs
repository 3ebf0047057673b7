//! Distributed score accumulation and the cross-rank argmax.
//!
//! Per round the accumulator opens one epoch, receives one flush per
//! ownership block (in the rank-shifted visiting order chosen by the engine),
//! then closes the epoch, scans the rank's owned block, clears its buffers and
//! agrees with the rest of the cohort on a single winner.
//!
//! The winner rule: highest score; on equal scores the lower rank wins, and
//! within one rank the lower vertex id wins. Since blocks are contiguous by
//! rank this is the lowest global id among the maxima. The rule is applied
//! here on a gathered table rather than left to a reduction primitive.

use log::{debug, info};

use crate::error::SeedSelectionError;
use crate::partition::BlockPartition;
use crate::scores::LocalScores;
use crate::seeds::SeedSet;
use crate::window::ScoreWindow;

/// One rank's best vertex for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub score: i64,
    pub vertex: usize,
    pub rank: usize,
}

impl Candidate {
    const WIDTH: usize = 3;

    /// True if `self` should be selected over `other`.
    pub fn beats(&self, other: &Candidate) -> bool {
        (self.score, std::cmp::Reverse(self.rank), std::cmp::Reverse(self.vertex))
            > (other.score, std::cmp::Reverse(other.rank), std::cmp::Reverse(other.vertex))
    }

    /// Winner among per-rank proposals; `None` entries are ranks without one.
    pub fn best_of<I>(proposals: I) -> Option<Candidate>
    where
        I: IntoIterator<Item = Option<Candidate>>,
    {
        proposals
            .into_iter()
            .flatten()
            .fold(None, |best: Option<Candidate>, c| match best {
                Some(b) if !c.beats(&b) => Some(b),
                _ => Some(c),
            })
    }

    fn encode(proposal: Option<Candidate>, rank: usize) -> [i64; Self::WIDTH] {
        match proposal {
            Some(c) => [c.score, c.vertex as i64, c.rank as i64],
            None => [i64::MIN, -1, rank as i64],
        }
    }

    fn decode(row: &[i64]) -> Option<Candidate> {
        (row[1] >= 0).then(|| Candidate {
            score: row[0],
            vertex: row[1] as usize,
            rank: row[2] as usize,
        })
    }
}

/// Merges rank-local partial sums into owner ranks and picks the global best.
pub struct ScoreAccumulator<W: ScoreWindow> {
    window: W,
    partition: BlockPartition,
    staging: Vec<i64>,
}

impl<W: ScoreWindow> ScoreAccumulator<W> {
    /// Wrap `window` for a graph of `num_vertices` vertices.
    ///
    /// The window's owned buffers must be exactly one ownership block long.
    pub fn new(window: W, num_vertices: usize) -> Result<Self, SeedSelectionError> {
        let partition = BlockPartition::new(num_vertices, window.size());
        if window.block_len() != partition.block_size() {
            return Err(SeedSelectionError::Window(format!(
                "window holds {} scores per rank, ownership blocks need {}",
                window.block_len(),
                partition.block_size()
            )));
        }
        debug!(
            "rank {}/{}: block size {}",
            window.rank(),
            window.size(),
            partition.block_size()
        );
        Ok(Self {
            staging: vec![0; partition.block_size()],
            window,
            partition,
        })
    }

    pub fn partition(&self) -> &BlockPartition {
        &self.partition
    }

    pub fn rank(&self) -> usize {
        self.window.rank()
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn epochs_closed(&self) -> usize {
        self.window.epochs_closed()
    }

    /// Start the round's accumulation epoch.
    pub fn open_epoch(&mut self) -> Result<(), SeedSelectionError> {
        self.window.open_epoch()
    }

    /// Send the local sums for `block` to its owner and zero `local`.
    pub fn flush(&mut self, block: usize, local: &LocalScores) -> Result<(), SeedSelectionError> {
        local.drain_into(&mut self.staging);
        self.window.accumulate_sum(block, &self.staging)
    }

    /// Close the epoch and return the cohort-wide winner.
    ///
    /// Clears this rank's owned scores before the agreement step, so the
    /// window is empty again when this returns.
    pub fn select(&mut self, seeds: &SeedSet) -> Result<Candidate, SeedSelectionError> {
        self.window.close_epoch()?;
        self.window.read_owned(&mut self.staging)?;
        let local = self.local_best(seeds);
        self.window.clear_owned()?;
        self.staging.iter_mut().for_each(|s| *s = 0);

        let rank = self.rank();
        if let Some(c) = local {
            info!("R[{}] ({}, {})", rank, c.score, c.vertex);
        }
        let table = self
            .window
            .all_gather(&Candidate::encode(local, rank))?;
        Candidate::best_of(table.chunks(Candidate::WIDTH).map(Candidate::decode)).ok_or_else(|| {
            SeedSelectionError::Communication("no rank proposed a candidate vertex".into())
        })
    }

    /// Best unselected vertex of this rank's owned block, first index on ties.
    fn local_best(&self, seeds: &SeedSet) -> Option<Candidate> {
        let rank = self.rank();
        let range = self.partition.block_range(rank);
        let start = range.start;
        let mut best: Option<Candidate> = None;
        for v in range.filter(|&v| !seeds.contains(v)) {
            let score = self.staging[v - start];
            if best.is_none_or(|b| score > b.score) {
                best = Some(Candidate {
                    score,
                    vertex: v,
                    rank,
                });
            }
        }
        best
    }

    /// Collective gather used for cohort-wide configuration checks.
    pub fn all_gather(&mut self, local: &[i64]) -> Result<Vec<i64>, SeedSelectionError> {
        self.window.all_gather(local)
    }
}
