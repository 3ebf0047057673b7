//! Greedy seed selection engine.
//!
//! Each of the `k` rounds runs four steps:
//!
//! 1. **Frontier**: every worker drains the cursor over samples, building the
//!    reachability set of the current seed set per sample. Purely local.
//! 2. **Counting**: for every ownership block in rank-shifted order, and every
//!    sample, workers drain the cursor over the block's vertices, adding each
//!    candidate's spread into the local scores; the block's sums are then
//!    flushed to its owner.
//! 3. **Selection**: the epoch closes and the cohort agrees on the best vertex.
//! 4. **Commit**: the winner joins the seed set and all transient state is
//!    dropped.
//!
//! Every rank runs the same number of rounds, blocks and epochs; a rank that
//! diverges stalls the cohort.

use std::time::Instant;

use log::{debug, info, trace};

use crate::accumulator::ScoreAccumulator;
use crate::bitrow::EdgeMask;
use crate::config::HillClimbingConfig;
use crate::cursor::TaskCursor;
use crate::error::SeedSelectionError;
use crate::frontier::FrontierCache;
use crate::graph::InfluenceGraph;
use crate::pool::WorkerPool;
use crate::record::{ExecutionRecord, RoundRecord};
use crate::sampling::SampleProvider;
use crate::scores::LocalScores;
use crate::seeds::SeedSet;
use crate::window::ScoreWindow;
use crate::worker::{
    CpuWorker, GpuWorker, HostDevice, RoundContext, TraversalWorker, WorkerKind,
};

/// Columns of the cohort-wide configuration table.
const CONFIG_COLUMNS: usize = 7;

/// Drives the greedy rounds over a fixed cohort of ranks and workers.
pub struct SeedSelectionEngine<'g, G, W>
where
    G: InfluenceGraph + ?Sized,
    W: ScoreWindow,
{
    graph: &'g G,
    pool: WorkerPool,
    accumulator: ScoreAccumulator<W>,
    local: LocalScores,
    cursor: TaskCursor,
}

impl<'g, G, W> SeedSelectionEngine<'g, G, W>
where
    G: InfluenceGraph + ?Sized,
    W: ScoreWindow,
{
    /// Build `cfg.cpu_workers` CPU workers and `cfg.gpu_workers` GPU workers
    /// on [`HostDevice`]s.
    pub fn new(
        graph: &'g G,
        cfg: &HillClimbingConfig,
        window: W,
    ) -> Result<Self, SeedSelectionError> {
        let mut workers = Vec::with_capacity(cfg.cpu_workers + cfg.gpu_workers);
        for _ in 0..cfg.cpu_workers {
            workers.push(TraversalWorker::from(CpuWorker::new(graph.num_vertices())));
        }
        let devices = cfg.device.devices.max(1);
        let device_cfg = cfg.device.per_worker(cfg.gpu_workers);
        for i in 0..cfg.gpu_workers {
            let device_id = i % devices;
            debug!(
                "> mapping: worker {}\t-> GPU {}/{}",
                i + cfg.cpu_workers,
                device_id,
                devices
            );
            let device = HostDevice::new(graph, device_id, device_cfg)?;
            workers.push(GpuWorker::new(graph, Box::new(device)).into());
        }
        Self::with_workers(graph, workers, window)
    }

    /// Engine over caller-built workers.
    pub fn with_workers(
        graph: &'g G,
        workers: Vec<TraversalWorker>,
        window: W,
    ) -> Result<Self, SeedSelectionError> {
        let accumulator = ScoreAccumulator::new(window, graph.num_vertices())?;
        debug!("Number of workers = {}", workers.len());
        Ok(Self {
            graph,
            pool: WorkerPool::new(workers)?,
            local: LocalScores::new(accumulator.partition().block_size()),
            accumulator,
            cursor: TaskCursor::new(),
        })
    }

    pub fn accumulator(&self) -> &ScoreAccumulator<W> {
        &self.accumulator
    }

    /// Select `k` seeds from `samples`, in selection order.
    ///
    /// Collective: every rank must call this with the same `k`.
    pub fn exec(
        &mut self,
        samples: &[EdgeMask],
        k: usize,
        record: &mut ExecutionRecord,
    ) -> Result<Vec<usize>, SeedSelectionError> {
        trace!("Start Seed Selection");
        self.validate(samples, k)?;

        let mut seeds = SeedSet::new(self.graph.num_vertices());
        let mut frontier = FrontierCache::new(samples.len());
        for round in 0..k {
            debug_assert!(frontier.is_clear() && self.local.is_zero());
            let entry = self.round(round, samples, &seeds, &frontier)?;
            seeds.insert(entry.seed);
            frontier.clear();
            record.rounds.push(entry);
        }
        record.epochs = self.accumulator.epochs_closed();
        trace!("End Seed Selection");
        Ok(seeds.into_vec())
    }

    fn round(
        &mut self,
        round: usize,
        samples: &[EdgeMask],
        seeds: &SeedSet,
        frontier: &FrontierCache,
    ) -> Result<RoundRecord, SeedSelectionError> {
        let ctx = RoundContext {
            graph: self.graph,
            samples,
            seeds,
            frontier,
            scores: &self.local,
            cursor: &self.cursor,
        };

        let started = Instant::now();
        self.cursor.reset();
        self.pool.run_phase(|w| w.build_frontier(&ctx))?;
        let frontier_time = started.elapsed();

        let started = Instant::now();
        let rank = self.accumulator.rank();
        let partition = *self.accumulator.partition();
        self.accumulator.open_epoch()?;
        for block in partition.visit_order(rank) {
            info!("Rank {rank} - Block {block}");
            let range = partition.block_range(block);
            if !range.is_empty() {
                for sample in 0..samples.len() {
                    let base = frontier.base_count(sample)?;
                    self.cursor.reset();
                    self.pool
                        .run_phase(|w| w.build_counters(&ctx, range.clone(), sample, base))?;
                }
            }
            self.accumulator.flush(block, &self.local)?;
        }
        let counting = started.elapsed();

        let started = Instant::now();
        let winner = self.accumulator.select(seeds)?;
        info!(
            "round {round}: rank {} picks vertex {} (score {})",
            rank, winner.vertex, winner.score
        );
        Ok(RoundRecord {
            seed: winner.vertex,
            score: winner.score,
            frontier: frontier_time,
            counting,
            selection: started.elapsed(),
        })
    }

    /// Cohort-wide configuration check; every rank reaches the same verdict.
    fn validate(&mut self, samples: &[EdgeMask], k: usize) -> Result<(), SeedSelectionError> {
        let n = self.graph.num_vertices();
        let m = self.graph.num_edges();
        let bad_mask = samples.iter().position(|s| s.len() != m);
        let local: [i64; CONFIG_COLUMNS] = [
            k as i64,
            n as i64,
            self.pool.count(WorkerKind::Cpu) as i64,
            self.pool.count(WorkerKind::Gpu) as i64,
            samples.len() as i64,
            bad_mask.map_or(-1, |i| i as i64),
            bad_mask.map_or(-1, |i| samples[i].len() as i64),
        ];
        let table = self.accumulator.all_gather(&local)?;
        let rows: Vec<&[i64]> = table.chunks(CONFIG_COLUMNS).collect();

        let labels = ["seed count", "vertex count", "CPU worker count", "GPU worker count"];
        for (col, label) in labels.iter().enumerate() {
            if rows.iter().any(|r| r[col] != rows[0][col]) {
                return Err(SeedSelectionError::InconsistentConfig(format!(
                    "{label}: {:?}",
                    rows.iter().map(|r| r[col]).collect::<Vec<_>>()
                )));
            }
        }
        if k > n {
            return Err(SeedSelectionError::TooManySeeds { k, vertices: n });
        }
        if rows.iter().any(|r| r[2] + r[3] == 0) {
            return Err(SeedSelectionError::NoWorkers);
        }
        if let Some(rank) = rows.iter().position(|r| r[4] == 0) {
            return Err(SeedSelectionError::NoSamples { rank });
        }
        if let Some(row) = rows.iter().find(|r| r[5] >= 0) {
            return Err(SeedSelectionError::MaskLength {
                sample: row[5] as usize,
                expected: m,
                got: row[6] as usize,
            });
        }
        Ok(())
    }
}

/// Run seed selection over precomputed samples and time it into `record`.
pub fn seed_selection<G, W>(
    graph: &G,
    samples: &[EdgeMask],
    cfg: &HillClimbingConfig,
    window: W,
    record: &mut ExecutionRecord,
) -> Result<Vec<usize>, SeedSelectionError>
where
    G: InfluenceGraph + ?Sized,
    W: ScoreWindow,
{
    let mut engine = SeedSelectionEngine::new(graph, cfg, window)?;
    let start = Instant::now();
    let seeds = engine.exec(samples, cfg.k, record)?;
    record.seed_selection = start.elapsed();
    Ok(seeds)
}

/// Full hill climbing: draw this rank's share of the samples, then select.
///
/// `cfg` is checked before any sample is drawn. The verdict is shared with the
/// cohort, so a rank whose configuration passes still fails when another
/// rank's does not.
///
/// `provider` should already be specialized for this rank (for example
/// [`IndependentCascade::for_rank`](crate::sampling::IndependentCascade::for_rank)).
pub fn hill_climbing<G, W, P>(
    graph: &G,
    cfg: &HillClimbingConfig,
    provider: &P,
    mut window: W,
    record: &mut ExecutionRecord,
) -> Result<Vec<usize>, SeedSelectionError>
where
    G: InfluenceGraph + ?Sized,
    W: ScoreWindow,
    P: SampleProvider,
{
    let checked = cfg.validate(graph.num_vertices());
    let verdicts = window.all_gather(&[i64::from(checked.is_err())])?;
    checked?;
    if let Some(rank) = verdicts.iter().position(|&v| v != 0) {
        return Err(SeedSelectionError::InconsistentConfig(format!(
            "configuration rejected on rank {rank}"
        )));
    }

    let count = cfg.samples_per_rank(window.size());
    let start = Instant::now();
    let samples = provider.sample(graph, count)?;
    record.sampling = start.elapsed();
    info!("Done with Sampling");
    seed_selection(graph, &samples, cfg, window, record)
}
