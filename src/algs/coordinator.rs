//! The per-rank driver of a distributed Floyd-Warshall run.
//!
//! Every rank runs the same state machine
//! `Loading → Scattering → Iterating(0..n) → Gathering → Done`. Rounds are executed strictly in
//! increasing pivot order; each round is one pivot distribution followed by one local
//! relaxation, and no rank starts round `k + 1` before the round-`k + 1` broadcast delivered
//! fresh pivot data.

use crate::algs::communicator::{Communicator, run_local};
use crate::algs::distribute::scatter_blocks;
use crate::algs::gather::BlockGatherer;
use crate::algs::pivot::PivotExchange;
use crate::algs::relax::RelaxPool;
use crate::algs::wire::{STATUS_LOAD_FAILED, STATUS_OK, WIRE_VERSION, WireRunHeader};
use crate::apsp_error::ApspError;
use crate::config::{Residency, RunConfig};
use crate::data::matrix::DistanceMatrix;
use crate::debug_invariants::DebugInvariants;
use crate::partitioning::ProcessGrid;
use bytemuck::Zeroable;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Where a rank is in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Loading,
    Scattering,
    Iterating { round: usize },
    Gathering,
    Done,
}

/// Per-rank counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub rounds: usize,
    pub elapsed: Duration,
    /// Bytes this rank moved through pivot broadcasts.
    pub pivot_bytes: u64,
    /// Cells of this rank's block improved over all rounds.
    pub improved_cells: u64,
}

/// Result of [`Coordinator::run`]: the matrix only exists on the root.
#[derive(Debug)]
pub struct RunOutcome {
    pub matrix: Option<DistanceMatrix>,
    pub stats: RunStats,
}

pub struct Coordinator<'c, C> {
    world: &'c C,
    config: RunConfig,
    phase: Phase,
}

impl<'c, C: Communicator> Coordinator<'c, C> {
    pub fn new(world: &'c C, config: RunConfig) -> Self {
        Self {
            world,
            config,
            phase: Phase::Loading,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn enter(&mut self, next: Phase) {
        log::debug!("rank {}: {:?} -> {:?}", self.world.rank(), self.phase, next);
        self.phase = next;
    }

    /// Run with an in-memory matrix; `matrix` is read on the root only.
    pub fn run(&mut self, matrix: Option<DistanceMatrix>) -> Result<RunOutcome, ApspError> {
        self.run_loaded(move || {
            matrix.ok_or_else(|| ApspError::Comm("root rank was given no matrix".into()))
        })
    }

    /// Collective: run the whole computation. `load` is called on the root only; a load failure
    /// is broadcast so every rank stops before any scatter or relaxation.
    pub fn run_loaded<F>(&mut self, load: F) -> Result<RunOutcome, ApspError>
    where
        F: FnOnce() -> Result<DistanceMatrix, ApspError>,
    {
        if self.phase != Phase::Loading {
            return Err(ApspError::Comm(format!(
                "coordinator already ran (phase {:?})",
                self.phase
            )));
        }
        let world = self.world;
        let rank = world.rank();
        let root = self.config.root;
        self.config.validate(world.size())?;

        let started = Instant::now();
        let mut loaded = (rank == root).then(load);

        let mut header = match &loaded {
            Some(Ok(m)) => WireRunHeader::new(STATUS_OK, m.order()),
            Some(Err(_)) => WireRunHeader::new(STATUS_LOAD_FAILED, 0),
            None => WireRunHeader::zeroed(),
        };
        world.broadcast(root, header.as_bytes_mut())?;
        if header.version() != WIRE_VERSION {
            return Err(ApspError::Wire(format!(
                "run header version {} (expected {WIRE_VERSION})",
                header.version()
            )));
        }
        let mut matrix = match loaded.take() {
            Some(Err(e)) => return Err(e),
            Some(Ok(m)) => Some(m),
            None if header.status() != STATUS_OK => {
                return Err(ApspError::RootAborted { root });
            }
            None => None,
        };

        let n = header.order();
        let grid = ProcessGrid::new(self.config.decomposition, n, world.size())?;
        grid.debug_assert_invariants();
        let pool = RelaxPool::new(self.config.threads)?;
        if rank == root {
            log::info!(
                "apsp: n = {n}, {} processes, {} decomposition, {} blocks, {} threads/process",
                world.size(),
                self.config.decomposition,
                self.config.residency,
                pool.threads()
            );
        }

        self.enter(Phase::Scattering);
        let mut block = scatter_blocks(world, &grid, root, matrix.as_ref())?;
        block.debug_assert_invariants();
        let mut pivots = PivotExchange::open(world, grid, &self.config)?;
        let mut gatherer = BlockGatherer::new(grid, root);

        let mut stats = RunStats::default();
        for k in 0..n {
            self.enter(Phase::Iterating { round: k });
            let bufs = pivots.distribute(world, k, &block, matrix.as_ref())?;
            let improved = pool.relax_block(block.cells_mut(), &bufs.col, &bufs.row);
            stats.improved_cells += improved as u64;
            if self.config.residency == Residency::RootMerge {
                gatherer.gather(world, &block, matrix.as_mut())?;
            }
            stats.rounds += 1;
        }

        self.enter(Phase::Gathering);
        if self.config.residency == Residency::Resident {
            gatherer.gather(world, &block, matrix.as_mut())?;
        }

        stats.elapsed = started.elapsed();
        stats.pivot_bytes = pivots.bytes_moved();
        self.enter(Phase::Done);
        if rank == root {
            log::info!(
                "apsp: {} rounds in {:.6} s",
                stats.rounds,
                stats.elapsed.as_secs_f64()
            );
        }
        Ok(RunOutcome { matrix, stats })
    }
}

/// Collective convenience wrapper around [`Coordinator::run`].
pub fn run_distributed<C: Communicator>(
    world: &C,
    config: &RunConfig,
    matrix: Option<DistanceMatrix>,
) -> Result<RunOutcome, ApspError> {
    Coordinator::new(world, config.clone()).run(matrix)
}

/// Run on `procs` in-process ranks and return the root's outcome.
///
/// If any rank fails, the root's error is preferred, then the lowest failing rank's.
pub fn run_in_process(
    procs: usize,
    config: &RunConfig,
    matrix: &DistanceMatrix,
) -> Result<RunOutcome, ApspError> {
    let root = config.root;
    let mut results = run_local(procs, |comm| {
        let mine = (comm.rank() == root).then(|| matrix.clone());
        run_distributed(&comm, config, mine)
    });
    if root < results.len() && results[root].is_err() {
        return results.swap_remove(root);
    }
    if let Some(pos) = results.iter().position(|r| r.is_err()) {
        return results.swap_remove(pos);
    }
    if root >= results.len() {
        return Err(crate::config::ConfigError::RootOutOfRange { root, procs }.into());
    }
    results.swap_remove(root)
}
