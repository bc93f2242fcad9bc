//! Pivot distribution: the per-round collective that gives every rank the slice of row `k` and
//! column `k` its block needs before it may relax.
//!
//! - Row bands, resident blocks: the band owner of row `k` broadcasts the full row to the world.
//!   Column `k` is already local because each band spans every column.
//! - Grid, resident blocks: the pivot row segment `dist[k][C]` is broadcast down every grid
//!   column from the grid row that holds `k`, and the pivot column segment `dist[R][k]` is
//!   broadcast along every grid row from the grid column that holds `k`. Each rank receives
//!   exactly two `g`-long segments.
//! - Root merge: the root's merged matrix is the only source; it broadcasts `row k ‖ col k` and
//!   every rank slices its own segments.
//!
//! Every branch ends in a blocking broadcast, which is the round's synchronization point.

use crate::algs::communicator::Communicator;
use crate::algs::wire::{cast_slice_mut, distance_bytes};
use crate::apsp_error::ApspError;
use crate::config::{Decomposition, Residency, RunConfig};
use crate::data::block::Block;
use crate::data::matrix::DistanceMatrix;
use crate::partitioning::{BlockBounds, ProcessGrid};
use crate::sentinel::Distance;

/// Pivot data for one round, sized for the local block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotBuffers {
    /// `dist[k][j]` for the block's columns.
    pub row: Vec<Distance>,
    /// `dist[i][k]` for the block's rows.
    pub col: Vec<Distance>,
}

impl PivotBuffers {
    pub fn for_block(b: &BlockBounds) -> Self {
        Self {
            row: vec![0; b.col_count],
            col: vec![0; b.row_count],
        }
    }
}

/// Per-rank state of the pivot protocol: the sub-communicators and the reused buffers.
pub struct PivotExchange<C> {
    grid: ProcessGrid,
    bounds: BlockBounds,
    rank: usize,
    root: usize,
    residency: Residency,
    verify: bool,
    /// Members of this rank's grid row, keyed by grid column (grid + resident only).
    row_group: Option<C>,
    /// Members of this rank's grid column, keyed by grid row (grid + resident only).
    col_group: Option<C>,
    buffers: PivotBuffers,
    staging: Vec<Distance>,
    bytes_moved: u64,
}

impl<C: Communicator> PivotExchange<C> {
    /// Collective: every rank of `world` must call this with the same grid and config.
    pub fn open(world: &C, grid: ProcessGrid, cfg: &RunConfig) -> Result<Self, ApspError> {
        let rank = world.rank();
        let bounds = grid.block_of(rank);
        let (row_group, col_group) =
            if grid.decomposition() == Decomposition::Grid && cfg.residency == Residency::Resident {
                let (r, c) = grid.coords(rank);
                let row_group = world.split(r, c)?;
                let col_group = world.split(c, r)?;
                log::debug!(
                    "rank {rank}: grid ({r}, {c}) row group {}/{} col group {}/{}",
                    row_group.rank(),
                    row_group.size(),
                    col_group.rank(),
                    col_group.size()
                );
                (Some(row_group), Some(col_group))
            } else {
                (None, None)
            };
        let staging = match cfg.residency {
            Residency::RootMerge => vec![0; 2 * grid.order()],
            Residency::Resident => Vec::new(),
        };
        Ok(Self {
            grid,
            bounds,
            rank,
            root: cfg.root,
            residency: cfg.residency,
            verify: cfg.verify_ownership,
            row_group,
            col_group,
            buffers: PivotBuffers::for_block(&bounds),
            staging,
            bytes_moved: 0,
        })
    }

    /// Bytes this rank sent or received through pivot broadcasts so far.
    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved
    }

    /// Collective: fill the pivot buffers for round `k`.
    ///
    /// `authoritative` is the root's merged matrix in root-merge mode and ignored otherwise.
    pub fn distribute(
        &mut self,
        world: &C,
        k: usize,
        block: &Block,
        authoritative: Option<&DistanceMatrix>,
    ) -> Result<&PivotBuffers, ApspError> {
        debug_assert_eq!(block.bounds(), &self.bounds);
        match self.residency {
            Residency::RootMerge => self.from_root(world, k, authoritative)?,
            Residency::Resident => {
                if self.verify {
                    verify_row_owner(world, &self.grid, &self.bounds, k)?;
                }
                match self.grid.decomposition() {
                    Decomposition::Rows => self.row_band(world, k, block)?,
                    Decomposition::Grid => self.grid_segments(k, block)?,
                }
            }
        }
        Ok(&self.buffers)
    }

    fn row_band(&mut self, world: &C, k: usize, block: &Block) -> Result<(), ApspError> {
        let responsible = self.grid.row_owner(k, self.rank);
        if self.rank == responsible {
            let row = block.global_row(k).ok_or_else(|| not_owned(self.rank, k))?;
            self.buffers.row.copy_from_slice(row);
        }
        world.broadcast(responsible, cast_slice_mut(&mut self.buffers.row))?;
        self.bytes_moved += distance_bytes(self.buffers.row.len()) as u64;
        if self.bounds.row_count > 0 {
            block.copy_global_col(k, &mut self.buffers.col)?;
        }
        Ok(())
    }

    fn grid_segments(&mut self, k: usize, block: &Block) -> Result<(), ApspError> {
        let (Some(row_group), Some(col_group)) = (&self.row_group, &self.col_group) else {
            return Err(ApspError::Comm("grid pivot groups were not opened".into()));
        };
        let kr = self.grid.grid_row_of(k);
        let kc = self.grid.grid_col_of(k);

        if col_group.rank() == kr {
            let row = block.global_row(k).ok_or_else(|| not_owned(self.rank, k))?;
            self.buffers.row.copy_from_slice(row);
        }
        col_group.broadcast(kr, cast_slice_mut(&mut self.buffers.row))?;

        if row_group.rank() == kc {
            block.copy_global_col(k, &mut self.buffers.col)?;
        }
        row_group.broadcast(kc, cast_slice_mut(&mut self.buffers.col))?;

        self.bytes_moved +=
            distance_bytes(self.buffers.row.len() + self.buffers.col.len()) as u64;
        Ok(())
    }

    fn from_root(
        &mut self,
        world: &C,
        k: usize,
        authoritative: Option<&DistanceMatrix>,
    ) -> Result<(), ApspError> {
        let n = self.grid.order();
        if self.rank == self.root {
            let m = authoritative
                .ok_or_else(|| ApspError::Comm("root has no merged matrix".into()))?;
            let (row, col) = self.staging.split_at_mut(n);
            row.copy_from_slice(m.row(k));
            m.column_segment(k, 0, n, col);
        }
        world.broadcast(self.root, cast_slice_mut(&mut self.staging))?;
        self.bytes_moved += distance_bytes(self.staging.len()) as u64;

        let (row, col) = self.staging.split_at(n);
        self.buffers.row.copy_from_slice(&row[self.bounds.cols()]);
        self.buffers.col.copy_from_slice(&col[self.bounds.rows()]);
        Ok(())
    }
}

fn not_owned(rank: usize, k: usize) -> ApspError {
    ApspError::Comm(format!("rank {rank} was chosen for pivot {k} but does not hold it"))
}

/// Collective cross-check of the pure ownership mapping: every rank reports `rank + 1` if its
/// block holds row `k`, and the maximum must be the highest-ranked holder the mapping predicts.
pub fn verify_row_owner<C: Communicator>(
    world: &C,
    grid: &ProcessGrid,
    bounds: &BlockBounds,
    k: usize,
) -> Result<(), ApspError> {
    let flag = if bounds.contains_row(k) {
        world.rank() as u64 + 1
    } else {
        0
    };
    let reduced = world.all_reduce_max(flag)?;
    let expected = grid.rank_at(grid.grid_row_of(k), grid.side() - 1);
    if reduced != expected as u64 + 1 {
        return Err(ApspError::OwnershipDisagreement {
            pivot: k,
            expected,
            reduced: reduced.saturating_sub(1) as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::run_local;

    fn matrix(n: usize) -> DistanceMatrix {
        DistanceMatrix::from_vec(n, (0..(n * n) as Distance).collect()).unwrap()
    }

    fn local_block(m: &DistanceMatrix, b: BlockBounds) -> Block {
        let mut cells = Vec::new();
        m.pack_block(&b, &mut cells);
        Block::from_cells(b, cells).unwrap()
    }

    #[test]
    fn grid_ranks_receive_their_segments() {
        let n = 4;
        let m = matrix(n);
        let cfg = RunConfig {
            decomposition: Decomposition::Grid,
            verify_ownership: true,
            ..RunConfig::default()
        };
        let grid = ProcessGrid::new(Decomposition::Grid, n, 4).unwrap();
        let out = run_local(4, |comm| {
            let block = local_block(&m, grid.block_of(comm.rank()));
            let mut ex = PivotExchange::open(&comm, grid, &cfg).unwrap();
            (0..n)
                .map(|k| ex.distribute(&comm, k, &block, None).unwrap().clone())
                .collect::<Vec<_>>()
        });
        for (rank, rounds) in out.iter().enumerate() {
            let b = grid.block_of(rank);
            for (k, p) in rounds.iter().enumerate() {
                let want_row: Vec<_> = b.cols().map(|j| m[(k, j)]).collect();
                let want_col: Vec<_> = b.rows().map(|i| m[(i, k)]).collect();
                assert_eq!(p.row, want_row, "rank {rank} pivot {k}");
                assert_eq!(p.col, want_col, "rank {rank} pivot {k}");
            }
        }
    }

    #[test]
    fn root_merge_slices_full_row_and_column() {
        let n = 6;
        let m = matrix(n);
        let cfg = RunConfig {
            residency: Residency::RootMerge,
            ..RunConfig::default()
        };
        let grid = ProcessGrid::new(Decomposition::Rows, n, 4).unwrap();
        let out = run_local(4, |comm| {
            let block = local_block(&m, grid.block_of(comm.rank()));
            let mut ex = PivotExchange::open(&comm, grid, &cfg).unwrap();
            let auth = (comm.rank() == 0).then_some(&m);
            ex.distribute(&comm, 5, &block, auth).unwrap().clone()
        });
        let b = grid.block_of(3);
        assert_eq!(out[3].row, m.row(5).to_vec());
        assert_eq!(out[3].col, b.rows().map(|i| m[(i, 5)]).collect::<Vec<_>>());
    }

    #[test]
    fn ownership_check_passes_for_row_bands() {
        let grid = ProcessGrid::new(Decomposition::Rows, 7, 3).unwrap();
        let out = run_local(3, |comm| {
            let b = grid.block_of(comm.rank());
            (0..7).all(|k| verify_row_owner(&comm, &grid, &b, k).is_ok())
        });
        assert!(out.into_iter().all(|ok| ok));
    }

    #[test]
    fn ownership_check_flags_disagreement() {
        let grid = ProcessGrid::new(Decomposition::Rows, 4, 2).unwrap();
        let out = run_local(2, |comm| {
            // both ranks pretend to hold every row
            let lie = BlockBounds {
                row_start: 0,
                row_count: 4,
                col_start: 0,
                col_count: 4,
            };
            verify_row_owner(&comm, &grid, &lie, 0)
        });
        assert!(out.iter().all(|r| matches!(
            r,
            Err(ApspError::OwnershipDisagreement { pivot: 0, expected: 0, reduced: 1 })
        )));
    }
}
