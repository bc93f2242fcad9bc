// src/algs/distribute.rs

use crate::algs::communicator::Communicator;
use crate::algs::wire::{cast_slice, cast_slice_mut, distance_bytes};
use crate::apsp_error::ApspError;
use crate::data::block::Block;
use crate::data::matrix::DistanceMatrix;
use crate::partitioning::ProcessGrid;
use crate::sentinel::Distance;

/// Distribute the root's matrix across ranks, one exclusive block each.
///
/// # Arguments
/// - `world`: communicator over all ranks of the run
/// - `grid`: the agreed decomposition; every rank passes the same value
/// - `root`: rank holding the matrix
/// - `matrix`: `Some` on the root, ignored elsewhere
///
/// # Returns
/// This rank's [`Block`], at the bounds `grid.block_of(world.rank())`.
pub fn scatter_blocks<C: Communicator>(
    world: &C,
    grid: &ProcessGrid,
    root: usize,
    matrix: Option<&DistanceMatrix>,
) -> Result<Block, ApspError> {
    let counts: Vec<usize> = grid.cell_counts().into_iter().map(distance_bytes).collect();
    let mut packed: Vec<Distance> = Vec::new();
    if world.rank() == root {
        let m = matrix.ok_or_else(|| ApspError::Comm("root has no matrix to scatter".into()))?;
        packed.reserve(m.order() * m.order());
        for b in grid.blocks() {
            m.pack_block(&b, &mut packed);
        }
    }
    let bounds = grid.block_of(world.rank());
    let mut cells = vec![0 as Distance; bounds.cells()];
    world.scatter_varcount(root, cast_slice(&packed), &counts, cast_slice_mut(&mut cells))?;
    log::debug!(
        "rank {}: received block {:?} ({} cells)",
        world.rank(),
        bounds,
        cells.len()
    );
    Block::from_cells(bounds, cells)
}
