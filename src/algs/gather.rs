//! Reassembly: collect every rank's block into the root's matrix.

use crate::algs::communicator::Communicator;
use crate::algs::wire::{cast_slice, cast_slice_mut, distance_bytes};
use crate::apsp_error::ApspError;
use crate::data::block::Block;
use crate::data::matrix::DistanceMatrix;
use crate::partitioning::ProcessGrid;
use crate::sentinel::Distance;

/// Reusable gather state; the root-merge variant gathers once per round.
pub struct BlockGatherer {
    grid: ProcessGrid,
    root: usize,
    counts: Vec<usize>,
    scratch: Vec<Distance>,
}

impl BlockGatherer {
    pub fn new(grid: ProcessGrid, root: usize) -> Self {
        let counts = grid.cell_counts().into_iter().map(distance_bytes).collect();
        Self {
            grid,
            root,
            counts,
            scratch: Vec::new(),
        }
    }

    /// Collective: send `block` to the root; on the root write every block into `into` at its
    /// `(row_start, col_start)` offset.
    ///
    /// Returns only after the root holds all blocks; blocks are disjoint so arrival order does
    /// not matter.
    pub fn gather<C: Communicator>(
        &mut self,
        world: &C,
        block: &Block,
        into: Option<&mut DistanceMatrix>,
    ) -> Result<(), ApspError> {
        let is_root = world.rank() == self.root;
        if is_root {
            self.scratch.clear();
            self.scratch.resize(self.grid.order() * self.grid.order(), 0);
        }
        world.gather_varcount(
            self.root,
            cast_slice(block.cells()),
            &self.counts,
            cast_slice_mut(&mut self.scratch),
        )?;
        if !is_root {
            return Ok(());
        }
        let m = into.ok_or_else(|| ApspError::Comm("root has no matrix to gather into".into()))?;
        let mut at = 0;
        for b in self.grid.blocks() {
            let cells = &self.scratch[at..at + b.cells()];
            m.unpack_block(&b, cells)?;
            at += b.cells();
        }
        Ok(())
    }
}

/// One-shot gather of the final blocks.
pub fn gather_blocks<C: Communicator>(
    world: &C,
    grid: &ProcessGrid,
    root: usize,
    block: &Block,
    into: Option<&mut DistanceMatrix>,
) -> Result<(), ApspError> {
    BlockGatherer::new(*grid, root).gather(world, block, into)
}
