//! A rank's locally owned region of the distance matrix.

use crate::apsp_error::ApspError;
use crate::partitioning::BlockBounds;
use crate::sentinel::Distance;

/// Contiguous row-major storage for one [`BlockBounds`].
///
/// Local cell `(li, lj)` is global cell `(row_start + li, col_start + lj)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    bounds: BlockBounds,
    cells: Vec<Distance>,
}

impl Block {
    /// Wrap received cells; the length must match the bounds exactly.
    pub fn from_cells(bounds: BlockBounds, cells: Vec<Distance>) -> Result<Self, ApspError> {
        if cells.len() != bounds.cells() {
            return Err(ApspError::Wire(format!(
                "block {bounds:?} needs {} cells, got {}",
                bounds.cells(),
                cells.len()
            )));
        }
        Ok(Self { bounds, cells })
    }

    #[inline]
    pub fn bounds(&self) -> &BlockBounds {
        &self.bounds
    }

    #[inline]
    pub fn cells(&self) -> &[Distance] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Distance] {
        &mut self.cells
    }

    /// Local row `li` (length `col_count`).
    #[inline]
    pub fn local_row(&self, li: usize) -> &[Distance] {
        let w = self.bounds.col_count;
        &self.cells[li * w..(li + 1) * w]
    }

    /// Cell at global coordinates, `None` when not owned here.
    pub fn get_global(&self, i: usize, j: usize) -> Option<Distance> {
        self.bounds.contains(i, j).then(|| {
            let li = i - self.bounds.row_start;
            let lj = j - self.bounds.col_start;
            self.cells[li * self.bounds.col_count + lj]
        })
    }

    /// Global row `k` restricted to this block's columns.
    pub fn global_row(&self, k: usize) -> Option<&[Distance]> {
        self.bounds
            .contains_row(k)
            .then(|| self.local_row(k - self.bounds.row_start))
    }

    /// Global column `k` restricted to this block's rows, written into `out`.
    pub fn copy_global_col(&self, k: usize, out: &mut [Distance]) -> Result<(), ApspError> {
        if !self.bounds.contains_col(k) || out.len() != self.bounds.row_count {
            return Err(ApspError::OutOfBounds {
                row: self.bounds.row_start,
                col: k,
                rows: self.bounds.row_count,
                cols: self.bounds.col_count,
            });
        }
        let lj = k - self.bounds.col_start;
        let w = self.bounds.col_count;
        for (li, o) in out.iter_mut().enumerate() {
            *o = self.cells[li * w + lj];
        }
        Ok(())
    }

    pub fn into_cells(self) -> Vec<Distance> {
        self.cells
    }
}
