//! Rank ↔ block mapping for row-band and 2D grid decompositions.
//!
//! Everything here is a pure function of `(decomposition, n, p)`, so every process computes the
//! same ownership without exchanging a single message.

use crate::config::{ConfigError, Decomposition, integer_sqrt};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// The rectangular region of the matrix owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBounds {
    pub row_start: usize,
    pub row_count: usize,
    pub col_start: usize,
    pub col_count: usize,
}

impl BlockBounds {
    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.row_start..self.row_start + self.row_count
    }

    #[inline]
    pub fn cols(&self) -> Range<usize> {
        self.col_start..self.col_start + self.col_count
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.row_count * self.col_count
    }

    #[inline]
    pub fn contains_row(&self, i: usize) -> bool {
        self.rows().contains(&i)
    }

    #[inline]
    pub fn contains_col(&self, j: usize) -> bool {
        self.cols().contains(&j)
    }

    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.contains_row(i) && self.contains_col(j)
    }
}

/// Logical arrangement of `procs` processes over an `n`×`n` matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGrid {
    decomposition: Decomposition,
    n: usize,
    procs: usize,
    /// Grid side `s` (grid mode) or 1 (row mode: one column of bands).
    side: usize,
    /// Band height (row mode) or block edge `g` (grid mode).
    block: usize,
}

impl ProcessGrid {
    /// Validate the shape and build the grid.
    ///
    /// Row mode accepts `n % procs != 0`; the highest rank then absorbs the remainder rows.
    pub fn new(decomposition: Decomposition, n: usize, procs: usize) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::EmptyMatrix);
        }
        if procs < 2 {
            return Err(ConfigError::TooFewProcesses(procs));
        }
        match decomposition {
            Decomposition::Rows => {
                if n % procs != 0 {
                    log::warn!(
                        "n = {n} is not divisible by {procs} processes; rank {} absorbs {} extra rows",
                        procs - 1,
                        n % procs
                    );
                }
                Ok(Self {
                    decomposition,
                    n,
                    procs,
                    side: 1,
                    block: n / procs,
                })
            }
            Decomposition::Grid => {
                let side = integer_sqrt(procs).ok_or(ConfigError::NotPerfectSquare(procs))?;
                if n % side != 0 {
                    return Err(ConfigError::NotDivisible { n, side });
                }
                Ok(Self {
                    decomposition,
                    n,
                    procs,
                    side,
                    block: n / side,
                })
            }
        }
    }

    #[inline]
    pub fn decomposition(&self) -> Decomposition {
        self.decomposition
    }

    /// Matrix order `n`.
    #[inline]
    pub fn order(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn procs(&self) -> usize {
        self.procs
    }

    /// Grid side `s`; 1 in row mode.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Band height (row mode, before remainder) or block edge `g` (grid mode).
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block
    }

    /// `(grid_row, grid_col)` of a rank. Row mode: `(rank, 0)`.
    #[inline]
    pub fn coords(&self, rank: usize) -> (usize, usize) {
        match self.decomposition {
            Decomposition::Rows => (rank, 0),
            Decomposition::Grid => (rank / self.side, rank % self.side),
        }
    }

    /// Inverse of [`Self::coords`].
    #[inline]
    pub fn rank_at(&self, grid_row: usize, grid_col: usize) -> usize {
        match self.decomposition {
            Decomposition::Rows => grid_row,
            Decomposition::Grid => grid_row * self.side + grid_col,
        }
    }

    /// The exclusive block of `rank`.
    pub fn block_of(&self, rank: usize) -> BlockBounds {
        debug_assert!(rank < self.procs);
        match self.decomposition {
            Decomposition::Rows => {
                let row_start = rank * self.block;
                let row_count = if rank == self.procs - 1 {
                    self.n - row_start
                } else {
                    self.block
                };
                BlockBounds {
                    row_start,
                    row_count,
                    col_start: 0,
                    col_count: self.n,
                }
            }
            Decomposition::Grid => {
                let (r, c) = self.coords(rank);
                BlockBounds {
                    row_start: r * self.block,
                    row_count: self.block,
                    col_start: c * self.block,
                    col_count: self.block,
                }
            }
        }
    }

    /// Blocks of every rank, in rank order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockBounds> + '_ {
        (0..self.procs).map(move |r| self.block_of(r))
    }

    /// Grid row (row mode: band index) containing global row `k`.
    #[inline]
    pub fn grid_row_of(&self, k: usize) -> usize {
        debug_assert!(k < self.n);
        match self.decomposition {
            Decomposition::Rows if self.block == 0 => self.procs - 1,
            Decomposition::Rows => (k / self.block).min(self.procs - 1),
            Decomposition::Grid => k / self.block,
        }
    }

    /// Grid column containing global column `k`. Row mode: always 0.
    #[inline]
    pub fn grid_col_of(&self, k: usize) -> usize {
        match self.decomposition {
            Decomposition::Rows => 0,
            Decomposition::Grid => k / self.block,
        }
    }

    /// The responsible rank for pivot `k` as seen from `rank`: the rank whose block holds
    /// row `k` in the same grid column as `rank`. In row mode this is the band owner of `k`
    /// for every caller.
    #[inline]
    pub fn row_owner(&self, k: usize, rank: usize) -> usize {
        let (_, c) = self.coords(rank);
        self.rank_at(self.grid_row_of(k), c)
    }

    /// The rank whose block holds column `k` in the same grid row as `rank`.
    #[inline]
    pub fn col_owner(&self, k: usize, rank: usize) -> usize {
        let (r, _) = self.coords(rank);
        self.rank_at(r, self.grid_col_of(k))
    }

    /// Per-rank cell counts, in rank order.
    pub fn cell_counts(&self) -> Vec<usize> {
        self.blocks().map(|b| b.cells()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rows_last_rank_takes_remainder() {
        let g = ProcessGrid::new(Decomposition::Rows, 10, 3).unwrap();
        let bands: Vec<_> = g.blocks().map(|b| (b.row_start, b.row_count)).collect();
        assert_eq!(bands, vec![(0, 3), (3, 3), (6, 4)]);
        assert_eq!(g.row_owner(9, 0), 2);
        assert_eq!(g.row_owner(5, 2), 1);
    }

    #[test]
    fn rows_fewer_vertices_than_processes() {
        let g = ProcessGrid::new(Decomposition::Rows, 2, 4).unwrap();
        assert_eq!(g.block_of(0).row_count, 0);
        assert_eq!(g.block_of(3).rows(), 0..2);
        assert_eq!(g.row_owner(1, 0), 3);
    }

    #[test]
    fn grid_addresses_blocks_by_rank() {
        let g = ProcessGrid::new(Decomposition::Grid, 6, 9).unwrap();
        assert_eq!(g.block_size(), 2);
        let b = g.block_of(5);
        assert_eq!((b.row_start, b.col_start, b.row_count, b.col_count), (2, 4, 2, 2));
        assert_eq!(g.coords(7), (2, 1));
        assert_eq!(g.rank_at(2, 1), 7);
        // pivot 3 lives in grid row 1 / grid col 1
        assert_eq!(g.row_owner(3, 7), 4);
        assert_eq!(g.col_owner(3, 7), 7);
        assert_eq!(g.col_owner(0, 7), 6);
    }

    #[test]
    fn grid_rejects_bad_shapes() {
        assert_eq!(
            ProcessGrid::new(Decomposition::Grid, 6, 3),
            Err(ConfigError::NotPerfectSquare(3))
        );
        assert_eq!(
            ProcessGrid::new(Decomposition::Grid, 5, 4),
            Err(ConfigError::NotDivisible { n: 5, side: 2 })
        );
        assert_eq!(
            ProcessGrid::new(Decomposition::Rows, 0, 4),
            Err(ConfigError::EmptyMatrix)
        );
        assert_eq!(
            ProcessGrid::new(Decomposition::Rows, 4, 1),
            Err(ConfigError::TooFewProcesses(1))
        );
    }

    fn assert_exact_cover(g: &ProcessGrid) {
        let n = g.order();
        let mut hits = vec![0u8; n * n];
        for b in g.blocks() {
            for i in b.rows() {
                for j in b.cols() {
                    hits[i * n + j] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&h| h == 1), "cover not exact: {hits:?}");
    }

    proptest! {
        #[test]
        fn row_bands_cover_exactly(n in 1usize..40, p in 2usize..9) {
            let g = ProcessGrid::new(Decomposition::Rows, n, p).unwrap();
            assert_exact_cover(&g);
            for k in 0..n {
                prop_assert!(g.block_of(g.row_owner(k, 0)).contains_row(k));
            }
        }

        #[test]
        fn grid_blocks_cover_exactly(s in 2usize..5, g_edge in 1usize..6) {
            let n = s * g_edge;
            let g = ProcessGrid::new(Decomposition::Grid, n, s * s).unwrap();
            assert_exact_cover(&g);
            for rank in 0..s * s {
                for k in 0..n {
                    let b = g.block_of(g.row_owner(k, rank));
                    prop_assert!(b.contains_row(k));
                    prop_assert_eq!(b.cols(), g.block_of(rank).cols());
                    let b = g.block_of(g.col_owner(k, rank));
                    prop_assert!(b.contains_col(k));
                    prop_assert_eq!(b.rows(), g.block_of(rank).rows());
                }
            }
        }
    }
}
