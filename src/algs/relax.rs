//! Local relaxation: one Floyd-Warshall round over a rank's block.
//!
//! For a fixed pivot `k` every cell update reads only the pre-round snapshot of row `k` and
//! column `k` (the pivot buffers) and writes only its own cell, so rows of the block are
//! relaxed independently on the rank's thread pool.

use crate::apsp_error::ApspError;
use crate::config::ConfigError;
use crate::sentinel::{Distance, is_sentinel, relax};

/// Per-process pool for intra-block data parallelism.
pub struct RelaxPool {
    threads: usize,
    #[cfg(feature = "rayon")]
    pool: rayon::ThreadPool,
}

impl RelaxPool {
    pub fn new(threads: usize) -> Result<Self, ApspError> {
        if threads == 0 {
            return Err(ConfigError::ThreadCount(threads).into());
        }
        #[cfg(feature = "rayon")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("relax-{i}"))
                .build()
                .map_err(|e| ApspError::ThreadPool(e.to_string()))?;
            Ok(Self { threads, pool })
        }
        #[cfg(not(feature = "rayon"))]
        {
            Ok(Self { threads })
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Relax `cells` (row-major, `pivot_col.len()` rows of `pivot_row.len()` columns).
    ///
    /// `pivot_col[li]` is `dist[i][k]` for local row `li`, `pivot_row[lj]` is `dist[k][j]` for
    /// local column `lj`. Returns the number of cells that improved.
    pub fn relax_block(
        &self,
        cells: &mut [Distance],
        pivot_col: &[Distance],
        pivot_row: &[Distance],
    ) -> usize {
        debug_assert_eq!(cells.len(), pivot_col.len() * pivot_row.len());
        if pivot_row.is_empty() {
            return 0;
        }
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            if self.threads > 1 {
                return self.pool.install(|| {
                    cells
                        .par_chunks_mut(pivot_row.len())
                        .zip(pivot_col.par_iter())
                        .map(|(row, &ik)| relax_row(row, ik, pivot_row))
                        .sum()
                });
            }
        }
        cells
            .chunks_mut(pivot_row.len())
            .zip(pivot_col)
            .map(|(row, &ik)| relax_row(row, ik, pivot_row))
            .sum()
    }
}

/// Relax one row: `row[j] = min(row[j], ik + pivot_row[j])`.
#[inline]
pub fn relax_row(row: &mut [Distance], ik: Distance, pivot_row: &[Distance]) -> usize {
    if is_sentinel(ik) {
        return 0;
    }
    let mut improved = 0;
    for (cell, &kj) in row.iter_mut().zip(pivot_row) {
        let next = relax(*cell, ik, kj);
        if next != *cell {
            *cell = next;
            improved += 1;
        }
    }
    improved
}
