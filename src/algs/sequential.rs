//! Single-process Floyd-Warshall: the O(n³) reference the distributed engine must match, and a
//! shared-memory variant that relaxes rows on a rayon pool.

use crate::algs::relax::{RelaxPool, relax_row};
use crate::apsp_error::ApspError;
use crate::data::matrix::DistanceMatrix;
use crate::sentinel::Distance;

/// Unpartitioned Floyd-Warshall with sentinel arithmetic, in place.
pub fn floyd_warshall(m: &mut DistanceMatrix) {
    let n = m.order();
    let mut pivot_row: Vec<Distance> = vec![0; n];
    for k in 0..n {
        pivot_row.copy_from_slice(m.row(k));
        for i in 0..n {
            let ik = m[(i, k)];
            relax_row(m.row_mut(i), ik, &pivot_row);
        }
    }
}

/// Shared-memory Floyd-Warshall on `threads` threads, in place.
///
/// Row `k` and column `k` are snapshotted before each round, so rows relax independently.
pub fn floyd_warshall_par(m: &mut DistanceMatrix, threads: usize) -> Result<(), ApspError> {
    let pool = RelaxPool::new(threads)?;
    let n = m.order();
    let mut pivot_row: Vec<Distance> = vec![0; n];
    let mut pivot_col: Vec<Distance> = vec![0; n];
    for k in 0..n {
        pivot_row.copy_from_slice(m.row(k));
        m.column_segment(k, 0, n, &mut pivot_col);
        pool.relax_block(m.as_mut_slice(), &pivot_col, &pivot_row);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::SENTINEL;

    const S: Distance = SENTINEL;

    #[test]
    fn diamond_shortest_paths() {
        let mut m = DistanceMatrix::from_rows(&[
            [0, 3, 1, S],
            [S, 0, S, 1],
            [S, 1, 0, 5],
            [S, S, S, 0],
        ])
        .unwrap();
        floyd_warshall(&mut m);
        assert_eq!(m.row(0), &[0, 2, 1, 3]);
        assert_eq!(m.row(2), &[S, 1, 0, 2]);
        assert_eq!(m.row(3), &[S, S, S, 0]);
    }

    #[test]
    fn parallel_rejects_zero_threads() {
        let mut m = DistanceMatrix::unreachable(3);
        let err = floyd_warshall_par(&mut m, 0).unwrap_err();
        assert!(matches!(
            err,
            ApspError::Config(crate::config::ConfigError::ThreadCount(0))
        ));
    }

    #[test]
    fn parallel_matches_sequential() {
        let n = 24;
        let data: Vec<Distance> = (0..n * n)
            .map(|x| match (x * 31 + 7) % 11 {
                0..=4 => S,
                w => w as Distance,
            })
            .collect();
        let mut a = DistanceMatrix::from_vec(n, data).unwrap();
        let mut b = a.clone();
        floyd_warshall(&mut a);
        floyd_warshall_par(&mut b, 3).unwrap();
        assert_eq!(a, b);
    }
}
