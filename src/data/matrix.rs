//! Dense distance matrix backed by one contiguous row-major buffer.

use crate::apsp_error::ApspError;
use crate::partitioning::BlockBounds;
use crate::sentinel::{Distance, SENTINEL};
use std::ops::{Index, IndexMut};

/// An n×n distance matrix.
///
/// Cell `(i, j)` lives at `data[i * n + j]`; rows are contiguous so a row (or a packed block)
/// can be sent as a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<Distance>,
}

impl DistanceMatrix {
    /// Matrix with every cell set to `fill`.
    pub fn filled(n: usize, fill: Distance) -> Self {
        Self {
            n,
            data: vec![fill; n * n],
        }
    }

    /// Matrix with no edges at all: every cell is the sentinel.
    pub fn unreachable(n: usize) -> Self {
        Self::filled(n, SENTINEL)
    }

    /// Take ownership of a row-major buffer of exactly `n * n` cells.
    pub fn from_vec(n: usize, data: Vec<Distance>) -> Result<Self, ApspError> {
        if data.len() != n * n {
            return Err(ApspError::ShortRead {
                expected: n * n,
                found: data.len(),
            });
        }
        Ok(Self { n, data })
    }

    /// Build from nested rows; every row must have `rows.len()` entries.
    pub fn from_rows<R: AsRef<[Distance]>>(rows: &[R]) -> Result<Self, ApspError> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for r in rows {
            data.extend_from_slice(r.as_ref());
        }
        Self::from_vec(n, data)
    }

    /// Number of vertices.
    #[inline]
    pub fn order(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[Distance] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Distance] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Distance> {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<Distance> {
        (i < self.n && j < self.n).then(|| self.data[i * self.n + j])
    }

    pub fn try_set(&mut self, i: usize, j: usize, d: Distance) -> Result<(), ApspError> {
        if i >= self.n || j >= self.n {
            return Err(ApspError::OutOfBounds {
                row: i,
                col: j,
                rows: self.n,
                cols: self.n,
            });
        }
        self.data[i * self.n + j] = d;
        Ok(())
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[Distance] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [Distance] {
        let n = self.n;
        &mut self.data[i * n..(i + 1) * n]
    }

    /// Copy column `k` restricted to rows `[start, start + len)`.
    pub fn column_segment(&self, k: usize, start: usize, len: usize, out: &mut [Distance]) {
        debug_assert_eq!(out.len(), len);
        for (o, i) in out.iter_mut().zip(start..start + len) {
            *o = self.data[i * self.n + k];
        }
    }

    /// Copy the cells covered by `b` into `out`, row-major, stride `b.col_count`.
    pub fn pack_block(&self, b: &BlockBounds, out: &mut Vec<Distance>) {
        out.reserve(b.cells());
        for i in b.rows() {
            let row = self.row(i);
            out.extend_from_slice(&row[b.cols()]);
        }
    }

    /// Write a packed block back at its `(row_start, col_start)` offset.
    pub fn unpack_block(&mut self, b: &BlockBounds, cells: &[Distance]) -> Result<(), ApspError> {
        if cells.len() != b.cells() {
            return Err(ApspError::Wire(format!(
                "block {b:?} needs {} cells, got {}",
                b.cells(),
                cells.len()
            )));
        }
        if b.row_start + b.row_count > self.n || b.col_start + b.col_count > self.n {
            return Err(ApspError::OutOfBounds {
                row: b.row_start + b.row_count,
                col: b.col_start + b.col_count,
                rows: self.n,
                cols: self.n,
            });
        }
        if b.col_count == 0 {
            return Ok(());
        }
        for (src, i) in cells.chunks_exact(b.col_count).zip(b.rows()) {
            self.row_mut(i)[b.cols()].copy_from_slice(src);
        }
        Ok(())
    }

    /// Iterate rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Distance]> {
        self.data.chunks_exact(self.n.max(1)).take(self.n)
    }
}

impl Index<(usize, usize)> for DistanceMatrix {
    type Output = Distance;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Distance {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for DistanceMatrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Distance {
        &mut self.data[i * self.n + j]
    }
}
