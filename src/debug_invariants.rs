use crate::apsp_error::ApspError;
use crate::data::block::Block;
use crate::data::matrix::DistanceMatrix;
use crate::partitioning::ProcessGrid;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "invariant violated");
    }
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), ApspError>;
}

/// Run a fallible check and panic on error when invariant checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

impl DebugInvariants for DistanceMatrix {
    fn validate_invariants(&self) -> Result<(), ApspError> {
        let n = self.order();
        if self.as_slice().len() != n * n {
            return Err(ApspError::ShortRead {
                expected: n * n,
                found: self.as_slice().len(),
            });
        }
        Ok(())
    }
}

impl DebugInvariants for Block {
    fn validate_invariants(&self) -> Result<(), ApspError> {
        let expected = self.bounds().cells();
        if self.cells().len() != expected {
            return Err(ApspError::ShortRead {
                expected,
                found: self.cells().len(),
            });
        }
        Ok(())
    }
}

impl DebugInvariants for ProcessGrid {
    /// Blocks must tile the `n × n` index space exactly once.
    fn validate_invariants(&self) -> Result<(), ApspError> {
        let n = self.order();
        let mut hits = vec![0u8; n * n];
        for b in self.blocks() {
            for i in b.rows() {
                for j in b.cols() {
                    if i >= n || j >= n {
                        return Err(ApspError::OutOfBounds {
                            row: i,
                            col: j,
                            rows: n,
                            cols: n,
                        });
                    }
                    hits[i * n + j] += 1;
                }
            }
        }
        if let Some(pos) = hits.iter().position(|&h| h != 1) {
            return Err(ApspError::Comm(format!(
                "cell ({}, {}) covered {} times",
                pos / n,
                pos % n,
                hits[pos]
            )));
        }
        Ok(())
    }
}
