//! ApspError: unified error type for apsp-grid public APIs.
//!
//! Every failure in this crate is fatal for the run; nothing is retried.

use crate::config::ConfigError;
use thiserror::Error;

/// Unified error type for apsp-grid operations.
#[derive(Debug, Error)]
pub enum ApspError {
    /// The run configuration or the matrix shape is invalid for the chosen decomposition.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The input matrix could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A token in the matrix text was not an integer.
    #[error("malformed matrix token `{token}` at position {position}")]
    Parse { token: String, position: usize },
    /// The matrix text ended before `expected` tokens were read.
    #[error("short read: expected {expected} matrix tokens, found {found}")]
    ShortRead { expected: usize, found: usize },
    /// The root failed to load the matrix; every other rank observes this instead.
    #[error("run aborted by root rank {root} before scattering")]
    RootAborted { root: usize },
    /// A received message does not have the length the protocol requires.
    #[error("message length mismatch: {0}")]
    Wire(String),
    /// The all-reduce over local ownership flags disagrees with the pure ownership mapping.
    #[error("ownership disagreement for pivot {pivot}: mapping says rank {expected}, reduction says {reduced}")]
    OwnershipDisagreement {
        pivot: usize,
        expected: usize,
        reduced: usize,
    },
    /// The communicator could not perform a requested operation (e.g. a split).
    #[error("communicator error: {0}")]
    Comm(String),
    /// The local relaxation thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    /// A matrix or block index fell outside its bounds.
    #[error("index ({row}, {col}) out of bounds for {rows}x{cols}")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}
