#![cfg_attr(docsrs, feature(doc_cfg))]
//! # apsp-grid
//!
//! apsp-grid computes all-pairs shortest paths of a dense weighted directed graph with
//! Floyd-Warshall, spreading the distance matrix over a group of cooperating processes.
//!
//! ## Features
//! - Row-band decomposition (any process count ≥ 2) and 2D grid decomposition
//!   (a perfect-square process count dividing the matrix order)
//! - Pivot row/column distribution per round over world or row/column sub-communicators
//! - Pluggable communication backends: in-process threads ([`LocalComm`](algs::communicator::LocalComm))
//!   or MPI ([`MpiComm`](algs::communicator::MpiComm), feature `mpi-support`)
//! - Shared-memory relaxation of each local block on a rayon pool (feature `rayon`, default)
//! - A sequential reference implementation and seeded random input generation
//!
//! ## Distances
//!
//! Distances are [`i32`]; the value [`SENTINEL`](sentinel::SENTINEL) (9999) means "no path"
//! and absorbs additions, so a path through an unreachable edge never improves a cell.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! apsp-grid = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```rust
//! use apsp_grid::prelude::*;
//!
//! let s = SENTINEL;
//! let m = DistanceMatrix::from_rows(&[[0, 3, 1, s], [s, 0, s, 1], [s, 1, 0, 5], [s, s, s, 0]])?;
//! let out = run_in_process(2, &RunConfig::default(), &m)?;
//! assert_eq!(out.matrix.unwrap().row(0), &[0, 2, 1, 3]);
//! # Ok::<(), ApspError>(())
//! ```

pub mod algs;
pub mod apsp_error;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod io;
pub mod partitioning;
pub mod sentinel;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, run_local};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::coordinator::{
        Coordinator, Phase, RunOutcome, RunStats, run_distributed, run_in_process,
    };
    pub use crate::algs::sequential::{floyd_warshall, floyd_warshall_par};
    pub use crate::apsp_error::ApspError;
    pub use crate::config::{ConfigError, Decomposition, Residency, RunConfig};
    pub use crate::data::matrix::DistanceMatrix;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::{read_matrix, read_matrix_file, write_matrix};
    pub use crate::partitioning::{BlockBounds, ProcessGrid};
    pub use crate::sentinel::{Distance, SENTINEL};
}
