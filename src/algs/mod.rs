//! Re-export public algorithms.

pub mod communicator;
pub mod coordinator;
pub mod distribute;
pub mod gather;
pub mod pivot;
pub mod relax;
pub mod sequential;
pub mod wire;

pub use coordinator::{Coordinator, Phase, RunOutcome, RunStats, run_distributed, run_in_process};
pub use distribute::scatter_blocks;
pub use gather::gather_blocks;
pub use sequential::{floyd_warshall, floyd_warshall_par};
