//! Entry-point for matrix decomposition over process ranks.

mod process_grid;

pub use process_grid::{BlockBounds, ProcessGrid};
