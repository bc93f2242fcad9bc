//! Data module: the full distance matrix and the per-rank block.

pub mod block;
pub mod matrix;

pub use block::Block;
pub use matrix::DistanceMatrix;
