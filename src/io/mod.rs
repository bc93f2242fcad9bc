//! Matrix text I/O and random input generation.

pub mod generate;
pub mod text;

pub use generate::{GeneratorConfig, generate};
pub use text::{format_matrix, read_matrix, read_matrix_file, write_input, write_matrix};
