#![allow(dead_code)]
use apsp_grid::data::matrix::DistanceMatrix;
use apsp_grid::io::{GeneratorConfig, generate};
use apsp_grid::sentinel::{Distance, SENTINEL};

pub const S: Distance = SENTINEL;

/// The 4-vertex diamond: 0→1 (3), 0→2 (1), 2→1 (1), 1→3 (1), 2→3 (5).
pub fn diamond() -> DistanceMatrix {
    DistanceMatrix::from_rows(&[[0, 3, 1, S], [S, 0, S, 1], [S, 1, 0, 5], [S, S, S, 0]]).unwrap()
}

pub fn random(n: usize, density: f64, seed: u64) -> DistanceMatrix {
    generate(&GeneratorConfig {
        order: n,
        edge_probability: density,
        min_weight: 1,
        max_weight: 20,
        seed,
    })
}

pub fn closed(m: &DistanceMatrix) -> DistanceMatrix {
    let mut out = m.clone();
    apsp_grid::algs::sequential::floyd_warshall(&mut out);
    out
}
