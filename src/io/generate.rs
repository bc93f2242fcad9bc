//! Random dense test graphs.

use crate::data::matrix::DistanceMatrix;
use crate::sentinel::{Distance, SENTINEL};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub order: usize,
    /// Probability that an off-diagonal edge exists.
    pub edge_probability: f64,
    /// Inclusive weight range of existing edges.
    pub min_weight: Distance,
    pub max_weight: Distance,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            order: 32,
            edge_probability: 0.4,
            min_weight: 1,
            max_weight: 10,
            seed: 42,
        }
    }
}

/// Zero diagonal, sentinel everywhere no edge was drawn.
pub fn generate(cfg: &GeneratorConfig) -> DistanceMatrix {
    let mut rng = SmallRng::seed_from_u64(cfg.seed);
    let p = cfg.edge_probability.clamp(0.0, 1.0);
    let (lo, hi) = if cfg.min_weight <= cfg.max_weight {
        (cfg.min_weight, cfg.max_weight)
    } else {
        (cfg.max_weight, cfg.min_weight)
    };
    let mut m = DistanceMatrix::unreachable(cfg.order);
    for i in 0..cfg.order {
        for j in 0..cfg.order {
            if i == j {
                m[(i, j)] = 0;
            } else if rng.gen_bool(p) {
                m[(i, j)] = rng.gen_range(lo..=hi).min(SENTINEL - 1);
            }
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_and_shaped() {
        let cfg = GeneratorConfig {
            order: 16,
            ..GeneratorConfig::default()
        };
        let a = generate(&cfg);
        assert_eq!(a, generate(&cfg));
        for i in 0..16 {
            assert_eq!(a[(i, i)], 0);
        }
        assert!(a.as_slice().iter().all(|&d| d == SENTINEL || (0..=10).contains(&d)));
    }

    #[test]
    fn probability_extremes() {
        let none = generate(&GeneratorConfig {
            order: 5,
            edge_probability: 0.0,
            ..GeneratorConfig::default()
        });
        assert_eq!(none.as_slice().iter().filter(|&&d| d == SENTINEL).count(), 20);
        let full = generate(&GeneratorConfig {
            order: 5,
            edge_probability: 1.0,
            ..GeneratorConfig::default()
        });
        assert!(full.as_slice().iter().all(|&d| d != SENTINEL));
    }
}
