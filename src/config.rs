//! Run configuration and the checks that must pass before any communication.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors. All of them abort the whole run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Local relaxation needs at least one thread.
    #[error("thread count must be a positive integer, got {0}")]
    ThreadCount(usize),
    /// A distributed run needs at least two processes.
    #[error("process count must be at least 2, got {0}")]
    TooFewProcesses(usize),
    /// Grid decomposition needs p = s*s.
    #[error("grid decomposition needs a perfect-square process count, got {0}")]
    NotPerfectSquare(usize),
    /// Grid decomposition needs n divisible by the grid side.
    #[error("matrix dimension {n} is not divisible by grid side {side}")]
    NotDivisible { n: usize, side: usize },
    /// The matrix has no vertices.
    #[error("matrix must have at least one vertex")]
    EmptyMatrix,
    /// The root rank is not a member of the communicator.
    #[error("root rank {root} out of range for {procs} processes")]
    RootOutOfRange { root: usize, procs: usize },
    /// An enum option could not be parsed from text.
    #[error("unknown {kind} `{value}`")]
    UnknownOption { kind: &'static str, value: String },
}

/// How the matrix is divided among processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Decomposition {
    /// Contiguous row bands, one per process.
    #[default]
    Rows,
    /// s×s grid of g×g blocks, p = s².
    Grid,
}

/// Where blocks live between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Residency {
    /// Blocks stay on their owners for all rounds and are gathered once at the end.
    #[default]
    Resident,
    /// Blocks are gathered and merged into the root's matrix after every round.
    RootMerge,
}

impl FromStr for Decomposition {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rows" | "row" | "band" => Ok(Self::Rows),
            "grid" | "block" | "blocks" => Ok(Self::Grid),
            _ => Err(ConfigError::UnknownOption {
                kind: "decomposition",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Residency {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resident" => Ok(Self::Resident),
            "root-merge" | "root_merge" | "merge" => Ok(Self::RootMerge),
            _ => Err(ConfigError::UnknownOption {
                kind: "residency",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Decomposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rows => "rows",
            Self::Grid => "grid",
        })
    }
}

impl fmt::Display for Residency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resident => "resident",
            Self::RootMerge => "root-merge",
        })
    }
}

/// Everything a rank needs to know about a run besides the matrix itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub decomposition: Decomposition,
    pub residency: Residency,
    /// Threads used for local relaxation on each process.
    pub threads: usize,
    /// Cross-check the pure ownership mapping with an all-reduce every round.
    pub verify_ownership: bool,
    /// Rank that loads the matrix and receives the result.
    pub root: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            decomposition: Decomposition::Rows,
            residency: Residency::Resident,
            threads: 1,
            verify_ownership: cfg!(debug_assertions),
            root: 0,
        }
    }
}

impl RunConfig {
    /// Checks that depend only on the configuration and the process count.
    ///
    /// Shape checks that need `n` live in [`crate::partitioning::ProcessGrid::new`].
    pub fn validate(&self, procs: usize) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ThreadCount(self.threads));
        }
        if procs < 2 {
            return Err(ConfigError::TooFewProcesses(procs));
        }
        if self.root >= procs {
            return Err(ConfigError::RootOutOfRange {
                root: self.root,
                procs,
            });
        }
        if self.decomposition == Decomposition::Grid && integer_sqrt(procs).is_none() {
            return Err(ConfigError::NotPerfectSquare(procs));
        }
        Ok(())
    }
}

/// Exact integer square root, `None` if `p` is not a perfect square.
pub fn integer_sqrt(p: usize) -> Option<usize> {
    let mut s = (p as f64).sqrt() as usize;
    while s * s > p {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= p {
        s += 1;
    }
    (s * s == p).then_some(s)
}
