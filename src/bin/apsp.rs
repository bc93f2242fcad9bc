//! apsp command-line interface.
//!
//! ```sh
//! apsp generate -n 64 --density 0.3 -o graph.txt
//! apsp run graph.txt --procs 4 --decomposition grid
//! mpirun -n 4 apsp run graph.txt --decomposition grid   # with --features mpi-support
//! apsp sequential graph.txt --threads 8
//! ```

use anyhow::Context;
use apsp_grid::algs::coordinator::RunStats;
use apsp_grid::config::{Decomposition, Residency, RunConfig};
use apsp_grid::io::{self, GeneratorConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "apsp")]
#[command(about = "Distributed all-pairs shortest paths (Floyd-Warshall)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the distributed solver on a matrix file.
    Run {
        /// Input: `n` followed by `n * n` integers, 9999 for "no edge".
        input: PathBuf,
        /// Threads for local relaxation on each process.
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
        #[arg(short, long, default_value = "rows")]
        decomposition: Decomposition,
        #[arg(short, long, default_value = "resident")]
        residency: Residency,
        /// In-process rank count (ignored under MPI).
        #[arg(short, long, default_value_t = 4)]
        procs: usize,
        /// Rank that reads the input and prints the result.
        #[arg(long, default_value_t = 0)]
        root: usize,
        /// Cross-check pivot ownership with an all-reduce every round.
        #[arg(long)]
        verify_ownership: bool,
        /// Suppress the result matrix.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Single-process Floyd-Warshall.
    Sequential {
        input: PathBuf,
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
        #[arg(short, long)]
        quiet: bool,
    },
    /// Write a random input matrix.
    Generate {
        #[arg(short, long, default_value_t = 32)]
        n: usize,
        /// Probability of an edge between two distinct vertices.
        #[arg(long, default_value_t = 0.4)]
        density: f64,
        #[arg(long, default_value_t = 1)]
        min_weight: i32,
        #[arg(long, default_value_t = 10)]
        max_weight: i32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn report(stats: &RunStats) {
    eprintln!(
        "{} rounds, {:.6} s, {} pivot bytes, {} improved cells",
        stats.rounds,
        stats.elapsed.as_secs_f64(),
        stats.pivot_bytes,
        stats.improved_cells
    );
}

#[cfg(feature = "mpi-support")]
fn run(input: PathBuf, config: RunConfig, _procs: usize, quiet: bool) -> anyhow::Result<()> {
    use apsp_grid::algs::communicator::{Communicator, MpiComm};
    use apsp_grid::algs::coordinator::Coordinator;

    let world = MpiComm::new()?;
    let mut coordinator = Coordinator::new(&world, config);
    match coordinator.run_loaded(|| io::read_matrix_file(&input)) {
        Ok(out) => {
            if let Some(m) = out.matrix {
                if !quiet {
                    io::write_matrix(std::io::stdout().lock(), &m)?;
                }
                report(&out.stats);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("rank {}: {e}", world.rank());
            world.abort(1)
        }
    }
}

#[cfg(not(feature = "mpi-support"))]
fn run(input: PathBuf, config: RunConfig, procs: usize, quiet: bool) -> anyhow::Result<()> {
    let m = io::read_matrix_file(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let out = apsp_grid::algs::coordinator::run_in_process(procs, &config, &m)?;
    if let Some(m) = out.matrix {
        if !quiet {
            io::write_matrix(std::io::stdout().lock(), &m)?;
        }
    }
    report(&out.stats);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            threads,
            decomposition,
            residency,
            procs,
            root,
            verify_ownership,
            quiet,
        } => {
            let config = RunConfig {
                decomposition,
                residency,
                threads,
                verify_ownership,
                root,
            };
            run(input, config, procs, quiet)
        }
        Commands::Sequential {
            input,
            threads,
            quiet,
        } => {
            let mut m = io::read_matrix_file(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let started = Instant::now();
            if threads == 1 {
                apsp_grid::algs::sequential::floyd_warshall(&mut m);
            } else {
                // rejects 0 with ConfigError::ThreadCount
                apsp_grid::algs::sequential::floyd_warshall_par(&mut m, threads)?;
            }
            let elapsed = started.elapsed();
            if !quiet {
                io::write_matrix(std::io::stdout().lock(), &m)?;
            }
            eprintln!("{} rounds, {:.6} s", m.order(), elapsed.as_secs_f64());
            Ok(())
        }
        Commands::Generate {
            n,
            density,
            min_weight,
            max_weight,
            seed,
            output,
        } => {
            let m = io::generate(&GeneratorConfig {
                order: n,
                edge_probability: density,
                min_weight,
                max_weight,
                seed,
            });
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    io::write_input(file, &m)?;
                }
                None => io::write_input(std::io::stdout().lock(), &m)?,
            }
            Ok(())
        }
    }
}
