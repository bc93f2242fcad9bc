#![cfg(feature = "mpi-support")]
//! Run under `mpirun -n 4 cargo test --features mpi-support --test mpi_floyd`.

use apsp_grid::algs::communicator::{Communicator, MpiComm};
use apsp_grid::algs::coordinator::run_distributed;
use apsp_grid::algs::sequential::floyd_warshall;
use apsp_grid::config::{Decomposition, Residency, RunConfig};
use apsp_grid::io::{GeneratorConfig, generate};
use serial_test::serial;

#[test]
#[serial]
fn mpi_runs_match_sequential() {
    let world = MpiComm::new().unwrap();
    if world.size() < 2 {
        eprintln!("skipping: needs at least 2 MPI processes");
        return;
    }
    let n = 12;
    let m = generate(&GeneratorConfig {
        order: n,
        seed: 5,
        ..GeneratorConfig::default()
    });
    let mut expected = m.clone();
    floyd_warshall(&mut expected);

    let grid_ok = apsp_grid::config::integer_sqrt(world.size()).is_some_and(|s| n % s == 0);
    for decomposition in [Decomposition::Rows, Decomposition::Grid] {
        if decomposition == Decomposition::Grid && !grid_ok {
            continue;
        }
        for residency in [Residency::Resident, Residency::RootMerge] {
            let cfg = RunConfig {
                decomposition,
                residency,
                verify_ownership: true,
                ..RunConfig::default()
            };
            let mine = (world.rank() == 0).then(|| m.clone());
            let out = run_distributed(&world, &cfg, mine).unwrap();
            if world.rank() == 0 {
                assert_eq!(out.matrix.unwrap(), expected);
            } else {
                assert!(out.matrix.is_none());
            }
            assert_eq!(out.stats.rounds, n);
        }
    }
}
