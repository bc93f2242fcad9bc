use apsp_grid::algs::communicator::{CommTag, Communicator, LocalComm, Wait, run_local};
use bytemuck::{Pod, Zeroable, cast_slice};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq)]
struct WireU64 {
    x: u64,
}

#[test]
fn tags_do_not_mix() {
    let out = run_local(2, |comm| {
        const TAG_A: CommTag = CommTag::new(0xA100);
        const TAG_B: CommTag = CommTag::new(0xB200);
        if comm.rank() == 0 {
            let wb = [WireU64 { x: 0x0123_4567_89AB_CDEF }];
            let wa = [WireU64 { x: 0xDEAD_BEEF_F00D_F00D }];
            // B first: the receiver still gets A on TAG_A
            comm.isend(1, TAG_B, cast_slice(&wb));
            comm.isend(1, TAG_A, cast_slice(&wa));
            None
        } else {
            let mut buf = [0u8; 8];
            let a = comm.irecv(0, TAG_A, &mut buf).wait().unwrap();
            let b = comm.irecv(0, TAG_B, &mut buf).wait().unwrap();
            Some((u64::from_le_bytes(a.try_into().unwrap()), u64::from_le_bytes(b.try_into().unwrap())))
        }
    });
    assert_eq!(out[1], Some((0xDEAD_BEEF_F00D_F00D, 0x0123_4567_89AB_CDEF)));
}

#[test]
fn nested_splits_form_grid_rows_and_columns() {
    // 3x3 grid: row groups by grid row, column groups by grid column.
    let out = run_local(9, |comm| {
        let (r, c) = (comm.rank() / 3, comm.rank() % 3);
        let row = comm.split(r, c).unwrap();
        let col = comm.split(c, r).unwrap();
        assert_eq!((row.rank(), row.size()), (c, 3));
        assert_eq!((col.rank(), col.size()), (r, 3));

        let mut from_row = [comm.rank() as u8];
        row.broadcast(1, &mut from_row).unwrap();
        let mut from_col = [comm.rank() as u8];
        col.broadcast(2, &mut from_col).unwrap();
        (from_row[0], from_col[0])
    });
    for (rank, &(a, b)) in out.iter().enumerate() {
        let (r, c) = (rank / 3, rank % 3);
        assert_eq!(a as usize, r * 3 + 1);
        assert_eq!(b as usize, 2 * 3 + c);
    }
}

#[test]
fn empty_contributions_are_fine() {
    let out = run_local(3, |comm| {
        let counts = [0, 4, 0];
        let mine: Vec<u8> = if comm.rank() == 1 { vec![9, 8, 7, 6] } else { vec![] };
        let mut all = vec![0u8; if comm.rank() == 2 { 4 } else { 0 }];
        comm.gather_varcount(2, &mine, &counts, &mut all).unwrap();
        all
    });
    assert_eq!(out[2], vec![9, 8, 7, 6]);
}

#[test]
fn barrier_then_reduce() {
    let out = run_local(4, |comm| {
        comm.barrier().unwrap();
        comm.all_reduce_max(10 * comm.rank() as u64).unwrap()
    });
    assert_eq!(out, vec![30; 4]);
}

#[test]
fn dropped_world_unblocks_receivers() {
    let mut world = LocalComm::world(2);
    let c1 = world.pop().unwrap();
    drop(world);
    let mut buf = [0u8; 1];
    assert!(c1.irecv(0, CommTag::new(1), &mut buf).wait().is_none());
    assert!(c1.broadcast(0, &mut buf).is_err());
}

#[test]
#[should_panic(expected = "aborted")]
fn abort_tears_down_the_run() {
    run_local(3, |comm| {
        if comm.rank() == 2 {
            comm.abort(3);
        }
        let mut buf = [0u8; 1];
        // ranks 0 and 1 wait on rank 2, which never sends
        let _ = comm.irecv(2, CommTag::new(7), &mut buf).wait();
    });
}
