use apsp_grid::algs::wire::{
    STATUS_LOAD_FAILED, WIRE_VERSION, WireRunHeader, cast_slice, distance_bytes, expect_exact_len,
};
use apsp_grid::sentinel::{Distance, SENTINEL};

#[test]
fn header_is_little_endian() {
    let h = WireRunHeader::new(STATUS_LOAD_FAILED, 0x0102);
    let b = bytemuck::bytes_of(&h);
    assert_eq!(b.len(), 16);
    assert_eq!(&b[0..2], &WIRE_VERSION.to_le_bytes());
    assert_eq!(&b[2..4], &STATUS_LOAD_FAILED.to_le_bytes());
    assert_eq!(&b[8..16], &0x0102u64.to_le_bytes());
}

#[test]
fn distances_cast_to_native_bytes() {
    let cells: [Distance; 3] = [0, -1, SENTINEL];
    let bytes = cast_slice(&cells);
    assert_eq!(bytes.len(), distance_bytes(3));
    assert_eq!(&bytes[8..12], &SENTINEL.to_ne_bytes());
}

#[test]
fn expect_exact_len_err() {
    assert!(expect_exact_len(3, 4).is_err());
    assert!(expect_exact_len(4, 4).is_ok());
}
