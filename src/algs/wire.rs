//! Fixed, versioned wire types and slice casts for matrix traffic.
//!
//! Distance payloads travel as native-endian `i32` bytes (all ranks of a run share one
//! architecture); the run header is explicitly little-endian.

use crate::sentinel::Distance;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Byte length of `cells` distances on the wire.
#[inline]
pub fn distance_bytes(cells: usize) -> usize {
    cells * size_of::<Distance>()
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Run header status: the root loaded a matrix and the run proceeds.
pub const STATUS_OK: u16 = 0;
/// Run header status: the root failed to load; every rank bails out.
pub const STATUS_LOAD_FAILED: u16 = 1;

/// Broadcast by the root before anything else so every rank learns `n`, or learns that the
/// run is already over.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireRunHeader {
    pub version_le: u16,
    pub status_le: u16,
    pub reserved_le: u32, // keep zero
    pub order_le: u64,
}

const_assert_eq!(size_of::<WireRunHeader>(), 16);

impl WireRunHeader {
    pub fn new(status: u16, order: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            status_le: status.to_le(),
            reserved_le: 0,
            order_le: (order as u64).to_le(),
        }
    }

    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }

    pub fn status(&self) -> u16 {
        u16::from_le(self.status_le)
    }

    pub fn order(&self) -> usize {
        u64::from_le(self.order_le) as usize
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::bytes_of_mut(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_survive_byte_view() {
        let h = WireRunHeader::new(STATUS_LOAD_FAILED, 4096);
        let mut copy = WireRunHeader::zeroed();
        copy.as_bytes_mut().copy_from_slice(bytemuck::bytes_of(&h));
        assert_eq!(copy.version(), WIRE_VERSION);
        assert_eq!(copy.status(), STATUS_LOAD_FAILED);
        assert_eq!(copy.order(), 4096);
    }

    #[test]
    fn distances_cast_to_bytes() {
        let mut d: Vec<Distance> = vec![1, -1, 9999];
        assert_eq!(cast_slice(&d).len(), distance_bytes(3));
        cast_slice_mut(&mut d)[..4].copy_from_slice(&7i32.to_ne_bytes());
        assert_eq!(d[0], 7);
    }

    #[test]
    fn expect_exact_len_err() {
        assert!(expect_exact_len(3, 4).is_err());
        assert!(expect_exact_len(4, 4).is_ok());
    }
}
