//! Sentinel-aware distance arithmetic.
//!
//! Distances are plain `i32`. The reserved value [`SENTINEL`] means "no path known" and is
//! absorbing under [`sat_add`]: anything plus the sentinel is the sentinel, and a finite sum that
//! would reach or pass the sentinel is clamped to it. Ordinary `+` must never be applied to two
//! distances directly.

/// Scalar type of every matrix cell.
pub type Distance = i32;

/// "No edge" / "unreachable" marker used by the text format and the whole engine.
pub const SENTINEL: Distance = 9999;

/// True when `d` carries no path.
#[inline]
pub fn is_sentinel(d: Distance) -> bool {
    d == SENTINEL
}

/// Sentinel-absorbing saturating addition.
#[inline]
pub fn sat_add(a: Distance, b: Distance) -> Distance {
    if is_sentinel(a) || is_sentinel(b) {
        return SENTINEL;
    }
    let sum = a.saturating_add(b);
    if sum >= SENTINEL { SENTINEL } else { sum }
}

/// Minimum where the sentinel behaves as the largest element.
#[inline]
pub fn sat_min(a: Distance, b: Distance) -> Distance {
    match (is_sentinel(a), is_sentinel(b)) {
        (true, _) => b,
        (_, true) => a,
        _ => a.min(b),
    }
}

/// One Floyd-Warshall cell update: `current` against the path `i → k → j`.
///
/// Returns `current` untouched when either leg is the sentinel.
#[inline]
pub fn relax(current: Distance, via_ik: Distance, via_kj: Distance) -> Distance {
    if is_sentinel(via_ik) || is_sentinel(via_kj) {
        return current;
    }
    sat_min(current, sat_add(via_ik, via_kj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sentinel_is_absorbing() {
        assert_eq!(sat_add(SENTINEL, SENTINEL), SENTINEL);
        assert_eq!(sat_add(SENTINEL, 3), SENTINEL);
        assert_eq!(sat_add(-4, SENTINEL), SENTINEL);
    }

    #[test]
    fn finite_sums_clamp_at_sentinel() {
        assert_eq!(sat_add(5000, 4998), 9998);
        assert_eq!(sat_add(5000, 4999), SENTINEL);
        assert_eq!(sat_add(i32::MAX - 1, i32::MAX - 1), SENTINEL);
        assert_eq!(sat_add(i32::MIN, -1), i32::MIN);
    }

    #[test]
    fn relax_skips_unreachable_legs() {
        assert_eq!(relax(7, SENTINEL, 1), 7);
        assert_eq!(relax(7, 1, SENTINEL), 7);
        assert_eq!(relax(SENTINEL, SENTINEL, SENTINEL), SENTINEL);
        assert_eq!(relax(SENTINEL, 2, 3), 5);
        assert_eq!(relax(4, 2, 3), 4);
    }

    proptest! {
        #[test]
        fn relax_never_increases(cur in -100i32..=SENTINEL, a in -100i32..=SENTINEL, b in -100i32..=SENTINEL) {
            let out = relax(cur, a, b);
            prop_assert!(out <= cur);
            if is_sentinel(a) || is_sentinel(b) {
                prop_assert_eq!(out, cur);
            }
        }
    }
}
