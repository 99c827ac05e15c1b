//! Leverage common functionality across the blockcache primitives.

pub mod morton;

/// Construct a [std::num::NonZeroUsize] from a literal, panicking at compile time (in const
/// contexts) or at runtime if the value is zero.
#[macro_export]
macro_rules! NZUsize {
    ($val:expr) => {
        match std::num::NonZeroUsize::new($val) {
            Some(v) => v,
            None => panic!("value must be non-zero"),
        }
    };
}

/// Construct a [std::num::NonZeroU32] from a literal.
#[macro_export]
macro_rules! NZU32 {
    ($val:expr) => {
        match std::num::NonZeroU32::new($val) {
            Some(v) => v,
            None => panic!("value must be non-zero"),
        }
    };
}

/// Construct a [std::num::NonZeroU64] from a literal.
#[macro_export]
macro_rules! NZU64 {
    ($val:expr) => {
        match std::num::NonZeroU64::new($val) {
            Some(v) => v,
            None => panic!("value must be non-zero"),
        }
    };
}

/// Round `value` up to the nearest multiple of `multiple`, returning `None` on overflow.
///
/// # Panics
///
/// Panics if `multiple` is 0.
pub fn round_up(value: u64, multiple: u64) -> Option<u64> {
    assert!(multiple > 0);
    value.div_ceil(multiple).checked_mul(multiple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::{NonZeroU32, NonZeroU64, NonZeroUsize};

    #[test]
    fn test_nz_macros() {
        const A: NonZeroUsize = NZUsize!(64);
        const B: NonZeroU32 = NZU32!(7);
        const C: NonZeroU64 = NZU64!(1 << 40);
        assert_eq!(A.get(), 64);
        assert_eq!(B.get(), 7);
        assert_eq!(C.get(), 1 << 40);
    }

    #[test]
    #[should_panic(expected = "value must be non-zero")]
    fn test_nz_usize_zero() {
        let zero = 0;
        let _ = NZUsize!(zero);
    }

    #[test]
    fn test_round_up() {
        // Test case 0: zero stays zero
        assert_eq!(round_up(0, 8), Some(0));

        // Test case 1: exact multiple is unchanged
        assert_eq!(round_up(16, 8), Some(16));

        // Test case 2: partial multiple rounds up
        assert_eq!(round_up(17, 8), Some(24));
        assert_eq!(round_up(1, 1024), Some(1024));

        // Test case 3: overflow
        assert_eq!(round_up(u64::MAX, 8), None);
        assert_eq!(round_up(u64::MAX, 1), Some(u64::MAX));
    }
}
