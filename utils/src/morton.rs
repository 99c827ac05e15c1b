//! Morton (Z-order) transforms.
//!
//! A Morton code interleaves the bits of two coordinates into a single index: bit `i` of `x`
//! lands at bit `2i` and bit `i` of `y` lands at bit `2i + 1`. Coordinates that are close in 2D
//! tend to be close in the resulting 1D order, which is what makes the code useful for laying out
//! square tiles of data.

/// The largest coordinate (exclusive) that survives a round trip through [encode].
pub const MAX_COORDINATE: u32 = 1 << 16;

/// Spread the low 16 bits of `v` so that bit `i` moves to bit `2i`.
#[inline]
const fn spread(mut v: u32) -> u32 {
    v &= 0x0000_ffff;
    v = (v | (v << 8)) & 0x00ff_00ff;
    v = (v | (v << 4)) & 0x0f0f_0f0f;
    v = (v | (v << 2)) & 0x3333_3333;
    v = (v | (v << 1)) & 0x5555_5555;
    v
}

/// Inverse of [spread]: gather the even bits of `v` into the low 16 bits.
#[inline]
const fn compact(mut v: u32) -> u32 {
    v &= 0x5555_5555;
    v = (v | (v >> 1)) & 0x3333_3333;
    v = (v | (v >> 2)) & 0x0f0f_0f0f;
    v = (v | (v >> 4)) & 0x00ff_00ff;
    v = (v | (v >> 8)) & 0x0000_ffff;
    v
}

/// Encode `x` and `y` into a Morton index.
///
/// Only the low 16 bits of each coordinate are used (see [MAX_COORDINATE]).
#[inline]
pub const fn encode(x: u32, y: u32) -> u32 {
    spread(x) | (spread(y) << 1)
}

/// Decode a Morton index into its `(x, y)` coordinates.
#[inline]
pub const fn decode(d: u32) -> (u32, u32) {
    (compact(d), compact(d >> 1))
}
