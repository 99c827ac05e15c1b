//! Fixed-size encoding of the values stored in a [crate::disk_cache::Cache].
//!
//! Every [Element] occupies exactly [Element::SIZE] bytes in the backing store, so the byte
//! offset of any element is a pure function of its index. Multi-byte numbers are written
//! big-endian.

use bytes::{Buf, BufMut};

/// A value with a known, fixed encoded length.
pub trait Element: Clone + Send + 'static {
    /// The length of the encoded value.
    const SIZE: usize;

    /// Encode `self` into exactly [Element::SIZE] bytes of `buf`.
    fn write(&self, buf: &mut impl BufMut);

    /// Decode a value from the next [Element::SIZE] bytes of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` has fewer than [Element::SIZE] bytes remaining.
    fn read(buf: &mut impl Buf) -> Self;

    /// The value decoded from an all-zero record.
    ///
    /// Storage starts zero-filled, so this is what every element reads as before it is first
    /// written.
    fn zeroed() -> Self {
        let zeros = vec![0u8; Self::SIZE];
        Self::read(&mut zeros.as_slice())
    }
}

macro_rules! impl_numeric {
    ($type:ty, $read_method:ident, $write_method:ident) => {
        impl Element for $type {
            const SIZE: usize = std::mem::size_of::<$type>();

            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }

            #[inline]
            fn read(buf: &mut impl Buf) -> Self {
                buf.$read_method()
            }
        }
    };
}

impl_numeric!(u8, get_u8, put_u8);
impl_numeric!(u16, get_u16, put_u16);
impl_numeric!(u32, get_u32, put_u32);
impl_numeric!(u64, get_u64, put_u64);
impl_numeric!(u128, get_u128, put_u128);
impl_numeric!(i8, get_i8, put_i8);
impl_numeric!(i16, get_i16, put_i16);
impl_numeric!(i32, get_i32, put_i32);
impl_numeric!(i64, get_i64, put_i64);
impl_numeric!(i128, get_i128, put_i128);
impl_numeric!(f32, get_f32, put_f32);
impl_numeric!(f64, get_f64, put_f64);

impl Element for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(u8::from(*self));
    }

    // Any non-zero byte is true.
    #[inline]
    fn read(buf: &mut impl Buf) -> Self {
        buf.get_u8() != 0
    }
}

impl<T: Element, const N: usize> Element for [T; N] {
    const SIZE: usize = T::SIZE * N;

    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        for item in self {
            item.write(buf);
        }
    }

    #[inline]
    fn read(buf: &mut impl Buf) -> Self {
        std::array::from_fn(|_| T::read(buf))
    }
}
