//! A fixed-capacity array that pages blocks of elements to ephemeral storage.
//!
//! [Cache] presents `element_count` elements addressed by a linear index. Elements are grouped
//! into blocks of `BLOCK_LEN` consecutive elements, the unit of both residency and I/O. At most
//! `pool_capacity` blocks are held in memory at once; every other block lives in a
//! [blockcache_runtime::Blob] opened when the cache is initialized.
//!
//! # Sizing
//!
//! The requested `element_count` is rounded up to the smallest multiple of `BLOCK_LEN`, and the
//! rounded size is what [Cache::effective_element_count] reports. Callers must tolerate the
//! trailing padding elements. The backing blob is sized to exactly
//! `block_count * BLOCK_LEN * T::SIZE` bytes up front and starts zero-filled, so an element that
//! was never written reads as [crate::Element::zeroed].
//!
//! # Replacement
//!
//! Each access (read or write) stamps the block's slot with a strictly increasing counter. When a
//! block that is not resident is requested and every slot is occupied, the slot with the smallest
//! stamp is repurposed (ties go to the lowest slot index): if it was modified since it was loaded
//! it is first written back to the blob, then its old block is unmapped and the requested block
//! is read in. Finding the victim is a linear scan over the slots, which is cheap for pools of
//! tens to low hundreds of blocks.
//!
//! A hit performs no I/O.
//!
//! # Durability
//!
//! None. Modified blocks are written back when they are evicted or when [Cache::sync] is called.
//! Dropping a [Cache] discards any resident modifications along with the blob itself.
//!
//! # Faults
//!
//! The cache is the only copy of any block it has evicted, so a failed read or write against the
//! blob is not retried or papered over: the error is returned and the cache is poisoned. Every
//! later operation fails with [Error::Poisoned].
//!
//! # Example
//!
//! ```rust
//! use blockcache_runtime::storage::memory::Storage;
//! use blockcache_storage::disk_cache::{Array, Cache, Config};
//! use blockcache_utils::NZUsize;
//!
//! let cfg = Config {
//!     element_count: 100_000,
//!     pool_capacity: NZUsize!(8),
//! };
//! let mut cache = Cache::<f32, _, 1024>::open(Storage::default(), cfg).unwrap();
//! assert_eq!(cache.effective_element_count(), 100_352);
//!
//! *cache.get_mut(42).unwrap() = 1.5;
//! assert_eq!(cache.read(42).unwrap(), 1.5);
//! assert_eq!(cache.read(99_999).unwrap(), 0.0);
//! ```

use crate::Element;
use std::{fmt, num::NonZeroUsize};
use thiserror::Error;

mod metrics;
mod reference;
mod storage;

pub use metrics::Metrics;
pub use reference::Reference;
pub use storage::Cache;

/// Where an out-of-range access was aimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// A linear element index.
    Linear { index: u64, len: u64 },
    /// A two-dimensional coordinate.
    Grid {
        u: u32,
        v: u32,
        width: u64,
        height: u64,
    },
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear { index, len } => write!(f, "index {index} (len {len})"),
            Self::Grid {
                u,
                v,
                width,
                height,
            } => write!(f, "({u}, {v}) (size {width}x{height})"),
        }
    }
}

/// Errors that can occur when interacting with the cache.
#[derive(Debug, Error)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] blockcache_runtime::Error),
    #[error("store unavailable: {0}")]
    StoreUnavailable(blockcache_runtime::Error),
    #[error("index out of range: {0}")]
    IndexOutOfRange(Position),
    #[error("already initialized")]
    AlreadyInitialized,
    #[error("not initialized")]
    NotInitialized,
    #[error("poisoned by an earlier storage fault")]
    Poisoned,
    #[error("invalid block length: {0}")]
    InvalidBlockLength(usize),
    #[error("invalid tile edge: 2^{0}")]
    InvalidEdge(u32),
    #[error("capacity overflow")]
    CapacityOverflow,
    #[error("array too small: need {need} elements, have {have}")]
    ArrayTooSmall { need: u64, have: u64 },
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Configuration for [Cache] storage.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of elements requested. Rounded up to a multiple of the block length.
    pub element_count: u64,

    /// The maximum number of blocks held in memory at once.
    pub pool_capacity: NonZeroUsize,
}

/// A fixed-length array of [Element]s addressed by linear index.
///
/// Reads take `&mut self` because an access may change which blocks are resident. A reference
/// returned by [Array::get_mut] therefore ends before the next access begins.
pub trait Array {
    /// The element type.
    type Item: Element;

    /// The number of addressable elements.
    fn len(&self) -> u64;

    /// Returns true if no element is addressable.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the current value of element `index`.
    fn read(&mut self, index: u64) -> Result<Self::Item, Error>;

    /// Return a mutable reference to element `index`.
    fn get_mut(&mut self, index: u64) -> Result<&mut Self::Item, Error>;

    /// Overwrite element `index` with `value`.
    fn write(&mut self, index: u64, value: Self::Item) -> Result<(), Error> {
        *self.get_mut(index)? = value;
        Ok(())
    }
}

impl<A: Array + ?Sized> Array for &mut A {
    type Item = A::Item;

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read(&mut self, index: u64) -> Result<Self::Item, Error> {
        (**self).read(index)
    }

    fn get_mut(&mut self, index: u64) -> Result<&mut Self::Item, Error> {
        (**self).get_mut(index)
    }
}

/// Returns the number of blocks of `BLOCK_LEN` elements needed to hold `element_count` elements.
///
/// Fails if `BLOCK_LEN` is not a non-zero power of two.
pub(crate) fn block_count<const BLOCK_LEN: usize>(element_count: u64) -> Result<u64, Error> {
    if !BLOCK_LEN.is_power_of_two() {
        return Err(Error::InvalidBlockLength(BLOCK_LEN));
    }
    Ok(element_count.div_ceil(BLOCK_LEN as u64))
}
