//! A two-dimensional view over any [Array] that keeps nearby coordinates in nearby elements.
//!
//! The grid is cut into square tiles with an edge of `B = 2^log_edge` elements. Tiles are laid out
//! row-major, each tile occupies `B * B` consecutive elements, and the elements inside a tile are
//! ordered by their [Morton code](blockcache_utils::morton). Coordinate `(u, v)` maps to:
//!
//! ```text
//! ((v >> k) * (effective_width >> k) + (u >> k)) * B * B + morton(u & (B - 1), v & (B - 1))
//! ```
//!
//! so a small 2D neighborhood usually resolves to the same block of the underlying array, which is
//! what makes [BlockedArray] a good fit for a [Cache] that holds only a few blocks in memory.
//!
//! The requested `width` and `height` are rounded up to a multiple of `B`. Callers are expected to
//! stay within `[0, width) x [0, height)`, but every coordinate inside the padded
//! `[0, effective_width) x [0, effective_height)` grid is addressable.
//!
//! # Example
//!
//! ```rust
//! use blockcache_runtime::storage::memory::Storage;
//! use blockcache_storage::{
//!     blocked::{BlockedArray, Config},
//!     disk_cache::Cache,
//! };
//!
//! // One 16x16 tile per cache block
//! let cfg = Config::new(1000, 600, 4);
//! let mut image = BlockedArray::<Cache<[f32; 3], _, 256>>::init(Storage::default(), cfg).unwrap();
//! assert_eq!(image.effective_width(), 1008);
//! assert_eq!(image.effective_height(), 608);
//!
//! image.set(999, 599, [1.0, 0.5, 0.25]).unwrap();
//! assert_eq!(image.at(999, 599).unwrap(), [1.0, 0.5, 0.25]);
//! ```

use crate::{
    disk_cache::{self, Array, Cache, Error, Position, Reference},
    Element,
};
use blockcache_runtime::Storage;
use blockcache_utils::{morton, round_up, NZUsize};
use std::num::NonZeroUsize;

/// The number of blocks a disk-backed [BlockedArray] keeps in memory unless configured otherwise.
pub const DEFAULT_POOL_CAPACITY: NonZeroUsize = NZUsize!(64);

/// The largest supported `log_edge`.
pub const MAX_LOG_EDGE: u32 = 15;

/// Configuration for a [BlockedArray].
#[derive(Clone, Debug)]
pub struct Config {
    /// The requested number of columns.
    pub width: u32,

    /// The requested number of rows.
    pub height: u32,

    /// Base-2 logarithm of the tile edge. At most [MAX_LOG_EDGE].
    pub log_edge: u32,

    /// The maximum number of blocks held in memory (ignored by [BlockedArray::in_memory]).
    pub pool_capacity: NonZeroUsize,
}

impl Config {
    /// A configuration using [DEFAULT_POOL_CAPACITY].
    pub fn new(width: u32, height: u32, log_edge: u32) -> Self {
        Self {
            width,
            height,
            log_edge,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Padded dimensions and the coordinate transform.
#[derive(Clone, Copy, Debug)]
struct Grid {
    width: u32,
    height: u32,
    log_edge: u32,
    effective_width: u64,
    effective_height: u64,
}

impl Grid {
    fn new(width: u32, height: u32, log_edge: u32) -> Result<Self, Error> {
        if log_edge > MAX_LOG_EDGE {
            return Err(Error::InvalidEdge(log_edge));
        }
        let edge = 1u64 << log_edge;
        let effective_width = round_up(width as u64, edge).ok_or(Error::CapacityOverflow)?;
        let effective_height = round_up(height as u64, edge).ok_or(Error::CapacityOverflow)?;
        effective_width
            .checked_mul(effective_height)
            .ok_or(Error::CapacityOverflow)?;

        Ok(Self {
            width,
            height,
            log_edge,
            effective_width,
            effective_height,
        })
    }

    /// The number of elements in the padded grid. Checked not to overflow in [Grid::new].
    fn len(&self) -> u64 {
        self.effective_width * self.effective_height
    }

    fn index(&self, u: u32, v: u32) -> Result<u64, Error> {
        if u as u64 >= self.effective_width || v as u64 >= self.effective_height {
            return Err(Error::IndexOutOfRange(Position::Grid {
                u,
                v,
                width: self.effective_width,
                height: self.effective_height,
            }));
        }
        let k = self.log_edge;
        let mask = (1u32 << k) - 1;

        // Start of the tile, then the offset within it
        let tiles_per_row = self.effective_width >> k;
        let tile = (v >> k) as u64 * tiles_per_row + (u >> k) as u64;
        Ok((tile << (2 * k)) + morton::encode(u & mask, v & mask) as u64)
    }
}

/// A 2D array stored tile by tile in an underlying [Array].
pub struct BlockedArray<A: Array> {
    array: A,
    grid: Grid,
}

impl<T: Element, S: Storage, const BLOCK_LEN: usize> BlockedArray<Cache<T, S, BLOCK_LEN>> {
    /// Create a grid paged to storage opened from `storage`.
    ///
    /// `BLOCK_LEN` is the cache's block length. Choosing `B * B` makes each block exactly one
    /// tile.
    pub fn init(storage: S, cfg: Config) -> Result<Self, Error> {
        let grid = Grid::new(cfg.width, cfg.height, cfg.log_edge)?;
        let cache = Cache::open(
            storage,
            disk_cache::Config {
                element_count: grid.len(),
                pool_capacity: cfg.pool_capacity,
            },
        )?;
        Ok(Self { array: cache, grid })
    }
}

impl<T: Element, const BLOCK_LEN: usize> BlockedArray<Reference<T, BLOCK_LEN>> {
    /// Create a grid held entirely in memory.
    pub fn in_memory(cfg: Config) -> Result<Self, Error> {
        let grid = Grid::new(cfg.width, cfg.height, cfg.log_edge)?;
        let reference = Reference::new(grid.len())?;
        Ok(Self {
            array: reference,
            grid,
        })
    }
}

impl<A: Array> BlockedArray<A> {
    /// Lay a `width` x `height` grid over an existing array.
    ///
    /// Fails with [Error::ArrayTooSmall] if `array` cannot hold the padded grid. Elements past
    /// the end of the grid are left untouched.
    pub fn wrap(array: A, width: u32, height: u32, log_edge: u32) -> Result<Self, Error> {
        let grid = Grid::new(width, height, log_edge)?;
        if array.len() < grid.len() {
            return Err(Error::ArrayTooSmall {
                need: grid.len(),
                have: array.len(),
            });
        }
        Ok(Self { array, grid })
    }

    /// The requested number of columns.
    pub fn width(&self) -> u32 {
        self.grid.width
    }

    /// The requested number of rows.
    pub fn height(&self) -> u32 {
        self.grid.height
    }

    /// The number of columns after rounding up to a whole tile.
    pub fn effective_width(&self) -> u64 {
        self.grid.effective_width
    }

    /// The number of rows after rounding up to a whole tile.
    pub fn effective_height(&self) -> u64 {
        self.grid.effective_height
    }

    /// The length of a tile edge.
    pub fn edge(&self) -> u32 {
        1 << self.grid.log_edge
    }

    /// The linear index of `(u, v)` in the underlying array.
    pub fn index(&self, u: u32, v: u32) -> Result<u64, Error> {
        self.grid.index(u, v)
    }

    /// Return the current value at `(u, v)`.
    pub fn at(&mut self, u: u32, v: u32) -> Result<A::Item, Error> {
        let index = self.grid.index(u, v)?;
        self.array.read(index)
    }

    /// Return a mutable reference to the value at `(u, v)`.
    pub fn at_mut(&mut self, u: u32, v: u32) -> Result<&mut A::Item, Error> {
        let index = self.grid.index(u, v)?;
        self.array.get_mut(index)
    }

    /// Overwrite the value at `(u, v)`.
    pub fn set(&mut self, u: u32, v: u32, value: A::Item) -> Result<(), Error> {
        let index = self.grid.index(u, v)?;
        self.array.write(index, value)
    }

    pub fn inner(&self) -> &A {
        &self.array
    }

    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.array
    }

    pub fn into_inner(self) -> A {
        self.array
    }
}
