//! Page fixed-size arrays between a bounded in-memory pool and ephemeral storage.
//!
//! [disk_cache::Cache] presents a flat array of elements that is far larger than the memory it
//! keeps resident: elements are grouped into fixed-length blocks, a bounded pool of blocks is
//! held in RAM, and everything else lives in a [blockcache_runtime::Blob] that is discarded when
//! the cache is dropped. [blocked::BlockedArray] layers a two-dimensional, tile-ordered view on
//! top of any [disk_cache::Array], and [shared::Shared] makes an array usable from several
//! threads.
//!
//! # Status
//!
//! `blockcache-storage` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

pub mod blocked;
pub mod disk_cache;
pub mod element;
pub mod shared;

pub use element::Element;
