//! Provide ephemeral, randomly addressable byte storage for the block cache.
//!
//! A [Storage] hands out fresh, anonymous [Blob]s. A [Blob] is a flat byte range addressed by
//! absolute offset that lives only as long as its handle (or the last clone of it): nothing
//! written to it survives the process, and nothing about it is meant to be shared with another
//! process.
//!
//! All operations are synchronous. A read or write either transfers exactly the requested bytes
//! or fails; there is no partial success and no retry.
//!
//! # Backends
//!
//! - [storage::file]: anonymous temporary files on the local filesystem.
//! - [storage::memory]: a byte vector held in RAM.
//! - [storage::metered]: wraps any [Storage] and counts reads and writes.
//! - [storage::faulty]: wraps any [Storage] and fails operations on demand.
//!
//! # Status
//!
//! `blockcache-runtime` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

use std::io::Error as IoError;
use thiserror::Error;

pub mod storage;

/// Errors that can occur when interacting with the runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("store unavailable: {0}")]
    StoreUnavailable(IoError),
    #[error("read failed")]
    ReadFailed,
    #[error("write failed")]
    WriteFailed,
    #[error("blob insufficient length")]
    BlobInsufficientLength,
    #[error("blob resize failed: {0}")]
    BlobResizeFailed(IoError),
    #[error("blob sync failed: {0}")]
    BlobSyncFailed(IoError),
    #[error("offset overflow")]
    OffsetOverflow,
    #[error("injected fault: {0}")]
    Injected(&'static str),
}

/// Interface to create ephemeral [Blob]s.
///
/// Every call to [Storage::open] returns a new, empty blob that shares no contents with any
/// other blob.
pub trait Storage: Clone + Send + Sync + 'static {
    /// The readable/writeable storage buffer that can be opened by this Storage.
    type Blob: Blob;

    /// Create a new, empty [Blob].
    ///
    /// Fails with [Error::StoreUnavailable] if the platform cannot provide temporary storage.
    fn open(&self) -> Result<Self::Blob, Error>;
}

/// Interface to read and write to a blob.
///
/// To support concurrent read/write operations, a blob is expected to be cheaply cloneable and
/// to synchronize access internally. Callers that need a consistent view across several
/// operations must still serialize those operations themselves.
///
/// When the last handle to a blob is dropped, its contents are discarded.
#[allow(clippy::len_without_is_empty)]
pub trait Blob: Clone + Send + Sync + 'static {
    /// Get the length of the blob.
    fn len(&self) -> Result<u64, Error>;

    /// Read from the blob at the given offset.
    ///
    /// `read_at` does not return the number of bytes read because it
    /// only returns once the entire buffer has been filled.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error>;

    /// Write `buf` to the blob at the given offset.
    ///
    /// Writing past the current end of the blob extends it.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error>;

    /// Resize the blob to the given length.
    ///
    /// If the length is greater than the current length, the blob is extended with zeros.
    /// If the length is less than the current length, the blob is truncated.
    fn resize(&self, len: u64) -> Result<(), Error>;

    /// Flush any buffered writes to the underlying medium.
    fn sync(&self) -> Result<(), Error>;
}
