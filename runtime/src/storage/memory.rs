use crate::Error;
use std::sync::{Arc, RwLock};

/// In-memory storage implementation for the block cache runtime.
///
/// Useful for tests and for workloads that only need the paging machinery (and not the memory
/// savings) of a disk-backed cache.
#[derive(Clone, Default)]
pub struct Storage {}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self) -> Result<Self::Blob, Error> {
        Ok(Blob::default())
    }
}

/// A [crate::Blob] held in RAM.
#[derive(Clone, Default)]
pub struct Blob {
    content: Arc<RwLock<Vec<u8>>>,
}

/// Convert `offset` and `len` into an in-memory byte range.
fn range(offset: u64, len: usize) -> Result<(usize, usize), Error> {
    let start: usize = offset.try_into().map_err(|_| Error::OffsetOverflow)?;
    let end = start.checked_add(len).ok_or(Error::OffsetOverflow)?;
    Ok((start, end))
}

impl crate::Blob for Blob {
    fn len(&self) -> Result<u64, Error> {
        let content = self.content.read().unwrap();
        Ok(content.len() as u64)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        let (start, end) = range(offset, buf.len())?;
        let content = self.content.read().unwrap();
        if end > content.len() {
            return Err(Error::BlobInsufficientLength);
        }
        buf.copy_from_slice(&content[start..end]);
        Ok(())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        let (start, end) = range(offset, buf.len())?;
        let mut content = self.content.write().unwrap();
        if end > content.len() {
            content.resize(end, 0);
        }
        content[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        let len: usize = len.try_into().map_err(|_| Error::OffsetOverflow)?;
        let mut content = self.content.write().unwrap();
        content.resize(len, 0);
        Ok(())
    }

    fn sync(&self) -> Result<(), Error> {
        Ok(())
    }
}
