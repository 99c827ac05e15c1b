use crate::Error;
use std::{fs::File, io::ErrorKind, path::PathBuf, sync::Arc};
use tracing::debug;

/// Configuration for [Storage].
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Directory in which to create temporary files. If `None`, the platform's temporary
    /// directory is used.
    pub directory: Option<PathBuf>,
}

impl Config {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory: Some(directory),
        }
    }
}

/// Storage backed by anonymous temporary files.
///
/// Each blob is a file that is removed from the filesystem namespace as soon as it is created
/// (where the platform allows it), so the operating system reclaims its space once the last
/// handle is dropped, including when the process exits abnormally.
#[derive(Clone, Default)]
pub struct Storage {
    cfg: Config,
}

impl Storage {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }
}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self) -> Result<Blob, Error> {
        let file = match &self.cfg.directory {
            Some(directory) => tempfile::tempfile_in(directory),
            None => tempfile::tempfile(),
        }
        .map_err(Error::StoreUnavailable)?;
        debug!(directory = ?self.cfg.directory, "opened temporary blob");

        Ok(Blob {
            file: Arc::new(file),
        })
    }
}

/// A [crate::Blob] backed by an anonymous temporary file.
#[derive(Clone)]
pub struct Blob {
    file: Arc<File>,
}

impl crate::Blob for Blob {
    fn len(&self) -> Result<u64, Error> {
        let metadata = self.file.metadata().map_err(|_| Error::ReadFailed)?;
        Ok(metadata.len())
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        offset
            .checked_add(buf.len() as u64)
            .ok_or(Error::OffsetOverflow)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset).map_err(|e| {
                if e.kind() == ErrorKind::UnexpectedEof {
                    Error::BlobInsufficientLength
                } else {
                    Error::ReadFailed
                }
            })?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut read = 0;
            while read < buf.len() {
                let n = match self.file.seek_read(&mut buf[read..], offset + read as u64) {
                    Ok(n) => n,
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => 0,
                    Err(_) => return Err(Error::ReadFailed),
                };
                if n == 0 {
                    return Err(Error::BlobInsufficientLength);
                }
                read += n;
            }
        }
        Ok(())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        offset
            .checked_add(buf.len() as u64)
            .ok_or(Error::OffsetOverflow)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file
                .write_all_at(buf, offset)
                .map_err(|_| Error::WriteFailed)?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut written = 0;
            while written < buf.len() {
                let n = self
                    .file
                    .seek_write(&buf[written..], offset + written as u64)
                    .map_err(|_| Error::WriteFailed)?;
                if n == 0 {
                    return Err(Error::WriteFailed);
                }
                written += n;
            }
        }
        Ok(())
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        self.file.set_len(len).map_err(Error::BlobResizeFailed)
    }

    fn sync(&self) -> Result<(), Error> {
        self.file.sync_data().map_err(Error::BlobSyncFailed)
    }
}
