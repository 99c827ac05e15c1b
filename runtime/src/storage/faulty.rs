//! A `Storage` wrapper that fails operations on demand.
//!
//! Faults are toggled through a shared [Faults] handle, so a test can let a consumer set itself
//! up against healthy storage and then pull the rug out from under it at a precise moment.

use crate::Error;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::trace;

/// Switches that control which operations fail.
#[derive(Default)]
struct Switches {
    open: AtomicBool,
    read: AtomicBool,
    write: AtomicBool,
    resize: AtomicBool,
}

/// A cloneable handle to the fault switches of a [Storage] and every [Blob] it opened.
#[derive(Clone, Default)]
pub struct Faults {
    switches: Arc<Switches>,
}

impl Faults {
    /// Make every subsequent [crate::Storage::open] fail.
    pub fn fail_open(&self, fail: bool) {
        self.switches.open.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent [crate::Blob::read_at] fail.
    pub fn fail_reads(&self, fail: bool) {
        self.switches.read.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent [crate::Blob::write_at] fail.
    pub fn fail_writes(&self, fail: bool) {
        self.switches.write.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent [crate::Blob::resize] fail.
    pub fn fail_resize(&self, fail: bool) {
        self.switches.resize.store(fail, Ordering::Relaxed);
    }

    /// Clear every switch.
    pub fn heal(&self) {
        self.fail_open(false);
        self.fail_reads(false);
        self.fail_writes(false);
        self.fail_resize(false);
    }

    fn check(&self, switch: &AtomicBool, operation: &'static str) -> Result<(), Error> {
        if switch.load(Ordering::Relaxed) {
            trace!(operation, "injecting fault");
            return Err(Error::Injected(operation));
        }
        Ok(())
    }
}

/// A wrapper around a `Storage` implementation that injects faults.
#[derive(Clone)]
pub struct Storage<S> {
    inner: S,
    faults: Faults,
}

impl<S> Storage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    /// A handle to toggle faults on this storage and all of its blobs.
    pub fn faults(&self) -> Faults {
        self.faults.clone()
    }
}

impl<S: crate::Storage> crate::Storage for Storage<S> {
    type Blob = Blob<S::Blob>;

    fn open(&self) -> Result<Self::Blob, Error> {
        self.faults.check(&self.faults.switches.open, "open")?;
        Ok(Blob {
            inner: self.inner.open()?,
            faults: self.faults.clone(),
        })
    }
}

/// A wrapper around a `Blob` implementation that injects faults.
#[derive(Clone)]
pub struct Blob<B> {
    inner: B,
    faults: Faults,
}

impl<B: crate::Blob> crate::Blob for Blob<B> {
    fn len(&self) -> Result<u64, Error> {
        self.inner.len()
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        self.faults.check(&self.faults.switches.read, "read")?;
        self.inner.read_at(buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        self.faults.check(&self.faults.switches.write, "write")?;
        self.inner.write_at(buf, offset)
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        self.faults.check(&self.faults.switches.resize, "resize")?;
        self.inner.resize(len)
    }

    fn sync(&self) -> Result<(), Error> {
        self.inner.sync()
    }
}
