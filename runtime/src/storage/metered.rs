use crate::Error;
use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

pub struct Metrics {
    pub open_blobs: Gauge,
    pub storage_reads: Counter,
    pub storage_read_bytes: Counter,
    pub storage_writes: Counter,
    pub storage_write_bytes: Counter,
}

impl Metrics {
    /// Initialize the `Metrics` struct and register the metrics in the provided registry.
    pub(crate) fn new(registry: &mut Registry) -> Self {
        let metrics = Self {
            open_blobs: Gauge::default(),
            storage_reads: Counter::default(),
            storage_read_bytes: Counter::default(),
            storage_writes: Counter::default(),
            storage_write_bytes: Counter::default(),
        };

        registry.register(
            "open_blobs",
            "Number of open blobs",
            metrics.open_blobs.clone(),
        );
        registry.register(
            "storage_reads",
            "Total number of disk reads",
            metrics.storage_reads.clone(),
        );
        registry.register(
            "storage_read_bytes",
            "Total amount of data read from disk",
            metrics.storage_read_bytes.clone(),
        );
        registry.register(
            "storage_writes",
            "Total number of disk writes",
            metrics.storage_writes.clone(),
        );
        registry.register(
            "storage_write_bytes",
            "Total amount of data written to disk",
            metrics.storage_write_bytes.clone(),
        );

        metrics
    }
}

/// A wrapper around a `Storage` implementation that tracks metrics.
#[derive(Clone)]
pub struct Storage<S> {
    inner: S,
    metrics: Arc<Metrics>,
}

impl<S> Storage<S> {
    pub fn new(inner: S, registry: &mut Registry) -> Self {
        Self {
            inner,
            metrics: Metrics::new(registry).into(),
        }
    }

    /// The metrics shared by this storage and every blob it has opened.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl<S: crate::Storage> crate::Storage for Storage<S> {
    type Blob = Blob<S::Blob>;

    fn open(&self) -> Result<Self::Blob, Error> {
        let inner = self.inner.open()?;
        Ok(Blob {
            inner,
            _guard: Arc::new(OpenGuard::new(self.metrics.clone())),
            metrics: self.metrics.clone(),
        })
    }
}

/// Tracks a single open blob in the `open_blobs` gauge for as long as any clone of it lives.
struct OpenGuard {
    metrics: Arc<Metrics>,
}

impl OpenGuard {
    fn new(metrics: Arc<Metrics>) -> Self {
        metrics.open_blobs.inc();
        Self { metrics }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.metrics.open_blobs.dec();
    }
}

/// A wrapper around a `Blob` implementation that tracks metrics
#[derive(Clone)]
pub struct Blob<B> {
    inner: B,
    _guard: Arc<OpenGuard>,
    metrics: Arc<Metrics>,
}

impl<B: crate::Blob> crate::Blob for Blob<B> {
    fn len(&self) -> Result<u64, Error> {
        self.inner.len()
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        self.inner.read_at(buf, offset)?;
        self.metrics.storage_reads.inc();
        self.metrics.storage_read_bytes.inc_by(buf.len() as u64);
        Ok(())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), Error> {
        self.inner.write_at(buf, offset)?;
        self.metrics.storage_writes.inc();
        self.metrics.storage_write_bytes.inc_by(buf.len() as u64);
        Ok(())
    }

    fn resize(&self, len: u64) -> Result<(), Error> {
        self.inner.resize(len)
    }

    fn sync(&self) -> Result<(), Error> {
        self.inner.sync()
    }
}
