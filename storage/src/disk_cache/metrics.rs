//! Metrics for [super::Cache].

use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Metrics for [super::Cache].
#[derive(Debug, Default)]
pub struct Metrics {
    /// Accesses served by a resident block.
    pub hits: Counter,
    /// Accesses that had to load a block.
    pub misses: Counter,
    /// Blocks unmapped to make room for another.
    pub evictions: Counter,
    /// Modified blocks written to the backing store.
    pub write_backs: Counter,
    /// Blocks currently held in memory.
    pub resident: Gauge,
}

impl Metrics {
    /// Register metrics with the given registry.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "hits",
            "Accesses served by a resident block",
            self.hits.clone(),
        );
        registry.register(
            "misses",
            "Accesses that had to load a block",
            self.misses.clone(),
        );
        registry.register(
            "evictions",
            "Blocks unmapped to make room for another",
            self.evictions.clone(),
        );
        registry.register(
            "write_backs",
            "Modified blocks written to the backing store",
            self.write_backs.clone(),
        );
        registry.register(
            "resident",
            "Blocks currently held in memory",
            self.resident.clone(),
        );
    }
}
