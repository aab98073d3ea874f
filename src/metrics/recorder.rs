//! Metrics recording seam for the adaptive cache layers.
//!
//! Recording, snapshotting, and export are split into separate pieces so
//! production monitoring and tests consume the same counters without
//! coupling either to cache internals. There is deliberately no process-wide
//! singleton: a recorder is injected per cache (or not at all), and whoever
//! owns it decides when to snapshot and flush.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::CacheMetricsSnapshot;

/// Counter sink the adaptive layers call into on every keyed operation.
///
/// Implementations must be cheap and thread-safe; calls happen outside any
/// shard lock.
pub trait CacheMetricsRecorder: Send + Sync {
    /// A lookup served by the real cache.
    fn record_hit(&self);
    /// A lookup that missed both the real and the ghost layer.
    fn record_miss(&self);
    /// A lookup that missed the real cache but matched a recently evicted
    /// key in the ghost layer.
    fn record_ghost_hit(&self);
    /// An insert into the real cache.
    fn record_insert(&self);
    /// A caller-initiated usage sample of the real/ghost charge split.
    fn record_usage_sample(&self, real_charge: usize, ghost_charge: usize, capacity: usize);
}

/// Lock-free recorder backed by relaxed atomic counters.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use adacache::metrics::{AtomicCacheMetrics, CacheMetricsRecorder};
/// use adacache::prelude::*;
///
/// let metrics = Arc::new(AtomicCacheMetrics::new());
/// let cache: BlockCache<u64> = CacheBuilder::new(1 << 20)
///     .metrics(Arc::clone(&metrics) as Arc<dyn CacheMetricsRecorder>)
///     .try_build_block()
///     .unwrap();
///
/// let handle = cache.insert(b"block:0", 1, 512, None);
/// cache.release(handle);
/// if let AdaptiveLookup::Hit(handle) = cache.lookup_adaptive(b"block:0") {
///     cache.release(handle);
/// }
///
/// assert_eq!(metrics.snapshot().hits, 1);
/// ```
#[derive(Debug, Default)]
pub struct AtomicCacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    ghost_hits: AtomicU64,
    inserts: AtomicU64,
    usage_samples: AtomicU64,
    real_charge_sum: AtomicU64,
    ghost_charge_sum: AtomicU64,
    capacity_sum: AtomicU64,
}

impl AtomicCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ghost_hits: self.ghost_hits.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            usage_samples: self.usage_samples.load(Ordering::Relaxed),
            real_charge_sum: self.real_charge_sum.load(Ordering::Relaxed),
            ghost_charge_sum: self.ghost_charge_sum.load(Ordering::Relaxed),
            capacity_sum: self.capacity_sum.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetricsRecorder for AtomicCacheMetrics {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_ghost_hit(&self) {
        self.ghost_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_usage_sample(&self, real_charge: usize, ghost_charge: usize, capacity: usize) {
        self.usage_samples.fetch_add(1, Ordering::Relaxed);
        self.real_charge_sum
            .fetch_add(real_charge as u64, Ordering::Relaxed);
        self.ghost_charge_sum
            .fetch_add(ghost_charge as u64, Ordering::Relaxed);
        self.capacity_sum
            .fetch_add(capacity as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = AtomicCacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_ghost_hit();
        metrics.record_insert();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.ghost_hits, 1);
        assert_eq!(snapshot.inserts, 1);
        assert_eq!(snapshot.lookups(), 4);
    }

    #[test]
    fn usage_samples_average_out() {
        let metrics = AtomicCacheMetrics::new();
        metrics.record_usage_sample(50, 10, 100);
        metrics.record_usage_sample(100, 30, 100);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.usage_samples, 2);
        assert!((snapshot.avg_real_usage() - 0.75).abs() < 1e-9);
        assert!((snapshot.avg_ghost_usage() - 0.20).abs() < 1e-9);
    }
}
