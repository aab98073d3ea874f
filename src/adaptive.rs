//! Adaptive cache: a real LRU layer shadowed by a ghost cache of recently
//! evicted keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  AdaptiveCache<T>                                                  │
//! │                                                                    │
//! │   real:  ShardedLruCache<T>      holds live entries                │
//! │   ghost: ShardedLruCache<usize>  key → charge of the evicted entry │
//! │                                                                    │
//! │   insert ──► real (evictions spill the victim's key into ghost)    │
//! │                                                                    │
//! │   lookup_adaptive(key):                                            │
//! │     real hit   ──► Hit(handle)                                     │
//! │     ghost hit  ──► GhostHit(recorded charge)   (no handle)         │
//! │     otherwise  ──► Miss                                            │
//! │                                                                    │
//! │   adjust_capacity: deltas accumulate under a dedicated mutex and   │
//! │   flush once |sum| > 4096, split real/ghost by current charges     │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A ghost hit means "this key was evicted recently and is being asked for
//! again" — the caller uses the reported charge as a grow-this-cache signal,
//! feeding it back through `adjust_capacity`. The policy is deliberately
//! simpler than textbook ARC: the ghost drives a slow, threshold-gated
//! capacity rebalance instead of per-hit list migrations.
//!
//! Keyed single-argument `lookup`, `erase`, and `prune` are not part of this
//! layer's contract and panic; callers go through `lookup_adaptive`.
//!
//! ## Locking
//!
//! The accumulator mutex is only ever the outermost lock: it is released
//! before the flush touches the real or ghost shard locks, so shard locks
//! stay leaves and no ordering cycle can form.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::lru::{Handle, ShardedLruCache};
use crate::metrics::CacheMetricsRecorder;
use crate::traits::{AdaptiveLookup, Cache, Deleter, GhostCache};

/// Accumulated adjustment (in charge units) required before a capacity
/// rebalance is applied to the real/ghost pair.
pub(crate) const ADJUST_FLUSH_THRESHOLD: isize = 4096;

/// LRU cache paired with a ghost shadow that reports repeat-miss patterns.
///
/// # Example
///
/// ```
/// use adacache::adaptive::AdaptiveCache;
/// use adacache::traits::{AdaptiveLookup, Cache};
///
/// let cache: AdaptiveCache<u64> = AdaptiveCache::new(1 << 20);
/// let handle = cache.insert(b"row:17", 99, 128, None);
/// cache.release(handle);
///
/// match cache.lookup_adaptive(b"row:17") {
///     AdaptiveLookup::Hit(handle) => cache.release(handle),
///     AdaptiveLookup::GhostHit(charge) => cache.adjust_capacity(charge as isize),
///     AdaptiveLookup::Miss => {}
/// }
/// ```
pub struct AdaptiveCache<T> {
    real: ShardedLruCache<T>,
    ghost: GhostCache,
    pending_adjustment: Mutex<isize>,
    metrics: Option<Arc<dyn CacheMetricsRecorder>>,
}

impl<T: Clone + Send> AdaptiveCache<T> {
    /// Creates an adaptive cache giving half of `capacity` to each layer.
    pub fn new(capacity: usize) -> Self {
        Self::with_capacities(capacity / 2, capacity / 2)
    }

    /// Creates an adaptive cache with explicit per-layer capacities.
    pub fn with_capacities(real_capacity: usize, ghost_capacity: usize) -> Self {
        Self::from_parts(
            ShardedLruCache::new(real_capacity),
            ShardedLruCache::new(ghost_capacity),
        )
    }

    /// Assembles an adaptive cache from pre-built layers, e.g. single-shard
    /// caches for deterministic capacity enforcement.
    pub fn from_parts(real: ShardedLruCache<T>, ghost: GhostCache) -> Self {
        Self {
            real,
            ghost,
            pending_adjustment: Mutex::new(0),
            metrics: None,
        }
    }

    /// Attaches a metrics recorder; lookups, inserts, and usage samples are
    /// reported to it from now on.
    pub fn with_metrics(mut self, recorder: Arc<dyn CacheMetricsRecorder>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    /// Two-layer lookup. A real hit returns a handle and leaves the ghost
    /// untouched; a ghost hit reports the evicted entry's original charge
    /// and releases the ghost handle internally.
    pub fn lookup_adaptive(&self, key: &[u8]) -> AdaptiveLookup {
        if let Some(handle) = self.real.lookup(key) {
            if let Some(metrics) = &self.metrics {
                metrics.record_hit();
            }
            return AdaptiveLookup::Hit(handle);
        }

        if let Some(ghost_handle) = self.ghost.lookup(key) {
            let charge = self.ghost.value(&ghost_handle);
            self.ghost.release(ghost_handle);
            if let Some(metrics) = &self.metrics {
                metrics.record_ghost_hit();
            }
            return AdaptiveLookup::GhostHit(charge);
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_miss();
        }
        AdaptiveLookup::Miss
    }

    /// Runs `f` on the value behind a live handle without cloning.
    pub fn value_with<R>(&self, handle: &Handle, f: impl FnOnce(&T) -> R) -> R {
        self.real.value_with(handle, f)
    }

    /// Summed charge of the real layer only.
    pub fn total_real_charge(&self) -> usize {
        self.real.total_charge()
    }

    /// Summed charge of the ghost layer only.
    pub fn total_ghost_charge(&self) -> usize {
        self.ghost.total_charge()
    }

    /// Reports the current real/ghost charge split to the metrics recorder.
    /// Sampling cadence is the caller's choice.
    pub fn sample_usage(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_usage_sample(
                self.real.total_charge(),
                self.ghost.total_charge(),
                self.real.capacity(),
            );
        }
    }

    /// The live-entry layer.
    pub fn real_cache(&self) -> &ShardedLruCache<T> {
        &self.real
    }

    /// The evicted-key shadow layer.
    pub fn ghost_cache(&self) -> &GhostCache {
        &self.ghost
    }

    /// Splits `delta` between the layers in proportion to their current
    /// charges. An empty real layer takes the whole delta: with nothing
    /// cached yet there is no eviction history worth funding.
    fn flush_adjustment(&self, delta: isize) {
        let real_charge = self.real.total_charge();
        let ghost_charge = self.ghost.total_charge();
        if real_charge == 0 {
            self.real.adjust_capacity(delta);
            return;
        }
        let ratio = ghost_charge as f64 / real_charge as f64;
        let ghost_share = (delta as f64 * ratio / (ratio + 1.0)) as isize;
        let real_share = (delta as f64 / (ratio + 1.0)) as isize;
        self.ghost.adjust_capacity(ghost_share);
        self.real.adjust_capacity(real_share);
    }
}

impl<T: Clone + Send> Cache<T> for AdaptiveCache<T> {
    fn insert(&self, key: &[u8], value: T, charge: usize, deleter: Option<Deleter<T>>) -> Handle {
        if let Some(metrics) = &self.metrics {
            metrics.record_insert();
        }
        self.real
            .insert_with_ghost(key, value, charge, &self.ghost, deleter)
    }

    /// Unsupported: the adaptive layer owns its ghost routing.
    fn lookup(&self, _key: &[u8]) -> Option<Handle> {
        panic!("AdaptiveCache has no single-argument lookup; use lookup_adaptive");
    }

    fn release(&self, handle: Handle) {
        self.real.release(handle)
    }

    fn value(&self, handle: &Handle) -> T {
        self.real.value(handle)
    }

    /// Unsupported on the adaptive layer.
    fn erase(&self, _key: &[u8]) {
        panic!("AdaptiveCache does not support erase");
    }

    fn new_id(&self) -> u64 {
        self.real.new_id()
    }

    /// Unsupported on the adaptive layer.
    fn prune(&self) {
        panic!("AdaptiveCache does not support prune");
    }

    fn total_charge(&self) -> usize {
        self.real.total_charge() + self.ghost.total_charge()
    }

    fn capacity(&self) -> usize {
        self.real.capacity()
    }

    /// Accumulates `delta`; once the magnitude of the accumulated adjustment
    /// crosses the flush threshold, resets the accumulator and rebalances
    /// the layers charge-proportionally. The accumulator lock is dropped
    /// before any shard lock is taken.
    fn adjust_capacity(&self, delta: isize) {
        let flush = {
            let mut pending = self.pending_adjustment.lock();
            *pending += delta;
            if pending.abs() > ADJUST_FLUSH_THRESHOLD {
                *pending = 0;
                true
            } else {
                false
            }
        };
        if flush {
            self.flush_adjustment(delta);
        }
    }
}
