//! Point cache: two adaptive planes competing for one capacity budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  PointCache<V, P>                                                    │
//! │                                                                      │
//! │   kv: AdaptiveCache<V>    key → materialized value                   │
//! │   kp: AdaptiveCache<P>    key → pointer/indirection to the value     │
//! │                                                                      │
//! │   adjust_capacity(delta):                                            │
//! │     ratio = kv_charge / kp_charge                                    │
//! │     kv += delta · ratio / (1 + ratio)                                │
//! │     kp += delta / (1 + ratio)                                        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two planes represent competing point-lookup strategies: caching the
//! value itself (cheap reads, large entries) versus caching only a pointer
//! to it (small entries, one extra hop). Their optimal split is workload
//! dependent, so capacity flows toward the plane carrying more charge; the
//! ghost-hit signal that drives the deltas comes from the caller observing
//! `lookup_kv` / `lookup_kp` outcomes.

use std::sync::Arc;

use crate::adaptive::AdaptiveCache;
use crate::lru::Handle;
use crate::metrics::CacheMetricsRecorder;
use crate::traits::{AdaptiveLookup, Cache, Deleter};

/// Two-plane adaptive cache for point lookups.
///
/// # Example
///
/// ```
/// use adacache::point::PointCache;
/// use adacache::traits::AdaptiveLookup;
///
/// // KV plane holds values, KP plane holds (file, offset) pointers.
/// let cache: PointCache<Vec<u8>, (u64, u64)> = PointCache::new(1 << 20);
///
/// let handle = cache.insert_kv(b"user:42", b"profile".to_vec(), 64, None);
/// cache.release_kv(handle);
///
/// if let AdaptiveLookup::Hit(handle) = cache.lookup_kv(b"user:42") {
///     assert_eq!(cache.value_kv(&handle), b"profile".to_vec());
///     cache.release_kv(handle);
/// }
/// ```
pub struct PointCache<V, P> {
    kv: AdaptiveCache<V>,
    kp: AdaptiveCache<P>,
}

impl<V: Clone + Send, P: Clone + Send> PointCache<V, P> {
    /// Creates a point cache giving half of `capacity` to each plane.
    pub fn new(capacity: usize) -> Self {
        Self {
            kv: AdaptiveCache::new(capacity / 2),
            kp: AdaptiveCache::new(capacity / 2),
        }
    }

    /// Assembles a point cache from pre-built planes.
    pub fn from_parts(kv: AdaptiveCache<V>, kp: AdaptiveCache<P>) -> Self {
        Self { kv, kp }
    }

    /// Attaches one metrics recorder to both planes; their activity is
    /// aggregated into the same counters.
    pub fn with_metrics(self, recorder: Arc<dyn CacheMetricsRecorder>) -> Self {
        Self {
            kv: self.kv.with_metrics(Arc::clone(&recorder)),
            kp: self.kp.with_metrics(recorder),
        }
    }

    pub fn insert_kv(
        &self,
        key: &[u8],
        value: V,
        charge: usize,
        deleter: Option<Deleter<V>>,
    ) -> Handle {
        self.kv.insert(key, value, charge, deleter)
    }

    pub fn insert_kp(
        &self,
        key: &[u8],
        value: P,
        charge: usize,
        deleter: Option<Deleter<P>>,
    ) -> Handle {
        self.kp.insert(key, value, charge, deleter)
    }

    pub fn lookup_kv(&self, key: &[u8]) -> AdaptiveLookup {
        self.kv.lookup_adaptive(key)
    }

    pub fn lookup_kp(&self, key: &[u8]) -> AdaptiveLookup {
        self.kp.lookup_adaptive(key)
    }

    pub fn value_kv(&self, handle: &Handle) -> V {
        self.kv.value(handle)
    }

    pub fn value_kp(&self, handle: &Handle) -> P {
        self.kp.value(handle)
    }

    pub fn release_kv(&self, handle: Handle) {
        self.kv.release(handle)
    }

    pub fn release_kp(&self, handle: Handle) {
        self.kp.release(handle)
    }

    /// Summed charge across both planes (real and ghost layers included).
    pub fn total_charge(&self) -> usize {
        self.kv.total_charge() + self.kp.total_charge()
    }

    pub fn total_kv_charge(&self) -> usize {
        self.kv.total_charge()
    }

    pub fn total_kp_charge(&self) -> usize {
        self.kp.total_charge()
    }

    /// Cross-plane rebalance: splits `delta` in proportion to the planes'
    /// current charges. An empty plane receives nothing (its counterpart
    /// takes the whole delta); when both are empty the delta is split
    /// evenly. Each plane's share still goes through that plane's own
    /// threshold-gated adaptive adjustment.
    pub fn adjust_capacity(&self, delta: isize) {
        let kv_charge = self.kv.total_charge();
        let kp_charge = self.kp.total_charge();
        let (kv_share, kp_share) = match (kv_charge, kp_charge) {
            (0, 0) => (delta / 2, delta - delta / 2),
            (_, 0) => (delta, 0),
            (0, _) => (0, delta),
            _ => {
                let ratio = kv_charge as f64 / kp_charge as f64;
                (
                    (delta as f64 * ratio / (1.0 + ratio)) as isize,
                    (delta as f64 / (1.0 + ratio)) as isize,
                )
            }
        };
        if kv_share != 0 {
            self.kv.adjust_capacity(kv_share);
        }
        if kp_share != 0 {
            self.kp.adjust_capacity(kp_share);
        }
    }

    /// Adjusts the KV plane directly, bypassing the cross-plane split.
    pub fn adjust_kv_capacity(&self, delta: isize) {
        self.kv.adjust_capacity(delta)
    }

    /// Adjusts the KP plane directly, bypassing the cross-plane split.
    pub fn adjust_kp_capacity(&self, delta: isize) {
        self.kp.adjust_capacity(delta)
    }

    pub fn kv_cache(&self) -> &AdaptiveCache<V> {
        &self.kv
    }

    pub fn kp_cache(&self) -> &AdaptiveCache<P> {
        &self.kp
    }

    pub fn kv_capacity(&self) -> usize {
        self.kv.capacity()
    }

    pub fn kp_capacity(&self) -> usize {
        self.kp.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lru::ShardedLruCache;

    fn single_shard_plane<T: Clone + Send>(
        real_capacity: usize,
        ghost_capacity: usize,
    ) -> AdaptiveCache<T> {
        AdaptiveCache::from_parts(
            ShardedLruCache::with_shard_bits(real_capacity, 0),
            ShardedLruCache::with_shard_bits(ghost_capacity, 0),
        )
    }

    fn small_point_cache() -> PointCache<u64, (u64, u64)> {
        PointCache::from_parts(single_shard_plane(1 << 16, 64), single_shard_plane(1 << 16, 64))
    }

    #[test]
    fn planes_are_independent() {
        let cache = small_point_cache();
        let kv = cache.insert_kv(b"k", 10, 4, None);
        let kp = cache.insert_kp(b"k", (7, 512), 1, None);

        assert_eq!(cache.value_kv(&kv), 10);
        assert_eq!(cache.value_kp(&kp), (7, 512));
        assert_eq!(cache.total_kv_charge(), 4);
        assert_eq!(cache.total_kp_charge(), 1);
        assert_eq!(cache.total_charge(), 5);

        cache.release_kv(kv);
        cache.release_kp(kp);
    }

    #[test]
    fn lookup_routes_to_the_right_plane() {
        let cache = small_point_cache();
        let kv = cache.insert_kv(b"only-kv", 1, 1, None);
        cache.release_kv(kv);

        match cache.lookup_kv(b"only-kv") {
            AdaptiveLookup::Hit(handle) => cache.release_kv(handle),
            other => panic!("expected hit, got {:?}", other),
        }
        assert!(matches!(cache.lookup_kp(b"only-kv"), AdaptiveLookup::Miss));
    }

    #[test]
    fn rebalance_splits_by_plane_charge() {
        let cache = small_point_cache();
        // kv charge 300, kp charge 100 → ratio 3.
        let kv = cache.insert_kv(b"v", 0, 300, None);
        cache.release_kv(kv);
        let kp = cache.insert_kp(b"p", (0, 0), 100, None);
        cache.release_kp(kp);

        let kv_before = cache.kv_capacity();
        let kp_before = cache.kp_capacity();
        cache.adjust_capacity(24000);

        // kv share 18000, kp share 6000; both clear the adaptive flush
        // threshold and land entirely on their real layers (ghosts empty).
        assert_eq!(cache.kv_capacity(), kv_before + 18000);
        assert_eq!(cache.kp_capacity(), kp_before + 6000);
    }

    #[test]
    fn rebalance_with_one_empty_plane_funds_the_other() {
        let cache = small_point_cache();
        let kv = cache.insert_kv(b"v", 0, 10, None);
        cache.release_kv(kv);

        let kv_before = cache.kv_capacity();
        let kp_before = cache.kp_capacity();
        cache.adjust_capacity(5000);

        assert_eq!(cache.kv_capacity(), kv_before + 5000);
        assert_eq!(cache.kp_capacity(), kp_before);
    }

    #[test]
    fn direct_plane_adjustments_bypass_the_split() {
        let cache = small_point_cache();
        let kp_before = cache.kp_capacity();
        cache.adjust_kp_capacity(5000);
        assert_eq!(cache.kp_capacity(), kp_before + 5000);
        assert_eq!(cache.kv_capacity(), 1 << 16);
    }
}
