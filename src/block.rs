//! Block cache: one adaptive cache fronting the storage engine's data blocks.
//!
//! A thin shell over [`AdaptiveCache`] — every operation delegates one-to-one
//! and no extra state is kept. It exists so the engine can hold block and
//! point caches as distinct types with identical surface.

use std::sync::Arc;

use crate::adaptive::AdaptiveCache;
use crate::lru::Handle;
use crate::metrics::CacheMetricsRecorder;
use crate::traits::{AdaptiveLookup, Cache, Deleter};

/// Adaptive cache for table blocks.
///
/// # Example
///
/// ```
/// use adacache::block::BlockCache;
/// use adacache::traits::{AdaptiveLookup, Cache};
///
/// let cache: BlockCache<u64> = BlockCache::new(1 << 20);
/// let handle = cache.insert(b"sst:9:block:3", 5, 4096, None);
/// cache.release(handle);
///
/// if let AdaptiveLookup::Hit(handle) = cache.lookup_adaptive(b"sst:9:block:3") {
///     assert_eq!(cache.value(&handle), 5);
///     cache.release(handle);
/// }
/// ```
pub struct BlockCache<T> {
    inner: AdaptiveCache<T>,
}

impl<T> std::fmt::Debug for BlockCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache").finish_non_exhaustive()
    }
}

impl<T: Clone + Send> BlockCache<T> {
    /// Creates a block cache over `capacity` charge units, split evenly
    /// between the real and ghost layers.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: AdaptiveCache::new(capacity),
        }
    }

    /// Wraps a pre-built adaptive cache.
    pub fn from_adaptive(inner: AdaptiveCache<T>) -> Self {
        Self { inner }
    }

    /// Attaches a metrics recorder to the underlying adaptive cache.
    pub fn with_metrics(self, recorder: Arc<dyn CacheMetricsRecorder>) -> Self {
        Self {
            inner: self.inner.with_metrics(recorder),
        }
    }

    /// Two-layer lookup; see [`AdaptiveCache::lookup_adaptive`].
    pub fn lookup_adaptive(&self, key: &[u8]) -> AdaptiveLookup {
        self.inner.lookup_adaptive(key)
    }

    /// Runs `f` on the value behind a live handle without cloning.
    pub fn value_with<R>(&self, handle: &Handle, f: impl FnOnce(&T) -> R) -> R {
        self.inner.value_with(handle, f)
    }

    /// Summed charge of the real layer only.
    pub fn total_real_charge(&self) -> usize {
        self.inner.total_real_charge()
    }

    /// Summed charge of the ghost layer only.
    pub fn total_ghost_charge(&self) -> usize {
        self.inner.total_ghost_charge()
    }

    /// Reports the current usage split to the metrics recorder.
    pub fn sample_usage(&self) {
        self.inner.sample_usage()
    }
}

impl<T: Clone + Send> Cache<T> for BlockCache<T> {
    fn insert(&self, key: &[u8], value: T, charge: usize, deleter: Option<Deleter<T>>) -> Handle {
        self.inner.insert(key, value, charge, deleter)
    }

    /// Unsupported, as on the adaptive layer beneath.
    fn lookup(&self, key: &[u8]) -> Option<Handle> {
        self.inner.lookup(key)
    }

    fn release(&self, handle: Handle) {
        self.inner.release(handle)
    }

    fn value(&self, handle: &Handle) -> T {
        self.inner.value(handle)
    }

    /// Unsupported, as on the adaptive layer beneath.
    fn erase(&self, key: &[u8]) {
        self.inner.erase(key)
    }

    fn new_id(&self) -> u64 {
        self.inner.new_id()
    }

    /// Unsupported, as on the adaptive layer beneath.
    fn prune(&self) {
        self.inner.prune()
    }

    fn total_charge(&self) -> usize {
        self.inner.total_charge()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn adjust_capacity(&self, delta: isize) {
        self.inner.adjust_capacity(delta)
    }
}
