//! Unified builder for the cache compositions.
//!
//! Validates configuration once and assembles any of the three cache shapes
//! (plain sharded LRU, block cache, point cache) with a consistent shard
//! fan-out and an optionally injected metrics recorder.
//!
//! ## Example
//!
//! ```rust
//! use adacache::builder::CacheBuilder;
//! use adacache::block::BlockCache;
//! use adacache::traits::Cache;
//!
//! let cache: BlockCache<u64> = CacheBuilder::new(64 << 20)
//!     .shard_bits(4)
//!     .try_build_block()
//!     .unwrap();
//! let handle = cache.insert(b"block:0", 1, 4096, None);
//! cache.release(handle);
//! ```

use std::sync::Arc;

use crate::adaptive::AdaptiveCache;
use crate::block::BlockCache;
use crate::error::ConfigError;
use crate::lru::{ShardedLruCache, DEFAULT_SHARD_BITS, MAX_SHARD_BITS};
use crate::metrics::CacheMetricsRecorder;
use crate::point::PointCache;

/// Builder over capacity, shard fan-out, and metrics injection.
///
/// `capacity` is in charge units (usually bytes) and covers the whole
/// composition: adaptive layers split it between real and ghost, the point
/// cache additionally between its two planes. `shard_bits = 0` builds
/// single-shard caches with exact capacity enforcement.
#[derive(Clone)]
pub struct CacheBuilder {
    capacity: usize,
    shard_bits: u32,
    metrics: Option<Arc<dyn CacheMetricsRecorder>>,
}

impl CacheBuilder {
    /// Starts a builder for `capacity` charge units with the default
    /// shard fan-out.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shard_bits: DEFAULT_SHARD_BITS,
            metrics: None,
        }
    }

    /// Sets the shard fan-out to `2^bits` shards.
    pub fn shard_bits(mut self, bits: u32) -> Self {
        self.shard_bits = bits;
        self
    }

    /// Injects a metrics recorder into adaptive builds. The point cache
    /// shares one recorder across both planes.
    pub fn metrics(mut self, recorder: Arc<dyn CacheMetricsRecorder>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_bits > MAX_SHARD_BITS {
            return Err(ConfigError::new(format!(
                "shard_bits must be at most {}, got {}",
                MAX_SHARD_BITS, self.shard_bits
            )));
        }
        Ok(())
    }

    fn build_sharded<T>(&self, capacity: usize) -> ShardedLruCache<T> {
        ShardedLruCache::with_shard_bits(capacity, self.shard_bits)
    }

    fn build_adaptive<T: Clone + Send>(&self, capacity: usize) -> AdaptiveCache<T> {
        let mut adaptive = AdaptiveCache::from_parts(
            self.build_sharded(capacity / 2),
            self.build_sharded(capacity / 2),
        );
        if let Some(recorder) = &self.metrics {
            adaptive = adaptive.with_metrics(Arc::clone(recorder));
        }
        adaptive
    }

    /// Builds a plain sharded LRU cache. The metrics recorder, if any, is
    /// not wired here: only the adaptive layers report activity.
    pub fn try_build_lru<T: Clone + Send>(&self) -> Result<ShardedLruCache<T>, ConfigError> {
        self.validate()?;
        Ok(self.build_sharded(self.capacity))
    }

    /// Builds a block cache (one adaptive cache over the whole capacity).
    pub fn try_build_block<T: Clone + Send>(&self) -> Result<BlockCache<T>, ConfigError> {
        self.validate()?;
        Ok(BlockCache::from_adaptive(self.build_adaptive(self.capacity)))
    }

    /// Builds a point cache (two adaptive planes, half the capacity each).
    pub fn try_build_point<V: Clone + Send, P: Clone + Send>(
        &self,
    ) -> Result<PointCache<V, P>, ConfigError> {
        self.validate()?;
        Ok(PointCache::from_parts(
            self.build_adaptive(self.capacity / 2),
            self.build_adaptive(self.capacity / 2),
        ))
    }
}
