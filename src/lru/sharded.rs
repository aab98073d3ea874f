//! Sharded LRU cache: a fixed fan-out of independently locked shards.
//!
//! ## Architecture
//!
//! ```text
//!                      hash = fx32(key, seed 0)
//!                              │
//!              shard index = hash >> (32 - shard_bits)
//!              (top bits: independent from in-shard bucket indexing,
//!               which uses the low bits)
//!                              │
//!        ┌─────────┬─────────┬─┴───────┬─────────┐
//!        │ shard 0 │ shard 1 │   ...   │ shard N │   N = 2^shard_bits
//!        │ mutex   │ mutex   │         │ mutex   │
//!        └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! Each shard receives `ceil(capacity / shards)` of the budget. Keyspace
//! fan-out cuts lock contention linearly; no operation takes more than one
//! shard lock. A separate mutex guards only the monotonic id generator.

use std::hash::Hasher;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHasher;

use crate::lru::shard::LruShard;
use crate::lru::Handle;
use crate::traits::{Cache, Deleter, GhostCache};

/// Default shard fan-out: 2^4 = 16 shards.
pub const DEFAULT_SHARD_BITS: u32 = 4;

/// Widest supported fan-out (2^8 = 256 shards).
pub const MAX_SHARD_BITS: u32 = 8;

/// Total capacity below which negative adjustments are ignored, so repeated
/// shrink signals cannot starve the cache entirely.
pub(crate) const MIN_ADJUSTABLE_CAPACITY: usize = 8 << 18;

const KEY_HASH_SEED: u32 = 0;

/// Seeded 32-bit hash over key bytes. The low bits index hash-table buckets
/// inside a shard; the top bits pick the shard.
pub(crate) fn hash_key(key: &[u8]) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(KEY_HASH_SEED);
    hasher.write(key);
    hasher.finish() as u32
}

/// Concurrent LRU cache sharded by the high bits of the key hash.
///
/// Implements the full [`Cache`] contract; see the trait for the handle and
/// deleter discipline. `shard_bits = 0` yields a single shard, which makes
/// capacity enforcement exact and is what small deterministic setups (tests,
/// ghost caches with tiny budgets) want.
///
/// # Example
///
/// ```
/// use adacache::lru::ShardedLruCache;
/// use adacache::traits::Cache;
///
/// let cache: ShardedLruCache<u64> = ShardedLruCache::new(64 << 20);
/// let id = cache.new_id();
/// let key = [&id.to_le_bytes()[..], b"block:0"].concat();
///
/// let handle = cache.insert(&key, 7, 4096, None);
/// cache.release(handle);
/// assert_eq!(cache.total_charge(), 4096);
/// ```
pub struct ShardedLruCache<T> {
    shards: Vec<LruShard<T>>,
    shard_bits: u32,
    capacity: AtomicUsize,
    last_id: Mutex<u64>,
}

impl<T> std::fmt::Debug for ShardedLruCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedLruCache").finish_non_exhaustive()
    }
}

impl<T> ShardedLruCache<T> {
    /// Creates a cache with the default shard fan-out.
    pub fn new(capacity: usize) -> Self {
        Self::with_shard_bits(capacity, DEFAULT_SHARD_BITS)
    }

    /// Creates a cache with `2^shard_bits` shards.
    ///
    /// # Panics
    ///
    /// Panics if `shard_bits > MAX_SHARD_BITS`. Use
    /// [`CacheBuilder`](crate::builder::CacheBuilder) for fallible
    /// configuration.
    pub fn with_shard_bits(capacity: usize, shard_bits: u32) -> Self {
        assert!(
            shard_bits <= MAX_SHARD_BITS,
            "shard_bits {} exceeds maximum {}",
            shard_bits,
            MAX_SHARD_BITS
        );
        let shard_count = 1usize << shard_bits;
        let per_shard = capacity.div_ceil(shard_count);
        let shards = (0..shard_count).map(|_| LruShard::new(per_shard)).collect();
        Self {
            shards,
            shard_bits,
            capacity: AtomicUsize::new(capacity),
            last_id: Mutex::new(0),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Runs `f` on a shared reference to the value behind a live handle,
    /// without cloning it.
    pub fn value_with<R>(&self, handle: &Handle, f: impl FnOnce(&T) -> R) -> R {
        self.shard_for(handle.hash).value_with(handle, f)
    }

    #[inline]
    fn shard_for(&self, hash: u32) -> &LruShard<T> {
        let index = if self.shard_bits == 0 {
            0
        } else {
            (hash >> (32 - self.shard_bits)) as usize
        };
        &self.shards[index]
    }

    /// Validates every shard's structural invariants: charge conservation,
    /// list membership against reference counts, and hash-table consistency.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        for shard in &self.shards {
            shard.check_invariants()?;
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("shard invariant violated: {}", err);
        }
    }
}

impl<T: Clone + Send> Cache<T> for ShardedLruCache<T> {
    fn insert(&self, key: &[u8], value: T, charge: usize, deleter: Option<Deleter<T>>) -> Handle {
        let hash = hash_key(key);
        self.shard_for(hash).insert(key, hash, value, charge, deleter)
    }

    fn insert_with_ghost(
        &self,
        key: &[u8],
        value: T,
        charge: usize,
        ghost: &GhostCache,
        deleter: Option<Deleter<T>>,
    ) -> Handle {
        let hash = hash_key(key);
        self.shard_for(hash)
            .insert_with_ghost(key, hash, value, charge, ghost, deleter)
    }

    fn lookup(&self, key: &[u8]) -> Option<Handle> {
        let hash = hash_key(key);
        self.shard_for(hash).lookup(key, hash)
    }

    fn release(&self, handle: Handle) {
        self.shard_for(handle.hash).release(handle)
    }

    fn value(&self, handle: &Handle) -> T {
        self.shard_for(handle.hash).value(handle)
    }

    fn erase(&self, key: &[u8]) {
        let hash = hash_key(key);
        self.shard_for(hash).erase(key, hash)
    }

    fn new_id(&self) -> u64 {
        let mut last_id = self.last_id.lock();
        *last_id += 1;
        *last_id
    }

    fn prune(&self) {
        for shard in &self.shards {
            shard.prune();
        }
    }

    fn total_charge(&self) -> usize {
        self.shards.iter().map(|shard| shard.total_charge()).sum()
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    fn adjust_capacity(&self, delta: isize) {
        let total = self.capacity.load(Ordering::Relaxed);
        if delta < 0 && total < MIN_ADJUSTABLE_CAPACITY {
            return;
        }
        // Integer truncation per shard is accepted; the residue is dropped.
        let per_shard = delta / self.shards.len() as isize;
        for shard in &self.shards {
            shard.adjust_capacity(per_shard);
        }
        self.capacity
            .store(total.saturating_add_signed(delta), Ordering::Relaxed);
    }
}
