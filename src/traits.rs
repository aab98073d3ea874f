//! # Cache Contract
//!
//! The shared contract implemented by every capacity-bounded cache in this
//! crate, plus the supporting types that cross its boundary (deleters, ghost
//! caches, adaptive lookup outcomes).
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────────────────┐
//!                    │              Cache<T>                   │
//!                    │                                         │
//!                    │  insert(key, value, charge, deleter)    │
//!                    │  insert_with_ghost(.., &GhostCache, ..) │
//!                    │  lookup(key) → Option<Handle>           │
//!                    │  release(Handle) / value(&Handle)       │
//!                    │  erase(key) / prune()                   │
//!                    │  new_id() / total_charge()              │
//!                    │  capacity() / adjust_capacity(delta)    │
//!                    └───────────────────┬─────────────────────┘
//!                                        │
//!              ┌─────────────────────────┼─────────────────────────┐
//!              ▼                         ▼                         ▼
//!      ShardedLruCache<T>        AdaptiveCache<T>            BlockCache<T>
//!      (full contract)           (keyed lookups via          (delegates to one
//!                                 lookup_adaptive only)       AdaptiveCache)
//! ```
//!
//! ## Design Notes
//!
//! - Keys are plain byte slices. They are copied into the entry on insert, so
//!   the caller's buffer can be reused or freed immediately afterward.
//! - A [`Handle`] pins one entry. Every handle returned by `insert` or a
//!   successful `lookup` must be passed to `release` exactly once; `release`
//!   consumes the handle, so double release is a type error rather than a
//!   runtime hazard.
//! - `charge` is the caller-declared cost of the entry against the cache's
//!   capacity budget, in whatever unit the caller picked (usually bytes).
//! - The optional [`Deleter`] runs exactly once, after the cache has stopped
//!   tracking the entry and the last handle has been released. It receives
//!   the key bytes and the owned value.
//! - `adjust_capacity` takes a signed delta; shrinking is lazy and is only
//!   enforced by the eviction pass of a later insert.

use crate::lru::{Handle, ShardedLruCache};

/// Per-entry destructor: receives the key bytes and the owned value once the
/// entry is no longer tracked and no handles remain. May run on any thread;
/// it is always invoked after the owning shard lock has been released.
pub type Deleter<T> = Box<dyn FnOnce(&[u8], T) + Send>;

/// Shadow cache recording recently evicted keys. The stored value is the
/// evicted entry's original charge; each ghost entry itself charges 1.
pub type GhostCache = ShardedLruCache<usize>;

/// Outcome of an adaptive lookup (see [`AdaptiveCache::lookup_adaptive`]).
///
/// [`AdaptiveCache::lookup_adaptive`]: crate::adaptive::AdaptiveCache::lookup_adaptive
#[derive(Debug)]
pub enum AdaptiveLookup {
    /// Found in the real cache; the handle must be released.
    Hit(Handle),
    /// Missed the real cache but the key was recently evicted; carries the
    /// evicted entry's original charge as a grow-the-cache signal.
    GhostHit(usize),
    /// Not present in either layer.
    Miss,
}

impl AdaptiveLookup {
    /// Returns the recorded charge for a ghost hit.
    pub fn ghost_charge(&self) -> Option<usize> {
        match self {
            AdaptiveLookup::GhostHit(charge) => Some(*charge),
            _ => None,
        }
    }
}

/// Contract shared by every capacity-bounded cache in this crate.
///
/// All operations are `&self` and internally synchronized; implementations
/// are safe to share across threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use adacache::lru::ShardedLruCache;
/// use adacache::traits::Cache;
///
/// let cache: ShardedLruCache<u64> = ShardedLruCache::new(1 << 20);
/// let handle = cache.insert(b"table:7:block:0", 42, 64, None);
/// assert_eq!(cache.value(&handle), 42);
/// cache.release(handle);
///
/// let found = cache.lookup(b"table:7:block:0").expect("still cached");
/// cache.release(found);
/// ```
pub trait Cache<T: Clone + Send>: Send + Sync {
    /// Inserts `key -> value` with the given charge, returning a handle the
    /// caller must release. A prior entry under the same key is detached from
    /// the cache; outstanding handles to it stay valid until released.
    fn insert(&self, key: &[u8], value: T, charge: usize, deleter: Option<Deleter<T>>) -> Handle;

    /// Like [`insert`](Cache::insert), but keys evicted by the capacity pass
    /// are additionally recorded into `ghost` (value = the evicted entry's
    /// charge). The default implementation ignores the ghost cache.
    fn insert_with_ghost(
        &self,
        key: &[u8],
        value: T,
        charge: usize,
        ghost: &GhostCache,
        deleter: Option<Deleter<T>>,
    ) -> Handle {
        let _ = ghost;
        self.insert(key, value, charge, deleter)
    }

    /// Returns a handle to the entry under `key`, if cached. The entry is
    /// promoted to the in-use list until the handle is released.
    fn lookup(&self, key: &[u8]) -> Option<Handle>;

    /// Gives up one reference to the entry behind `handle`. The entry is
    /// destroyed (and its deleter run) once the cache no longer tracks it and
    /// this was the last handle.
    fn release(&self, handle: Handle);

    /// Returns a clone of the value behind a live handle.
    fn value(&self, handle: &Handle) -> T;

    /// Drops the cache's reference to the entry under `key`, if present.
    /// The entry survives until all outstanding handles are released.
    fn erase(&self, key: &[u8]);

    /// Returns a fresh id, unique for the lifetime of this cache. Clients
    /// sharing one cache use these to partition the key space.
    fn new_id(&self) -> u64;

    /// Evicts every entry not currently referenced by a client.
    fn prune(&self) {}

    /// Returns the summed charge of all tracked entries. Under concurrency
    /// this is a sum of per-shard snapshots, not a global atomic snapshot.
    fn total_charge(&self) -> usize;

    /// Returns the configured capacity.
    fn capacity(&self) -> usize;

    /// Adds a signed delta to the capacity. Shrinking never evicts eagerly;
    /// enforcement happens on the next insert.
    fn adjust_capacity(&self, delta: isize);
}
