//! Cache entry and the opaque client handle.
//!
//! An entry owns its key bytes, the client value, and all bookkeeping links:
//! one `next_hash` for the shard's hash-table chain and a `prev`/`next` pair
//! for membership in exactly one of the shard's two recency lists. Entries
//! are arena-resident and addressed by `SlotId` everywhere the original
//! pointer graph would use raw pointers.
//!
//! Reference counting rules, all maintained under the owning shard's mutex:
//!
//! - `refs >= 1` while the entry exists.
//! - The cache's own reference contributes exactly one count iff `in_cache`.
//! - `in_cache && refs == 1`: only the cache holds it → LRU list.
//! - `in_cache && refs >= 2`: at least one client handle → in-use list.
//! - `!in_cache`: detached (erased or displaced); on neither list, destroyed
//!   when the last handle is released.

use crate::ds::handle_table::ChainNode;
use crate::ds::slot_arena::SlotId;
use crate::traits::Deleter;

/// Which of the shard's two lists an entry is linked into. Only meaningful
/// while `in_cache` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    /// Held only by the cache; eviction candidates, oldest at the tail.
    Lru,
    /// Referenced by at least one client handle; never scanned for eviction.
    InUse,
}

pub(crate) struct Entry<T> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: T,
    pub(crate) deleter: Option<Deleter<T>>,
    pub(crate) charge: usize,
    pub(crate) hash: u32,
    pub(crate) refs: u32,
    pub(crate) in_cache: bool,
    pub(crate) list: ListKind,
    pub(crate) next_hash: Option<SlotId>,
    pub(crate) prev: Option<SlotId>,
    pub(crate) next: Option<SlotId>,
}

impl<T> Entry<T> {
    pub(crate) fn new(
        key: &[u8],
        hash: u32,
        value: T,
        charge: usize,
        deleter: Option<Deleter<T>>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            deleter,
            charge,
            hash,
            refs: 1,
            in_cache: false,
            list: ListKind::InUse,
            next_hash: None,
            prev: None,
            next: None,
        }
    }

    /// Runs the deleter (if any) with the key bytes and the owned value.
    /// Consuming `self` is what makes exactly-once structural: an entry can
    /// only be destroyed by removing it from the arena.
    pub(crate) fn destroy(self) {
        if let Some(deleter) = self.deleter {
            deleter(&self.key, self.value);
        }
    }
}

impl<T> ChainNode for Entry<T> {
    fn hash(&self) -> u32 {
        self.hash
    }

    fn key(&self) -> &[u8] {
        &self.key
    }

    fn next_hash(&self) -> Option<SlotId> {
        self.next_hash
    }

    fn set_next_hash(&mut self, next: Option<SlotId>) {
        self.next_hash = next;
    }
}

/// Opaque token pinning one cache entry.
///
/// Obtained from `insert` or a successful `lookup`; must be handed back to
/// `release` on the same cache exactly once. The entry it pins stays alive
/// (and `value` keeps working) even if the entry is evicted or overwritten
/// in the meantime.
#[derive(Debug)]
#[must_use = "handles pin a cache entry and must be released"]
pub struct Handle {
    pub(crate) slot: SlotId,
    pub(crate) hash: u32,
}
