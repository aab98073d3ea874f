//! Chained hash table indexing entries stored in a [`SlotArena`].
//!
//! The table owns nothing: it maps `(hash, key bytes)` to the `SlotId` of an
//! entry living in the caller's arena, chaining collisions through a single
//! `next_hash` link embedded in each entry. Keeping the chain link inside the
//! entry gives one allocation per entry and deterministic O(1) amortized
//! resizes while the owning shard lock is held.
//!
//! ## Architecture
//!
//! ```text
//!   buckets: Vec<Option<SlotId>>         arena: SlotArena<N>
//!   (len is a power of two)
//!
//!   bucket = hash & (len - 1)
//!   ┌─────┐
//!   │  0  │──► id_4 ──► id_1 ──► ∅       each entry carries
//!   ├─────┤            (next_hash)       hash / key / next_hash
//!   │  1  │──► ∅
//!   ├─────┤
//!   │  2  │──► id_7 ──► ∅
//!   └─────┘
//! ```
//!
//! ## Operations
//!
//! | Operation | Description                                    | Complexity |
//! |-----------|------------------------------------------------|------------|
//! | `lookup`  | walk one bucket, match by `(hash, key)`        | O(1) avg   |
//! | `insert`  | replace same-key node in place or prepend      | O(1) avg   |
//! | `remove`  | unlink and return the node's `SlotId`          | O(1) avg   |
//!
//! The bucket count doubles (and every chain is relinked) once the element
//! count exceeds it, keeping average chain length at or below one.

use crate::ds::slot_arena::{SlotArena, SlotId};

/// Access the table needs into an arena-resident entry.
///
/// Implemented by the shard's entry type; the table never reads anything
/// else, so it stays independent of value types and reference counting.
pub trait ChainNode {
    fn hash(&self) -> u32;
    fn key(&self) -> &[u8];
    fn next_hash(&self) -> Option<SlotId>;
    fn set_next_hash(&mut self, next: Option<SlotId>);
}

const INITIAL_BUCKETS: usize = 4;

#[derive(Debug)]
/// Hash index over entries in a `SlotArena`, chained via `ChainNode::next_hash`.
pub struct HandleTable {
    buckets: Vec<Option<SlotId>>,
    elems: usize,
}

impl HandleTable {
    /// Creates a table with the minimum bucket count.
    pub fn new() -> Self {
        Self {
            buckets: vec![None; INITIAL_BUCKETS],
            elems: 0,
        }
    }

    /// Returns the number of indexed entries.
    pub fn len(&self) -> usize {
        self.elems
    }

    /// Returns `true` if no entries are indexed.
    pub fn is_empty(&self) -> bool {
        self.elems == 0
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Returns the `SlotId` of the entry matching `(hash, key)`, if indexed.
    pub fn lookup<N: ChainNode>(
        &self,
        arena: &SlotArena<N>,
        key: &[u8],
        hash: u32,
    ) -> Option<SlotId> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(id) = cur {
            let node = arena.get(id).expect("chained entry missing from arena");
            if node.hash() == hash && node.key() == key {
                return Some(id);
            }
            cur = node.next_hash();
        }
        None
    }

    /// Indexes `id`, replacing (and returning) any prior entry with the same
    /// `(hash, key)`. The displaced entry keeps its chain position; a new key
    /// is prepended to its bucket. Grows the table when the element count
    /// exceeds the bucket count.
    pub fn insert<N: ChainNode>(&mut self, arena: &mut SlotArena<N>, id: SlotId) -> Option<SlotId> {
        let hash = arena.get(id).expect("inserted entry missing from arena").hash();
        let bucket = self.bucket_of(hash);

        let mut prev: Option<SlotId> = None;
        let mut cur = self.buckets[bucket];
        while let Some(cid) = cur {
            if Self::same_key(arena, cid, id) {
                break;
            }
            prev = Some(cid);
            cur = arena
                .get(cid)
                .expect("chained entry missing from arena")
                .next_hash();
        }

        match cur {
            Some(old) => {
                let old_next = arena
                    .get(old)
                    .expect("displaced entry missing from arena")
                    .next_hash();
                arena
                    .get_mut(id)
                    .expect("inserted entry missing from arena")
                    .set_next_hash(old_next);
                match prev {
                    Some(p) => arena
                        .get_mut(p)
                        .expect("chain predecessor missing from arena")
                        .set_next_hash(Some(id)),
                    None => self.buckets[bucket] = Some(id),
                }
                arena
                    .get_mut(old)
                    .expect("displaced entry missing from arena")
                    .set_next_hash(None);
                Some(old)
            }
            None => {
                let head = self.buckets[bucket];
                arena
                    .get_mut(id)
                    .expect("inserted entry missing from arena")
                    .set_next_hash(head);
                self.buckets[bucket] = Some(id);
                self.elems += 1;
                if self.elems > self.buckets.len() {
                    // Entries are large; keep average chain length <= 1.
                    self.grow(arena);
                }
                None
            }
        }
    }

    /// Unlinks and returns the entry matching `(hash, key)`, or `None`.
    pub fn remove<N: ChainNode>(
        &mut self,
        arena: &mut SlotArena<N>,
        key: &[u8],
        hash: u32,
    ) -> Option<SlotId> {
        let bucket = self.bucket_of(hash);
        let mut prev: Option<SlotId> = None;
        let mut cur = self.buckets[bucket];
        while let Some(cid) = cur {
            let node = arena.get(cid).expect("chained entry missing from arena");
            if node.hash() == hash && node.key() == key {
                break;
            }
            prev = Some(cid);
            cur = node.next_hash();
        }

        let found = cur?;
        let next = arena
            .get(found)
            .expect("removed entry missing from arena")
            .next_hash();
        match prev {
            Some(p) => arena
                .get_mut(p)
                .expect("chain predecessor missing from arena")
                .set_next_hash(next),
            None => self.buckets[bucket] = next,
        }
        arena
            .get_mut(found)
            .expect("removed entry missing from arena")
            .set_next_hash(None);
        self.elems -= 1;
        Some(found)
    }

    /// Walks every chain, applying `f` to each indexed `SlotId`.
    pub fn for_each<N: ChainNode>(&self, arena: &SlotArena<N>, mut f: impl FnMut(SlotId)) {
        for &head in &self.buckets {
            let mut cur = head;
            while let Some(id) = cur {
                f(id);
                cur = arena
                    .get(id)
                    .expect("chained entry missing from arena")
                    .next_hash();
            }
        }
    }

    fn same_key<N: ChainNode>(arena: &SlotArena<N>, a: SlotId, b: SlotId) -> bool {
        let na = arena.get(a).expect("chained entry missing from arena");
        let nb = arena.get(b).expect("chained entry missing from arena");
        na.hash() == nb.hash() && na.key() == nb.key()
    }

    fn grow<N: ChainNode>(&mut self, arena: &mut SlotArena<N>) {
        let new_len = (self.buckets.len() * 2).max(INITIAL_BUCKETS);
        let old_buckets = std::mem::replace(&mut self.buckets, vec![None; new_len]);

        let mut relinked = 0usize;
        for head in old_buckets {
            let mut cur = head;
            while let Some(id) = cur {
                let node = arena.get(id).expect("chained entry missing from arena");
                let next = node.next_hash();
                let bucket = (node.hash() as usize) & (new_len - 1);
                let new_head = self.buckets[bucket];
                arena
                    .get_mut(id)
                    .expect("chained entry missing from arena")
                    .set_next_hash(new_head);
                self.buckets[bucket] = Some(id);
                cur = next;
                relinked += 1;
            }
        }
        debug_assert_eq!(relinked, self.elems);
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
