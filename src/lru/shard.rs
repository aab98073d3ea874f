//! A single cache shard: one mutex over an entry arena, a hash index, and
//! two recency lists.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  LruShard<T>  =  Mutex<ShardState<T>>                                │
//! │                                                                      │
//! │   entries: SlotArena<Entry<T>>      table: HandleTable               │
//! │   usage: Σ charge of indexed entries  ≤ capacity (after eviction)    │
//! │                                                                      │
//! │   lru list     head (newest) ◄──► ... ◄──► tail (oldest = victim)    │
//! │                entries with refs == 1 && in_cache                    │
//! │                                                                      │
//! │   in-use list  entries with refs >= 2 && in_cache; never evicted     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries move between the lists as they gain or lose their only external
//! reference; eviction pops the LRU tail while `usage > capacity`. Erased or
//! displaced entries leave both lists and the index immediately but are only
//! destroyed when their last handle is released.
//!
//! Deleters never run under the shard mutex: destruction is staged into a
//! `Vec` while the lock is held and performed after it is dropped, so client
//! callbacks may re-enter the cache. Ghost recording of evicted keys is
//! staged the same way, which keeps every operation single-lock.

use parking_lot::Mutex;

use crate::ds::handle_table::HandleTable;
use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::lru::entry::{Entry, ListKind};
use crate::lru::Handle;
use crate::traits::{Cache, Deleter, GhostCache};

#[derive(Debug, Default, Clone, Copy)]
struct ListHead {
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

struct ShardState<T> {
    capacity: usize,
    usage: usize,
    entries: SlotArena<Entry<T>>,
    table: HandleTable,
    lru: ListHead,
    in_use: ListHead,
}

pub(crate) struct LruShard<T> {
    state: Mutex<ShardState<T>>,
}

impl<T> LruShard<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(ShardState {
                capacity,
                usage: 0,
                entries: SlotArena::new(),
                table: HandleTable::new(),
                lru: ListHead::default(),
                in_use: ListHead::default(),
            }),
        }
    }

    pub(crate) fn insert(
        &self,
        key: &[u8],
        hash: u32,
        value: T,
        charge: usize,
        deleter: Option<Deleter<T>>,
    ) -> Handle {
        let (handle, dead, _) = self.insert_inner(key, hash, value, charge, deleter, false);
        for entry in dead {
            entry.destroy();
        }
        handle
    }

    /// Insert that additionally records every key evicted by the capacity
    /// pass into `ghost`, valued at the evicted entry's original charge.
    pub(crate) fn insert_with_ghost(
        &self,
        key: &[u8],
        hash: u32,
        value: T,
        charge: usize,
        ghost: &GhostCache,
        deleter: Option<Deleter<T>>,
    ) -> Handle {
        let (handle, dead, evicted) = self.insert_inner(key, hash, value, charge, deleter, true);
        for (evicted_key, evicted_charge) in evicted {
            let ghost_handle = ghost.insert(&evicted_key, evicted_charge, 1, None);
            ghost.release(ghost_handle);
        }
        for entry in dead {
            entry.destroy();
        }
        handle
    }

    #[allow(clippy::type_complexity)]
    fn insert_inner(
        &self,
        key: &[u8],
        hash: u32,
        value: T,
        charge: usize,
        deleter: Option<Deleter<T>>,
        record_evictions: bool,
    ) -> (Handle, Vec<Entry<T>>, Vec<(Vec<u8>, usize)>) {
        let mut dead = Vec::new();
        let mut evicted = Vec::new();

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let id = state.entries.insert(Entry::new(key, hash, value, charge, deleter));

        if state.capacity > 0 {
            {
                let entry = state.entries.get_mut(id).expect("inserted entry missing");
                entry.refs += 1; // the cache's reference
                entry.in_cache = true;
            }
            state.attach(ListKind::InUse, id);
            state.usage += charge;
            let displaced = state.table.insert(&mut state.entries, id);
            state.finish_erase(displaced, &mut dead);
        }
        // capacity == 0 turns caching off: only the caller's handle exists.

        while state.usage > state.capacity {
            let Some(victim) = state.lru.tail else { break };
            let (victim_key, victim_charge, victim_hash) = {
                let entry = state.entries.get(victim).expect("lru tail missing");
                debug_assert_eq!(entry.refs, 1);
                (entry.key.to_vec(), entry.charge, entry.hash)
            };
            if record_evictions {
                evicted.push((victim_key.clone(), victim_charge));
            }
            let removed = state.table.remove(&mut state.entries, &victim_key, victim_hash);
            debug_assert_eq!(removed, Some(victim));
            state.finish_erase(removed, &mut dead);
        }

        drop(guard);
        (Handle { slot: id, hash }, dead, evicted)
    }

    pub(crate) fn lookup(&self, key: &[u8], hash: u32) -> Option<Handle> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let id = state.table.lookup(&state.entries, key, hash)?;
        state.ref_entry(id);
        Some(Handle { slot: id, hash })
    }

    pub(crate) fn release(&self, handle: Handle) {
        let mut dead = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            debug_assert!(
                state
                    .entries
                    .get(handle.slot)
                    .is_some_and(|entry| entry.hash == handle.hash),
                "release of a foreign or stale handle"
            );
            state.unref(handle.slot, &mut dead);
        }
        for entry in dead {
            entry.destroy();
        }
    }

    pub(crate) fn erase(&self, key: &[u8], hash: u32) {
        let mut dead = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let removed = state.table.remove(&mut state.entries, key, hash);
            state.finish_erase(removed, &mut dead);
        }
        for entry in dead {
            entry.destroy();
        }
    }

    pub(crate) fn prune(&self) {
        let mut dead = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            while let Some(victim) = state.lru.tail {
                let (victim_key, victim_hash) = {
                    let entry = state.entries.get(victim).expect("lru tail missing");
                    debug_assert_eq!(entry.refs, 1);
                    (entry.key.to_vec(), entry.hash)
                };
                let removed = state.table.remove(&mut state.entries, &victim_key, victim_hash);
                debug_assert_eq!(removed, Some(victim));
                state.finish_erase(removed, &mut dead);
            }
        }
        for entry in dead {
            entry.destroy();
        }
    }

    pub(crate) fn total_charge(&self) -> usize {
        self.state.lock().usage
    }

    pub(crate) fn adjust_capacity(&self, delta: isize) {
        let mut state = self.state.lock();
        // Lazy shrink: enforcement happens on the next insert.
        state.capacity = state.capacity.saturating_add_signed(delta);
    }

    pub(crate) fn value(&self, handle: &Handle) -> T
    where
        T: Clone,
    {
        let guard = self.state.lock();
        let entry = guard
            .entries
            .get(handle.slot)
            .expect("value of a released handle");
        debug_assert_eq!(entry.hash, handle.hash);
        entry.value.clone()
    }

    pub(crate) fn value_with<R>(&self, handle: &Handle, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.lock();
        let entry = guard
            .entries
            .get(handle.slot)
            .expect("value of a released handle");
        debug_assert_eq!(entry.hash, handle.hash);
        f(&entry.value)
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        self.state.lock().check_invariants()
    }
}

impl<T> ShardState<T> {
    fn list_mut(&mut self, kind: ListKind) -> &mut ListHead {
        match kind {
            ListKind::Lru => &mut self.lru,
            ListKind::InUse => &mut self.in_use,
        }
    }

    /// Links `id` at the head (newest end) of the given list.
    fn attach(&mut self, kind: ListKind, id: SlotId) {
        let old_head = match kind {
            ListKind::Lru => self.lru.head,
            ListKind::InUse => self.in_use.head,
        };
        {
            let entry = self.entries.get_mut(id).expect("attached entry missing");
            entry.list = kind;
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(head) => {
                self.entries
                    .get_mut(head)
                    .expect("list head missing")
                    .prev = Some(id)
            }
            None => self.list_mut(kind).tail = Some(id),
        }
        self.list_mut(kind).head = Some(id);
    }

    /// Unlinks `id` from whichever list it is on.
    fn detach(&mut self, id: SlotId) {
        let (prev, next, kind) = {
            let entry = self.entries.get(id).expect("detached entry missing");
            (entry.prev, entry.next, entry.list)
        };
        match prev {
            Some(p) => {
                self.entries
                    .get_mut(p)
                    .expect("list predecessor missing")
                    .next = next
            }
            None => self.list_mut(kind).head = next,
        }
        match next {
            Some(n) => {
                self.entries
                    .get_mut(n)
                    .expect("list successor missing")
                    .prev = prev
            }
            None => self.list_mut(kind).tail = prev,
        }
        let entry = self.entries.get_mut(id).expect("detached entry missing");
        entry.prev = None;
        entry.next = None;
    }

    /// Takes one reference for a caller; promotes LRU residents to in-use.
    fn ref_entry(&mut self, id: SlotId) {
        let (refs, in_cache) = {
            let entry = self.entries.get(id).expect("referenced entry missing");
            (entry.refs, entry.in_cache)
        };
        if refs == 1 && in_cache {
            self.detach(id);
            self.attach(ListKind::InUse, id);
        }
        self.entries.get_mut(id).expect("referenced entry missing").refs += 1;
    }

    /// Drops one reference. The entry is moved to the LRU list when the
    /// cache's reference becomes the only one, and staged for destruction
    /// when no references remain.
    fn unref(&mut self, id: SlotId, dead: &mut Vec<Entry<T>>) {
        let (refs, in_cache) = {
            let entry = self.entries.get_mut(id).expect("released entry missing");
            debug_assert!(entry.refs > 0);
            entry.refs -= 1;
            (entry.refs, entry.in_cache)
        };
        if refs == 0 {
            let entry = self.entries.remove(id).expect("destroyed entry missing");
            debug_assert!(!entry.in_cache);
            dead.push(entry);
        } else if in_cache && refs == 1 {
            // Lost its last external reference; becomes the newest eviction
            // candidate.
            self.detach(id);
            self.attach(ListKind::Lru, id);
        }
    }

    /// Completes removal of an entry already unlinked from the hash table:
    /// detaches it from its list, clears `in_cache`, gives back its charge,
    /// and drops the cache's reference. Returns whether there was an entry.
    fn finish_erase(&mut self, id: Option<SlotId>, dead: &mut Vec<Entry<T>>) -> bool {
        let Some(id) = id else { return false };
        let charge = {
            let entry = self.entries.get_mut(id).expect("erased entry missing");
            debug_assert!(entry.in_cache);
            entry.in_cache = false;
            entry.charge
        };
        self.detach(id);
        self.usage -= charge;
        self.unref(id, dead);
        true
    }

    #[cfg(any(test, debug_assertions))]
    fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        use crate::error::InvariantError;
        use std::collections::HashSet;

        fn ensure(cond: bool, msg: &str) -> Result<(), InvariantError> {
            if cond {
                Ok(())
            } else {
                Err(InvariantError::new(msg))
            }
        }

        // Every table-reachable entry is in_cache; their charges sum to usage.
        let mut indexed = HashSet::new();
        let mut charge_sum = 0usize;
        let mut table_err = None;
        self.table.for_each(&self.entries, |id| {
            let entry = self.entries.get(id).expect("indexed entry missing");
            if !entry.in_cache || entry.refs == 0 {
                table_err = Some("indexed entry not held by the cache");
            }
            charge_sum += entry.charge;
            if !indexed.insert(id) {
                table_err = Some("entry indexed twice");
            }
        });
        if let Some(msg) = table_err {
            return Err(InvariantError::new(msg));
        }
        ensure(charge_sum == self.usage, "usage does not match summed charges")?;
        ensure(indexed.len() == self.table.len(), "table element count drifted")?;

        // LRU list: refs == 1, in_cache, consistent back links.
        let mut on_lists = HashSet::new();
        let mut cur = self.lru.head;
        let mut prev = None;
        while let Some(id) = cur {
            let entry = self.entries.get(id).expect("lru entry missing");
            ensure(entry.in_cache, "lru entry not in_cache")?;
            ensure(entry.refs == 1, "lru entry has external references")?;
            ensure(entry.list == ListKind::Lru, "lru entry tagged for wrong list")?;
            ensure(entry.prev == prev, "lru back link broken")?;
            ensure(indexed.contains(&id), "lru entry not indexed")?;
            ensure(on_lists.insert(id), "lru list cycles")?;
            prev = Some(id);
            cur = entry.next;
        }
        ensure(self.lru.tail == prev, "lru tail does not close the list")?;

        // In-use list: refs >= 2, in_cache.
        let mut cur = self.in_use.head;
        let mut prev = None;
        while let Some(id) = cur {
            let entry = self.entries.get(id).expect("in-use entry missing");
            ensure(entry.in_cache, "in-use entry not in_cache")?;
            ensure(entry.refs >= 2, "in-use entry lacks external references")?;
            ensure(
                entry.list == ListKind::InUse,
                "in-use entry tagged for wrong list",
            )?;
            ensure(entry.prev == prev, "in-use back link broken")?;
            ensure(indexed.contains(&id), "in-use entry not indexed")?;
            ensure(on_lists.insert(id), "in-use list cycles")?;
            prev = Some(id);
            cur = entry.next;
        }
        ensure(self.in_use.tail == prev, "in-use tail does not close the list")?;

        // Every in_cache entry is on exactly one list.
        ensure(on_lists == indexed, "entry on no list or both lists")?;
        self.entries.debug_validate_invariants();
        Ok(())
    }
}

impl<T> Drop for ShardState<T> {
    fn drop(&mut self) {
        // Dropping a cache with unreleased client handles is a usage error.
        debug_assert!(
            self.in_use.head.is_none(),
            "cache dropped with outstanding handles"
        );
        let ids: Vec<SlotId> = self.entries.iter().map(|(id, _)| id).collect();
        for id in ids {
            let entry = self.entries.remove(id).expect("entry vanished during drop");
            debug_assert!(entry.in_cache && entry.refs == 1);
            entry.destroy();
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::lru::sharded::hash_key;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, usize),
        Lookup(u8),
        Erase(u8),
        Prune,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), 1usize..4).prop_map(|(k, c)| Op::Insert(k, c)),
            any::<u8>().prop_map(Op::Lookup),
            any::<u8>().prop_map(Op::Erase),
            Just(Op::Prune),
        ]
    }

    proptest! {
        /// After every operation, the shard's usage equals the summed charge
        /// of the entries reachable from its hash table, and both lists are
        /// structurally sound.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn charge_conservation_holds(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let shard: LruShard<u64> = LruShard::new(16);
            for op in ops {
                match op {
                    Op::Insert(k, c) => {
                        let key = [k];
                        let handle = shard.insert(&key, hash_key(&key), k as u64, c, None);
                        shard.release(handle);
                    }
                    Op::Lookup(k) => {
                        let key = [k];
                        if let Some(handle) = shard.lookup(&key, hash_key(&key)) {
                            shard.release(handle);
                        }
                    }
                    Op::Erase(k) => {
                        let key = [k];
                        shard.erase(&key, hash_key(&key));
                    }
                    Op::Prune => shard.prune(),
                }
                shard.check_invariants().unwrap();
            }
        }

        /// With unique keys and no lookups between inserts, eviction order is
        /// exactly insertion order.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn eviction_is_fifo_without_touches(capacity in 1usize..16, extra in 1usize..16) {
            let evicted = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
            let shard: LruShard<u64> = LruShard::new(capacity);

            let total = capacity + extra;
            for i in 0..total {
                let key = [i as u8];
                let log = std::sync::Arc::clone(&evicted);
                let deleter: Deleter<u64> =
                    Box::new(move |key: &[u8], _value: u64| log.lock().push(key[0]));
                let handle = shard.insert(&key, hash_key(&key), i as u64, 1, Some(deleter));
                shard.release(handle);
            }

            let expected: Vec<u8> = (0..extra).map(|i| i as u8).collect();
            prop_assert_eq!(evicted.lock().clone(), expected);
        }
    }
}
