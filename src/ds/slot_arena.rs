//! Slab of cache entries addressed by stable `SlotId`s.
//!
//! Every shard stores its entries here and wires them together by id: each
//! entry carries three `SlotId` links (recency `prev`/`next` plus the hash
//! chain), so ids are `u32` to keep that per-entry footprint at 12 bytes
//! padded rather than 24. Vacant slots double as free-list nodes — each one
//! stores the id of the next vacancy — so eviction bursts recycle slots
//! without growing an auxiliary vector while the shard lock is held.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Vec<Slot<T>>            first_free ─► 3 ─► 1 ─► ∅
//!
//!   index: 0          1          2          3
//!          [entry]    [next: ∅]  [entry]    [next: 1]
//!           occupied   vacant     occupied   vacant
//! ```
//!
//! An id stays valid until its slot is removed; afterwards the index is the
//! next one reused. The shard's reference counting guarantees a slot is
//! never removed while a client handle still points at it, which is what
//! makes bare indices (no generation tag) safe here.
//!
//! `debug_validate_invariants()` walks the free chain in debug/test builds.

/// Stable handle to an entry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

impl SlotId {
    /// Returns the underlying slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    /// Free-list node: the vacancy that became free before this one.
    Vacant { next_free: Option<SlotId> },
}

#[derive(Debug)]
/// Entry slab with an intrusive free chain threaded through vacant slots.
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    first_free: Option<SlotId>,
    occupied: usize,
}

impl<T> SlotArena<T> {
    /// Creates an empty slab.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            first_free: None,
            occupied: 0,
        }
    }

    /// Stores `value`, reusing the most recently freed slot if one exists.
    pub fn insert(&mut self, value: T) -> SlotId {
        let id = match self.first_free {
            Some(id) => {
                let slot = std::mem::replace(&mut self.slots[id.index()], Slot::Occupied(value));
                match slot {
                    Slot::Vacant { next_free } => self.first_free = next_free,
                    Slot::Occupied(_) => unreachable!("free chain points at a live slot"),
                }
                id
            }
            None => {
                let idx = u32::try_from(self.slots.len()).expect("entry slab exceeded u32 ids");
                self.slots.push(Slot::Occupied(value));
                SlotId(idx)
            }
        };
        self.occupied += 1;
        id
    }

    /// Vacates the slot at `id` and returns its entry, or `None` if the slot
    /// is already vacant or out of bounds. The slot becomes the head of the
    /// free chain.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let first_free = self.first_free;
        let slot = self.slots.get_mut(id.index())?;
        if matches!(*slot, Slot::Vacant { .. }) {
            return None;
        }
        let old = std::mem::replace(slot, Slot::Vacant { next_free: first_free });
        self.first_free = Some(id);
        self.occupied -= 1;
        match old {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a shared reference to the entry at `id`, if occupied.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the entry at `id`, if occupied.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if `id` refers to an occupied slot.
    pub fn contains(&self, id: SlotId) -> bool {
        matches!(self.slots.get(id.index()), Some(Slot::Occupied(_)))
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Iterates over occupied `(SlotId, &T)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| match slot {
            Slot::Occupied(value) => Some((SlotId(idx as u32), value)),
            Slot::Vacant { .. } => None,
        })
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let occupied_count = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        assert_eq!(self.occupied, occupied_count);

        // The free chain visits every vacancy exactly once and never a live
        // slot.
        let mut chain = std::collections::HashSet::new();
        let mut cur = self.first_free;
        while let Some(id) = cur {
            assert!(chain.insert(id), "free chain cycles");
            match self.slots.get(id.index()) {
                Some(Slot::Vacant { next_free }) => cur = *next_free,
                _ => panic!("free chain points at a live slot"),
            }
        }
        assert_eq!(chain.len(), self.slots.len() - self.occupied);
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
