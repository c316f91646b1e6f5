// ecs/id.rs
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Internal bookkeeping bits stored in the top 16 bits of a master record.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub(crate) struct EntityFlags: u16 {
        const ACTIVE = 1 << 15;
    }
}

const INDEX_BITS: u64 = 32;
const GENERATION_BITS: u64 = 16;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u64 = (1 << GENERATION_BITS) - 1;
const GENERATION_SHIFT: u64 = INDEX_BITS;
const FLAGS_SHIFT: u64 = INDEX_BITS + GENERATION_BITS;

/// Packed entity identifier: index in bits 0..32, generation in 32..48 and
/// internal flags in 48..64. Ids handed out to callers never carry flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const INVALID: EntityId = EntityId(0x0000_FFFF_FFFF_FFFF);
    pub const MAX_INDEX: u32 = u32::MAX;
    pub const MAX_GENERATION: u16 = u16::MAX;

    pub(crate) const fn from_parts(index: u32, generation: u16) -> Self {
        Self(index as u64 | ((generation as u64) << GENERATION_SHIFT))
    }

    const fn with_flags(self, flags: EntityFlags) -> Self {
        Self(self.0 | ((flags.bits() as u64) << FLAGS_SHIFT))
    }

    pub const fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    pub const fn generation(self) -> u16 {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u16
    }

    pub(crate) fn flags(self) -> EntityFlags {
        EntityFlags::from_bits_truncate((self.0 >> FLAGS_SHIFT) as u16)
    }

    /// Same index and generation, flags stripped.
    const fn key(self) -> Self {
        Self(self.0 & ((1 << FLAGS_SHIFT) - 1))
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "EntityId(INVALID)")
        } else {
            write!(f, "EntityId({}v{})", self.index(), self.generation())
        }
    }
}

/// Issues and recycles entity ids.
///
/// Every index ever handed out owns one master record. Free records form a
/// singly linked list threaded through the master array: a free record's
/// index field points at the next free slot, `EntityId::MAX_INDEX` ends the
/// list. A record whose generation reached `MAX_GENERATION` is retired and
/// never linked back in.
#[derive(Debug)]
pub struct IdAllocator {
    master: Vec<EntityId>,
    next_free: u32,
    alive: usize,
    index_limit: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            master: Vec::new(),
            next_free: EntityId::MAX_INDEX,
            alive: 0,
            index_limit: EntityId::MAX_INDEX,
        }
    }

    /// Allocator that refuses to hand out more than `limit` distinct indices.
    /// Exists so exhaustion can be exercised without four billion entities.
    pub fn with_index_limit(limit: u32) -> Self {
        Self {
            index_limit: limit.min(EntityId::MAX_INDEX),
            ..Self::new()
        }
    }

    pub fn create(&mut self) -> EntityId {
        if self.next_free != EntityId::MAX_INDEX {
            let index = self.next_free;
            let slot = &mut self.master[index as usize];
            self.next_free = slot.index();
            *slot = EntityId::from_parts(index, slot.generation()).with_flags(EntityFlags::ACTIVE);
            self.alive += 1;
            return slot.key();
        }

        let counter = self.master.len() as u64;
        if counter >= self.index_limit as u64 {
            log::warn!("Entity index space exhausted ({} indices)", counter);
            return EntityId::INVALID;
        }

        let id = EntityId::from_parts(counter as u32, 0);
        self.master.push(id.with_flags(EntityFlags::ACTIVE));
        self.alive += 1;
        id
    }

    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.is_valid(id) {
            return false;
        }

        let index = id.index();
        let next_generation = id.generation().saturating_add(1);
        let slot = &mut self.master[index as usize];

        if next_generation < EntityId::MAX_GENERATION {
            *slot = EntityId::from_parts(self.next_free, next_generation);
            self.next_free = index;
        } else {
            log::debug!("Retiring entity index {} after generation exhaustion", index);
            *slot = EntityId::from_parts(EntityId::MAX_INDEX, EntityId::MAX_GENERATION);
        }

        self.alive -= 1;
        true
    }

    pub fn is_valid(&self, id: EntityId) -> bool {
        if id.is_invalid() || !id.flags().is_empty() {
            return false;
        }
        match self.master.get(id.index() as usize) {
            Some(record) => {
                record.flags().contains(EntityFlags::ACTIVE)
                    && record.generation() == id.generation()
            }
            None => false,
        }
    }

    /// The live id currently occupying `index`, if any.
    pub fn current(&self, index: u32) -> Option<EntityId> {
        let record = self.master.get(index as usize)?;
        record
            .flags()
            .contains(EntityFlags::ACTIVE)
            .then(|| EntityId::from_parts(index, record.generation()))
    }

    /// Linear scan over every index ever allocated. Meant for debugging and
    /// tooling, not for per-frame use.
    pub fn active_ids(&self) -> Vec<EntityId> {
        self.master
            .iter()
            .enumerate()
            .filter(|(_, record)| record.flags().contains(EntityFlags::ACTIVE))
            .map(|(index, record)| EntityId::from_parts(index as u32, record.generation()))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive
    }

    /// Number of indices ever allocated, live or not.
    pub fn capacity(&self) -> usize {
        self.master.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn packs_index_and_generation() {
        let id = EntityId::from_parts(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert!(id.flags().is_empty());
        assert_eq!(EntityId::INVALID.index(), u32::MAX);
        assert_eq!(EntityId::INVALID.generation(), u16::MAX);
    }

    #[test]
    fn fresh_ids_are_sequential_with_generation_zero() {
        let mut ids = IdAllocator::new();
        let a = ids.create();
        let b = ids.create();
        assert_eq!((a.index(), a.generation()), (0, 0));
        assert_eq!((b.index(), b.generation()), (1, 0));
        assert_eq!(ids.alive_count(), 2);
    }

    #[test]
    fn recycled_index_bumps_generation_and_invalidates_stale_id() {
        let mut ids = IdAllocator::new();
        let a = ids.create();
        assert!(ids.destroy(a));
        let b = ids.create();
        assert_eq!(b.index(), a.index());
        assert!(b.generation() > a.generation());
        assert!(!ids.is_valid(a));
        assert!(ids.is_valid(b));
    }

    #[test]
    fn destroy_rejects_invalid_and_stale_ids() {
        let mut ids = IdAllocator::new();
        let a = ids.create();
        assert!(!ids.destroy(EntityId::INVALID));
        assert!(!ids.destroy(EntityId::from_parts(42, 0)));
        assert!(ids.destroy(a));
        assert!(!ids.destroy(a));
        assert_eq!(ids.alive_count(), 0);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut ids = IdAllocator::new();
        let a = ids.create();
        let b = ids.create();
        ids.destroy(a);
        ids.destroy(b);
        assert_eq!(ids.create().index(), b.index());
        assert_eq!(ids.create().index(), a.index());
        assert_eq!(ids.create().index(), 2);
    }

    #[test]
    fn exhausted_generation_retires_index() {
        let mut ids = IdAllocator::new();
        let mut id = ids.create();
        let index = id.index();
        while id.index() == index {
            assert!(ids.destroy(id));
            id = ids.create();
        }
        // The retired slot is skipped; the replacement comes from a new index.
        assert_eq!(id.index(), index + 1);
        assert_eq!(ids.alive_count(), 1);
        for _ in 0..16 {
            let next = ids.create();
            assert_ne!(next.index(), index);
        }
    }

    #[test]
    fn exhausted_index_space_returns_invalid() {
        let mut ids = IdAllocator::with_index_limit(2);
        assert!(!ids.create().is_invalid());
        let b = ids.create();
        assert!(ids.create().is_invalid());
        ids.destroy(b);
        assert!(!ids.create().is_invalid());
    }

    #[test]
    fn active_ids_lists_only_live_entities() {
        let mut ids = IdAllocator::new();
        let created: Vec<_> = (0..6).map(|_| ids.create()).collect();
        ids.destroy(created[1]);
        ids.destroy(created[4]);
        let active: HashSet<_> = ids.active_ids().into_iter().collect();
        assert_eq!(active.len(), 4);
        assert!(active.contains(&created[0]));
        assert!(!active.contains(&created[1]));
        assert!(active.iter().all(|id| ids.is_valid(*id)));
    }
}
