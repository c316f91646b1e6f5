// ecs/pool.rs
use std::any::Any;
use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use super::id::EntityId;

/// Dense storage for one component type.
///
/// `entity_to_index` and `index_to_entity` are mutual inverses and the set
/// bits of `bitmap` (keyed by entity index) are exactly the pool's members.
/// Removal swaps the last element into the hole, so dense indices must not
/// be cached across structural changes.
pub struct Pool<T> {
    dense: Vec<T>,
    entity_to_index: HashMap<EntityId, usize>,
    index_to_entity: Vec<EntityId>,
    bitmap: FixedBitSet,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entity_to_index: HashMap::new(),
            index_to_entity: Vec::new(),
            bitmap: FixedBitSet::new(),
        }
    }

    /// Panics if `entity` already has a component in this pool.
    pub fn add(&mut self, entity: EntityId, value: T) -> &mut T {
        assert!(
            !self.entity_to_index.contains_key(&entity),
            "{:?} already has a {} component",
            entity,
            std::any::type_name::<T>()
        );

        let slot = self.dense.len();
        self.dense.push(value);
        self.entity_to_index.insert(entity, slot);
        self.index_to_entity.push(entity);

        let bit = entity.index() as usize;
        if bit >= self.bitmap.len() {
            self.bitmap.grow(bit + 1);
        }
        self.bitmap.insert(bit);

        &mut self.dense[slot]
    }

    /// Panics if `entity` has no component in this pool.
    pub fn remove(&mut self, entity: EntityId) -> T {
        let Some(slot) = self.entity_to_index.remove(&entity) else {
            panic!(
                "{:?} has no {} component to remove",
                entity,
                std::any::type_name::<T>()
            );
        };

        let last = self.dense.len() - 1;
        if slot != last {
            let survivor = self.index_to_entity[last];
            self.index_to_entity[slot] = survivor;
            self.entity_to_index.insert(survivor, slot);
        }
        self.index_to_entity.pop();
        self.bitmap.set(entity.index() as usize, false);

        self.dense.swap_remove(slot)
    }

    /// Panics if `entity` has no component in this pool; check with
    /// [`Pool::contains`] first.
    pub fn get(&self, entity: EntityId) -> &T {
        match self.try_get(entity) {
            Some(value) => value,
            None => panic!(
                "{:?} has no {} component",
                entity,
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn get_mut(&mut self, entity: EntityId) -> &mut T {
        match self.entity_to_index.get(&entity) {
            Some(&slot) => &mut self.dense[slot],
            None => panic!(
                "{:?} has no {} component",
                entity,
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn try_get(&self, entity: EntityId) -> Option<&T> {
        self.entity_to_index
            .get(&entity)
            .map(|&slot| &self.dense[slot])
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    /// Members in dense order. Borrowed, so single-type queries copy nothing.
    pub fn entities(&self) -> &[EntityId] {
        &self.index_to_entity
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.index_to_entity.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.index_to_entity
            .iter()
            .copied()
            .zip(self.dense.iter_mut())
    }

    pub fn bitmap(&self) -> &FixedBitSet {
        &self.bitmap
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.dense.len(), self.index_to_entity.len());
        assert_eq!(self.dense.len(), self.entity_to_index.len());
        assert_eq!(self.dense.len(), self.bitmap.count_ones(..));
        for (entity, &slot) in &self.entity_to_index {
            assert_eq!(self.index_to_entity[slot], *entity);
            assert!(self.bitmap.contains(entity.index() as usize));
        }
    }
}

/// Type-erased view of a pool so the scene can keep every component type in
/// one map and strip a dying entity from all of them.
pub trait ErasedPool: Any {
    fn contains_entity(&self, entity: EntityId) -> bool;
    fn remove_entity(&mut self, entity: EntityId);
    fn bitmap(&self) -> &FixedBitSet;
    fn len(&self) -> usize;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedPool for Pool<T> {
    fn contains_entity(&self, entity: EntityId) -> bool {
        self.contains(entity)
    }

    fn remove_entity(&mut self, entity: EntityId) {
        if self.contains(entity) {
            self.remove(entity);
        }
    }

    fn bitmap(&self) -> &FixedBitSet {
        Pool::bitmap(self)
    }

    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
