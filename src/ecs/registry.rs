// ecs/registry.rs
use std::any::TypeId;
use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::component::{Component, ComponentSet, Storable};
use super::id::{EntityId, IdAllocator};
use super::pool::{ErasedPool, Pool};
use super::system::{FrameContext, System};
use crate::scene::components::{Identity, Root};
use crate::scene::systems::{LocalToWorldSystem, RenderableSystem};
use crate::scene::{LocalToWorld, Transform};

/// Owns every entity, component pool, the parent/child hierarchy and the
/// systems that run over them.
pub struct Scene {
    name: String,
    ids: IdAllocator,
    pools: HashMap<TypeId, Box<dyn ErasedPool>>,
    parents: HashMap<EntityId, EntityId>,
    children: HashMap<EntityId, Vec<EntityId>>,
    systems: Vec<Box<dyn System>>,
    rng: SmallRng,
}

impl Scene {
    /// Scene with transform propagation and render submission registered as
    /// its first two systems.
    pub fn new(name: impl Into<String>) -> Self {
        let mut scene = Self::empty(name);
        scene.add_system(Box::new(LocalToWorldSystem));
        scene.add_system(Box::new(RenderableSystem));
        scene
    }

    /// Scene without any systems.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::with_allocator(name, IdAllocator::new())
    }

    pub fn with_allocator(name: impl Into<String>, ids: IdAllocator) -> Self {
        Self {
            name: name.into(),
            ids,
            pools: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            systems: Vec::new(),
            rng: SmallRng::seed_from_u64(0x6d6b_7200),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Returns `EntityId::INVALID` when the id space is exhausted.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.ids.create();
        if entity.is_invalid() {
            return entity;
        }

        let uuid = self.rng.gen();
        self.pool_mut::<Identity>().add(entity, Identity { uuid });
        self.pool_mut::<Transform>().add(entity, Transform::IDENTITY);
        self.pool_mut::<LocalToWorld>()
            .add(entity, LocalToWorld::default());
        self.pool_mut::<Root>().add(entity, Root);

        self.parents.insert(entity, EntityId::INVALID);
        self.children.insert(entity, Vec::new());

        entity
    }

    /// Destroys `entity` and, depth first, all of its descendants.
    pub fn destroy_entity(&mut self, entity: EntityId) {
        assert!(self.is_alive(entity), "destroying dead entity {:?}", entity);

        let children = self.children.get(&entity).cloned().unwrap_or_default();
        for child in children {
            self.destroy_entity(child);
        }

        self.remove_parent(entity);

        for pool in self.pools.values_mut() {
            pool.remove_entity(entity);
        }

        self.parents.remove(&entity);
        self.children.remove(&entity);
        self.ids.destroy(entity);
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.ids.is_valid(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.ids.alive_count()
    }

    pub fn active_entities(&self) -> Vec<EntityId> {
        self.ids.active_ids()
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    pub fn has_parent(&self, child: EntityId) -> bool {
        self.parent(child) != EntityId::INVALID
    }

    /// `EntityId::INVALID` for root entities.
    pub fn parent(&self, child: EntityId) -> EntityId {
        self.parents
            .get(&child)
            .copied()
            .unwrap_or(EntityId::INVALID)
    }

    pub fn children(&self, parent: EntityId) -> &[EntityId] {
        match self.children.get(&parent) {
            Some(children) => children,
            None => &[],
        }
    }

    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) {
        assert!(self.is_alive(child), "set_parent on dead child {:?}", child);
        assert!(self.is_alive(parent), "set_parent to dead parent {:?}", parent);
        assert!(
            !self.is_ancestor_or_self(child, parent),
            "parenting {:?} under {:?} would create a cycle",
            child,
            parent
        );

        self.remove_parent(child);
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);

        self.pool_mut::<Root>().remove(child);
    }

    pub fn remove_parent(&mut self, child: EntityId) {
        if !self.has_parent(child) {
            return;
        }

        let parent = self.parent(child);
        self.parents.insert(child, EntityId::INVALID);
        if let Some(siblings) = self.children.get_mut(&parent) {
            if let Some(pos) = siblings.iter().position(|&c| c == child) {
                siblings.remove(pos);
            }
        }

        self.pool_mut::<Root>().add(child, Root);
    }

    fn is_ancestor_or_self(&self, ancestor: EntityId, mut entity: EntityId) -> bool {
        while entity != EntityId::INVALID {
            if entity == ancestor {
                return true;
            }
            entity = self.parent(entity);
        }
        false
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Panics if the entity already has a `T`.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> &mut T {
        assert!(self.is_alive(entity), "add_component on dead entity {:?}", entity);
        self.pool_mut::<T>().add(entity, value)
    }

    /// Panics if the entity has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> T {
        self.pool_mut::<T>().remove(entity)
    }

    /// Panics if the entity has no `T`; check with [`Scene::all_of`] first.
    pub fn get_component<T: Storable>(&self, entity: EntityId) -> &T {
        match self.pool::<T>() {
            Some(pool) => pool.get(entity),
            None => panic!(
                "{:?} has no {} component",
                entity,
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn get_component_mut<T: Storable>(&mut self, entity: EntityId) -> &mut T {
        self.pool_mut::<T>().get_mut(entity)
    }

    pub fn try_component<T: Storable>(&self, entity: EntityId) -> Option<&T> {
        self.pool::<T>().and_then(|pool| pool.try_get(entity))
    }

    pub fn transform_mut(&mut self, entity: EntityId) -> &mut Transform {
        self.get_component_mut::<Transform>(entity)
    }

    pub fn has<T: Storable>(&self, entity: EntityId) -> bool {
        self.pool::<T>().is_some_and(|pool| pool.contains(entity))
    }

    pub fn all_of<Q: ComponentSet>(&self, entity: EntityId) -> bool {
        Q::type_ids().iter().all(|ty| self.pool_contains(*ty, entity))
    }

    pub fn any_of<Q: ComponentSet>(&self, entity: EntityId) -> bool {
        Q::type_ids().iter().any(|ty| self.pool_contains(*ty, entity))
    }

    /// Members of a single pool, borrowed in dense order.
    pub fn entities_of<T: Storable>(&self) -> &[EntityId] {
        match self.pool::<T>() {
            Some(pool) => pool.entities(),
            None => &[],
        }
    }

    /// Entities carrying every component in `Q`, found by intersecting the
    /// pools' bitmaps.
    pub fn entities_with<Q: ComponentSet>(&self) -> Vec<EntityId> {
        let types = Q::type_ids();
        let mut bitmaps = Vec::with_capacity(types.len());
        for ty in &types {
            match self.pools.get(ty) {
                Some(pool) => bitmaps.push(pool.bitmap()),
                None => return Vec::new(),
            }
        }

        let Some((first, rest)) = bitmaps.split_first() else {
            return Vec::new();
        };
        if rest.is_empty() {
            return self.resolve(first);
        }

        let mut hits: FixedBitSet = (*first).clone();
        for bitmap in rest {
            hits.intersect_with(bitmap);
        }
        self.resolve(&hits)
    }

    fn resolve(&self, bits: &FixedBitSet) -> Vec<EntityId> {
        bits.ones()
            .filter_map(|index| self.ids.current(index as u32))
            .collect()
    }

    fn pool_contains(&self, ty: TypeId, entity: EntityId) -> bool {
        self.pools
            .get(&ty)
            .is_some_and(|pool| pool.contains_entity(entity))
    }

    pub fn pool<T: Storable>(&self) -> Option<&Pool<T>> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any().downcast_ref::<Pool<T>>())
    }

    fn pool_mut<T: Storable>(&mut self) -> &mut Pool<T> {
        self.pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Pool::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
            .unwrap_or_else(|| unreachable!("pool registered under the wrong TypeId"))
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    pub fn add_system(&mut self, system: Box<dyn System>) {
        log::debug!("Scene '{}': registered system '{}'", self.name, system.name());
        self.systems.push(system);
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Runs every system once, in registration order.
    pub fn update(&mut self, ctx: &mut FrameContext) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in systems.iter_mut() {
            system.update(self, ctx);
        }
        // Systems registered while running are kept after the existing ones.
        systems.append(&mut self.systems);
        self.systems = systems;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Light;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn new_entity_carries_builtins_and_is_root() {
        let mut scene = Scene::empty("test");
        let e = scene.create_entity();
        assert!(scene.all_of::<(Identity, Transform, LocalToWorld, Root)>(e));
        assert!(!scene.has_parent(e));
        assert_eq!(scene.parent(e), EntityId::INVALID);
    }

    #[test]
    fn identities_are_distinct() {
        let mut scene = Scene::empty("test");
        let a = scene.create_entity();
        let b = scene.create_entity();
        assert_ne!(
            scene.get_component::<Identity>(a),
            scene.get_component::<Identity>(b)
        );
    }

    #[test]
    fn destroy_strips_every_pool_and_children() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        let grandchild = scene.create_entity();
        scene.add_component(child, Health(3));
        scene.set_parent(child, parent);
        scene.set_parent(grandchild, child);

        scene.destroy_entity(parent);

        for e in [parent, child, grandchild] {
            assert!(!scene.is_alive(e));
            assert!(!scene.any_of::<(Identity, Transform, LocalToWorld, Root, Health)>(e));
        }
        assert_eq!(scene.entity_count(), 0);
        assert!(scene.entities_of::<Transform>().is_empty());
    }

    #[test]
    fn destroying_child_detaches_it_from_parent() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene.set_parent(child, parent);
        scene.destroy_entity(child);
        assert!(scene.children(parent).is_empty());
        assert!(scene.is_alive(parent));
    }

    #[test]
    fn remove_parent_is_noop_for_roots() {
        let mut scene = Scene::empty("test");
        let e = scene.create_entity();
        scene.remove_parent(e);
        assert!(scene.has::<Root>(e));
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn parenting_under_descendant_panics() {
        let mut scene = Scene::empty("test");
        let a = scene.create_entity();
        let b = scene.create_entity();
        scene.set_parent(b, a);
        scene.set_parent(a, b);
    }

    #[test]
    fn multi_component_query_intersects() {
        let mut scene = Scene::empty("test");
        let both = scene.create_entity();
        let only_health = scene.create_entity();
        let only_tag = scene.create_entity();
        scene.add_component(both, Health(1));
        scene.add_component(both, Tag);
        scene.add_component(only_health, Health(2));
        scene.add_component(only_tag, Tag);

        assert_eq!(scene.entities_with::<(Health, Tag)>(), vec![both]);
        assert_eq!(scene.entities_with::<(Health,)>().len(), 2);
        assert!(scene.entities_with::<(Health, Light)>().is_empty());
    }

    #[test]
    fn query_uses_current_generation_after_recycling() {
        let mut scene = Scene::empty("test");
        let old = scene.create_entity();
        scene.destroy_entity(old);
        let new = scene.create_entity();
        scene.add_component(new, Tag);
        assert_eq!(new.index(), old.index());
        assert_eq!(scene.entities_with::<(Tag, Transform)>(), vec![new]);
    }

    #[test]
    fn removed_component_leaves_queries() {
        let mut scene = Scene::empty("test");
        let e = scene.create_entity();
        scene.add_component(e, Health(9));
        assert_eq!(scene.remove_component::<Health>(e), Health(9));
        assert!(scene.entities_with::<(Health,)>().is_empty());
        assert!(!scene.any_of::<(Health, Tag)>(e));
    }

    #[test]
    fn systems_run_in_registration_order() {
        use crate::ecs::FnSystem;
        use crate::renderer::SubmissionQueue;
        use std::cell::RefCell;
        use std::rc::Rc;

        let order = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::empty("test");
        for label in ["first", "second"] {
            let order = order.clone();
            scene.add_system(Box::new(FnSystem::new(label, move |_, _| {
                order.borrow_mut().push(label);
            })));
        }

        let assets = crate::asset::Assets::default();
        let mut queue = SubmissionQueue::default();
        let mut ctx = FrameContext::new(0.016, &[], &mut queue, &assets);
        scene.update(&mut ctx);
        scene.update(&mut ctx);
        assert_eq!(*order.borrow(), vec!["first", "second", "first", "second"]);
        assert_eq!(scene.system_names(), vec!["first", "second"]);
    }
}
