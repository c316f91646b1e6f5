use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use wgpu_deferred::asset::Assets;
use wgpu_deferred::ecs::{Component, EntityId, FrameContext, IdAllocator, Pool, Scene};
use wgpu_deferred::renderer::SubmissionQueue;
use wgpu_deferred::scene::{LocalToWorld, Root, Transform};

const EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity(Vec3);
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(u32);
impl Component for Health {}

fn run_frame(scene: &mut Scene) {
    let assets = Assets::new();
    let mut queue = SubmissionQueue::new();
    let mut ctx = FrameContext::new(0.016, &[], &mut queue, &assets);
    scene.update(&mut ctx);
}

fn world(scene: &Scene, entity: EntityId) -> LocalToWorld {
    *scene.get_component::<LocalToWorld>(entity)
}

#[test]
fn live_ids_never_collide_under_random_churn() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut ids = IdAllocator::new();
    let mut live: Vec<EntityId> = Vec::new();
    let mut retired: Vec<EntityId> = Vec::new();

    for _ in 0..5_000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let id = ids.create();
            assert!(!id.is_invalid());
            live.push(id);
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            assert!(ids.destroy(victim));
            retired.push(victim);
        }

        let unique: HashSet<(u32, u16)> = live.iter().map(|id| (id.index(), id.generation())).collect();
        assert_eq!(unique.len(), live.len());
    }

    assert_eq!(ids.alive_count(), live.len());
    assert!(retired.iter().all(|id| !ids.is_valid(*id)));
    assert!(live.iter().all(|id| ids.is_valid(*id)));
    assert!(!ids.destroy(EntityId::INVALID));
}

#[test]
fn recycled_index_gets_a_newer_generation() {
    let mut ids = IdAllocator::new();
    let first = ids.create();
    assert!(ids.destroy(first));
    assert!(!ids.destroy(first));

    let second = ids.create();
    assert_eq!(second.index(), first.index());
    assert!(second.generation() > first.generation());
    assert!(!ids.is_valid(first));
    assert!(ids.is_valid(second));
}

#[test]
fn exhausted_generation_retires_the_index() {
    let mut ids = IdAllocator::new();
    let mut id = ids.create();
    let index = id.index();
    while id.generation() < EntityId::MAX_GENERATION - 1 {
        assert!(ids.destroy(id));
        id = ids.create();
        assert_eq!(id.index(), index);
    }
    assert!(ids.destroy(id));

    // The final generation is never handed out; the index is gone for good.
    for _ in 0..4 {
        let fresh = ids.create();
        assert_ne!(fresh.index(), index);
    }
    assert_eq!(ids.alive_count(), 4);
}

#[test]
fn pool_stays_dense_after_interleaved_adds_and_removes() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut ids = IdAllocator::new();
    let mut pool: Pool<Health> = Pool::new();
    let mut holders: Vec<EntityId> = Vec::new();

    for step in 0..2_000u32 {
        if holders.is_empty() || rng.gen_bool(0.55) {
            let entity = ids.create();
            pool.add(entity, Health(step));
            holders.push(entity);
        } else {
            let entity = holders.swap_remove(rng.gen_range(0..holders.len()));
            pool.remove(entity);
        }

        assert_eq!(pool.len(), holders.len());
        assert_eq!(pool.bitmap().count_ones(..), pool.len());
    }

    for entity in &holders {
        assert!(pool.contains(*entity));
        assert!(pool.entities().contains(entity));
    }
    let listed: HashSet<EntityId> = pool.entities().iter().copied().collect();
    assert_eq!(listed, holders.iter().copied().collect());
}

#[test]
fn multi_component_queries_match_membership() {
    let mut scene = Scene::new("queries");
    let mut rng = SmallRng::seed_from_u64(3);
    let entities: Vec<EntityId> = (0..64).map(|_| scene.create_entity()).collect();
    for entity in &entities {
        if rng.gen_bool(0.5) {
            scene.add_component(*entity, Velocity(Vec3::X));
        }
        if rng.gen_bool(0.5) {
            scene.add_component(*entity, Health(10));
        }
    }

    let both: HashSet<EntityId> = scene.entities_with::<(Velocity, Health)>().into_iter().collect();
    let velocity: HashSet<EntityId> = scene.entities_with::<(Velocity,)>().into_iter().collect();
    assert!(both.is_subset(&velocity));

    for entity in &entities {
        let has_both = scene.has::<Velocity>(*entity) && scene.has::<Health>(*entity);
        assert_eq!(both.contains(entity), has_both);
        assert_eq!(scene.all_of::<(Velocity, Health)>(*entity), has_both);
    }
}

#[test]
fn three_level_chain_composes_world_transforms() {
    let mut scene = Scene::new("chain");
    let root = scene.create_entity();
    let mid = scene.create_entity();
    let leaf = scene.create_entity();
    scene.set_parent(mid, root);
    scene.set_parent(leaf, mid);

    *scene.transform_mut(mid) = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
    *scene.transform_mut(leaf) = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0));
    run_frame(&mut scene);
    assert!(world(&scene, leaf).position.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPSILON));

    let root_transform = Transform::from_translation(Vec3::new(0.0, 0.0, -3.0))
        .with_rotation(Quat::from_rotation_y(0.7))
        .with_scale(Vec3::splat(2.0));
    let mid_transform = Transform::from_translation(Vec3::new(1.0, 2.0, 0.0)).with_rotation(Quat::from_rotation_x(0.3));
    let leaf_transform = Transform::from_translation(Vec3::new(0.0, 1.0, 4.0));
    *scene.transform_mut(root) = root_transform;
    *scene.transform_mut(mid) = mid_transform;
    *scene.transform_mut(leaf) = leaf_transform;
    run_frame(&mut scene);

    let expected: Mat4 = root_transform.matrix() * mid_transform.matrix() * leaf_transform.matrix();
    let leaf_world = world(&scene, leaf);
    assert!(leaf_world.matrix.abs_diff_eq(expected, 1e-4));
    assert!(leaf_world.position.abs_diff_eq(expected.w_axis.truncate(), 1e-4));

    let rotation = root_transform.rotation * mid_transform.rotation;
    assert!(leaf_world.forward.abs_diff_eq(rotation * Vec3::Z, 1e-4));
}

#[test]
fn reparenting_moves_the_child_and_the_root_marker() {
    let mut scene = Scene::new("hierarchy");
    let first = scene.create_entity();
    let second = scene.create_entity();
    let child = scene.create_entity();
    assert!(scene.has::<Root>(child));

    scene.set_parent(child, first);
    scene.set_parent(child, second);
    assert_eq!(scene.children(second), &[child]);
    assert!(scene.children(first).is_empty());
    assert_eq!(scene.parent(child), second);
    assert!(!scene.has::<Root>(child));

    scene.remove_parent(child);
    assert!(scene.has::<Root>(child));
    assert_eq!(scene.parent(child), EntityId::INVALID);
    assert!(scene.children(second).is_empty());
}

#[test]
fn destroying_a_parent_takes_its_subtree() {
    let mut scene = Scene::new("destroy");
    let parent = scene.create_entity();
    let child = scene.create_entity();
    let grandchild = scene.create_entity();
    let bystander = scene.create_entity();
    scene.set_parent(child, parent);
    scene.set_parent(grandchild, child);
    scene.add_component(grandchild, Health(1));

    scene.destroy_entity(parent);
    assert!(!scene.is_alive(parent));
    assert!(!scene.is_alive(child));
    assert!(!scene.is_alive(grandchild));
    assert!(scene.is_alive(bystander));
    assert_eq!(scene.entity_count(), 1);
    assert!(scene.entities_with::<(Health,)>().is_empty());
}

#[test]
#[should_panic]
fn parenting_under_a_descendant_panics() {
    let mut scene = Scene::new("cycle");
    let parent = scene.create_entity();
    let child = scene.create_entity();
    scene.set_parent(child, parent);
    scene.set_parent(parent, child);
}
