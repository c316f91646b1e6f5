use glam::{Mat4, Quat};

use crate::ecs::{EntityId, Scene};
use crate::scene::components::Root;
use crate::scene::{LocalToWorld, Transform};

/// Walks the hierarchy from every root, composing
/// `world = parent_world * local.matrix()` and
/// `world_rotation = parent_rotation * local.rotation`.
pub(crate) fn propagate_transforms(scene: &mut Scene) {
    let roots: Vec<EntityId> = scene.entities_of::<Root>().to_vec();

    log::trace!("Propagating transforms from {} root entities", roots.len());

    let mut stack: Vec<(EntityId, Mat4, Quat)> = Vec::new();

    for root in roots {
        stack.push((root, Mat4::IDENTITY, Quat::IDENTITY));

        while let Some((entity, parent_matrix, parent_rotation)) = stack.pop() {
            let local = *scene.get_component::<Transform>(entity);

            let matrix = parent_matrix * local.matrix();
            let rotation = parent_rotation * local.rotation;
            *scene.get_component_mut::<LocalToWorld>(entity) =
                LocalToWorld::from_parts(matrix, rotation);

            for &child in scene.children(entity).iter().rev() {
                stack.push((child, matrix, rotation));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_transform_propagation_simple() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene.set_parent(child, parent);
        *scene.transform_mut(parent) = Transform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        *scene.transform_mut(child) = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));

        propagate_transforms(&mut scene);

        let world = scene.get_component::<LocalToWorld>(child);
        assert!(world.position.abs_diff_eq(Vec3::new(5.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn rotation_composes_through_parent() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene.set_parent(child, parent);
        let quarter = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        *scene.transform_mut(parent) = Transform::IDENTITY.with_rotation(quarter);
        *scene.transform_mut(child) = Transform::from_translation(Vec3::new(0.0, 0.0, 1.0));

        propagate_transforms(&mut scene);

        let world = scene.get_component::<LocalToWorld>(child);
        assert!(world.position.abs_diff_eq(Vec3::X, 1e-6));
        assert!(world.forward.abs_diff_eq(Vec3::X, 1e-6));
        assert!(world.left.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn parent_scale_applies_to_child_offset() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene.set_parent(child, parent);
        *scene.transform_mut(parent) = Transform::IDENTITY.with_scale(Vec3::splat(2.0));
        *scene.transform_mut(child) = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));

        propagate_transforms(&mut scene);

        let world = scene.get_component::<LocalToWorld>(child);
        assert!(world.position.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn detached_child_stops_following_parent() {
        let mut scene = Scene::empty("test");
        let parent = scene.create_entity();
        let child = scene.create_entity();
        scene.set_parent(child, parent);
        *scene.transform_mut(parent) = Transform::from_translation(Vec3::new(3.0, 0.0, 0.0));
        scene.remove_parent(child);

        propagate_transforms(&mut scene);

        assert_eq!(scene.get_component::<LocalToWorld>(child).position, Vec3::ZERO);
    }
}
