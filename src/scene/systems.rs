// scene/systems.rs
use crate::ecs::{FrameContext, Scene, System};

use super::internal::{propagate_transforms, submit_renderables};

/// Recomputes every `LocalToWorld` from the hierarchy. Registered first so
/// later systems see this frame's world transforms.
pub struct LocalToWorldSystem;

impl System for LocalToWorldSystem {
    fn name(&self) -> &str {
        "local_to_world"
    }

    fn update(&mut self, scene: &mut Scene, _ctx: &mut FrameContext) {
        propagate_transforms(scene);
    }
}

/// Submits cameras, lights and renderables to the frame's queue.
pub struct RenderableSystem;

impl System for RenderableSystem {
    fn name(&self) -> &str {
        "renderable"
    }

    fn update(&mut self, scene: &mut Scene, ctx: &mut FrameContext) {
        submit_renderables(scene, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Assets;
    use crate::renderer::SubmissionQueue;
    use crate::scene::{Camera, LocalToWorld, Transform};
    use glam::Vec3;

    #[test]
    fn default_scene_registers_builtin_systems_first() {
        let scene = Scene::new("test");
        assert_eq!(scene.system_names(), vec!["local_to_world", "renderable"]);
    }

    #[test]
    fn submitted_camera_sees_propagated_transform() {
        let mut scene = Scene::new("test");
        let rig = scene.create_entity();
        let camera = scene.create_entity();
        scene.add_component(camera, Camera::default());
        scene.set_parent(camera, rig);
        *scene.transform_mut(rig) = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));

        let assets = Assets::default();
        let mut queue = SubmissionQueue::new();
        let mut ctx = FrameContext::new(0.016, &[], &mut queue, &assets);
        scene.update(&mut ctx);

        let submitted = queue.pop_camera().expect("camera submitted");
        assert_eq!(submitted.transform.position, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(
            scene.get_component::<LocalToWorld>(camera).position,
            Vec3::new(0.0, 3.0, 0.0)
        );
    }
}
