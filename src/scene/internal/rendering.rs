use crate::ecs::{FrameContext, Scene};
use crate::scene::{Camera, Light, LocalToWorld, Renderable};

/// Pushes every camera, light and renderable of the scene into the frame's
/// submission queue, using the world transforms computed this frame.
pub(crate) fn submit_renderables(scene: &Scene, ctx: &mut FrameContext) {
    let cameras = scene.entities_with::<(LocalToWorld, Camera)>();
    for &entity in &cameras {
        ctx.queue.submit_camera(
            scene.get_component::<LocalToWorld>(entity),
            scene.get_component::<Camera>(entity),
        );
    }

    let lights = scene.entities_with::<(LocalToWorld, Light)>();
    for &entity in &lights {
        ctx.queue.submit_light(
            scene.get_component::<LocalToWorld>(entity),
            scene.get_component::<Light>(entity),
        );
    }

    let renderables = scene.entities_with::<(LocalToWorld, Renderable)>();
    for &entity in &renderables {
        ctx.queue.submit_mesh(
            scene.get_component::<LocalToWorld>(entity),
            scene.get_component::<Renderable>(entity),
            &ctx.assets.materials,
        );
    }

    log::trace!(
        "Scene '{}': submitted {} cameras, {} lights, {} renderables",
        scene.name(),
        cameras.len(),
        lights.len(),
        renderables.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Assets, Handle};
    use crate::renderer::{Material, RenderPath, SubmissionQueue};

    #[test]
    fn only_complete_entities_are_submitted() {
        let mut assets = Assets::default();
        let material = assets.materials.insert(Material::new(RenderPath::Deferred));

        let mut scene = Scene::empty("test");
        let camera = scene.create_entity();
        scene.add_component(camera, Camera::default());
        let lamp = scene.create_entity();
        scene.add_component(lamp, Light::point(glam::Vec3::ONE, 1.0));
        let cube = scene.create_entity();
        scene.add_component(cube, Renderable::new(Handle::new(0), material));
        // Plain entities carry a LocalToWorld but nothing to draw.
        scene.create_entity();

        let mut queue = SubmissionQueue::new();
        let mut ctx = FrameContext::new(0.0, &[], &mut queue, &assets);
        submit_renderables(&scene, &mut ctx);

        assert_eq!(queue.camera_count(), 1);
        assert_eq!(queue.lights().len(), 1);
        assert_eq!(queue.instance_count(RenderPath::Deferred), 1);
    }
}
