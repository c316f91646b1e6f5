use glam::{Mat4, Quat, Vec3};

use wgpu_deferred::asset::{Assets, Handle};
use wgpu_deferred::ecs::{FrameContext, Scene};
use wgpu_deferred::renderer::lights::{light_pass_count, light_passes, LIGHTS_PER_PASS};
use wgpu_deferred::renderer::shadow::{ShadowBounds, MAX_SHADOW_LIGHTS};
use wgpu_deferred::renderer::{
    FramePlan, FramebufferLayout, Material, PassKind, PostEffects, RenderPath, SubmissionQueue,
};
use wgpu_deferred::scene::{Camera, Light, LocalToWorld, Renderable, Transform, Viewport};

const EPSILON: f32 = 1e-4;

fn update(scene: &mut Scene, assets: &Assets, queue: &mut SubmissionQueue) {
    let mut ctx = FrameContext::new(0.016, &[], queue, assets);
    scene.update(&mut ctx);
}

fn camera_at_depth(scene: &mut Scene, depth: u8) {
    let entity = scene.create_entity();
    scene.add_component(
        entity,
        Camera {
            depth,
            ..Camera::default()
        },
    );
}

/// A scene holding one mesh per render path, two lights and a camera.
fn populated_scene(assets: &mut Assets) -> Scene {
    let mut scene = Scene::new("frame");
    let mesh = Handle::new(0);
    let materials = [
        assets.add_material(Material::deferred()),
        assets.add_material(Material::forward(Default::default())),
        assets.add_material(Material::transparent(0.5)),
    ];
    for (i, material) in materials.into_iter().enumerate() {
        let entity = scene.create_entity();
        *scene.transform_mut(entity) = Transform::from_translation(Vec3::new(i as f32, 0.0, 5.0));
        scene.add_component(entity, Renderable::new(mesh, material));
    }

    let light = scene.create_entity();
    scene.add_component(light, Light::point(Vec3::ONE, 10.0));
    let sun = scene.create_entity();
    scene.add_component(sun, Light::directional(Vec3::ONE, 1.0));

    camera_at_depth(&mut scene, 0);
    scene
}

#[test]
fn scene_update_fills_every_bucket() {
    let mut assets = Assets::new();
    let mut scene = populated_scene(&mut assets);
    let mut queue = SubmissionQueue::new();
    update(&mut scene, &assets, &mut queue);

    assert_eq!(queue.camera_count(), 1);
    assert_eq!(queue.lights().len(), 2);
    for path in [RenderPath::Deferred, RenderPath::Forward, RenderPath::Transparent] {
        assert_eq!(queue.instance_count(path), 1, "{:?}", path);
    }

    let deferred = queue.bucket(RenderPath::Deferred);
    let matrices: Vec<Mat4> = deferred.values().flat_map(|meshes| meshes.values()).flatten().copied().collect();
    assert!(matrices[0].w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), EPSILON));
}

#[test]
fn cleared_queue_does_not_leak_into_the_next_frame() {
    let mut assets = Assets::new();
    let mut scene = populated_scene(&mut assets);
    let mut queue = SubmissionQueue::new();

    update(&mut scene, &assets, &mut queue);
    assert!(!queue.is_empty());
    queue.clear();
    assert!(queue.is_empty());
    assert!(FramePlan::build(&queue).is_empty());

    update(&mut scene, &assets, &mut queue);
    assert_eq!(queue.camera_count(), 1);
    assert_eq!(queue.lights().len(), 2);
    assert_eq!(queue.instance_count(RenderPath::Deferred), 1);
}

#[test]
fn frame_without_cameras_renders_nothing() {
    let mut assets = Assets::new();
    let mut scene = populated_scene(&mut assets);
    let cameras = scene.entities_with::<(Camera,)>();
    for camera in cameras {
        scene.destroy_entity(camera);
    }

    let mut queue = SubmissionQueue::new();
    update(&mut scene, &assets, &mut queue);
    assert_eq!(queue.instance_count(RenderPath::Deferred), 1);

    let plan = FramePlan::build(&queue);
    assert!(plan.is_empty());
    assert!(plan.passes().is_empty());
}

#[test]
fn cameras_render_in_depth_order_with_stable_ties() {
    let mut scene = Scene::new("cameras");
    for depth in [3, 0, 2, 0, 1] {
        camera_at_depth(&mut scene, depth);
    }
    let assets = Assets::new();
    let mut queue = SubmissionQueue::new();
    update(&mut scene, &assets, &mut queue);

    let planned: Vec<u8> = FramePlan::build(&queue)
        .cameras
        .iter()
        .map(|plan| plan.camera.camera.depth)
        .collect();
    assert_eq!(planned, vec![0, 0, 1, 2, 3]);

    let mut popped = Vec::new();
    while let Some(camera) = queue.pop_camera() {
        popped.push(camera.camera.depth);
    }
    assert_eq!(popped, planned);
}

#[test]
fn every_camera_ends_with_a_blit_into_its_viewport() {
    let mut queue = SubmissionQueue::new();
    let inset = Viewport::new(0.5, 0.5, 1.0, 1.0);
    queue.submit_camera(&LocalToWorld::default(), &Camera::default());
    queue.submit_camera(
        &LocalToWorld::default(),
        &Camera {
            depth: 1,
            viewport: inset,
            ..Camera::default()
        },
    );

    let plan = FramePlan::build(&queue);
    let last: Vec<PassKind> = plan.cameras.iter().filter_map(|c| c.passes.last().copied()).collect();
    assert_eq!(
        last,
        vec![
            PassKind::Blit {
                viewport: Viewport::FULL
            },
            PassKind::Blit { viewport: inset },
        ]
    );
}

#[test]
fn post_effects_run_just_before_the_blit() {
    let mut assets = Assets::new();
    let mut scene = populated_scene(&mut assets);
    let effects = PostEffects::OUTLINE | PostEffects::INVERT;
    for camera in scene.entities_with::<(Camera,)>() {
        scene.get_component_mut::<Camera>(camera).post_effects = effects;
    }
    let mut queue = SubmissionQueue::new();
    update(&mut scene, &assets, &mut queue);

    let plan = FramePlan::build(&queue);
    let passes = &plan.cameras[0].passes;
    assert_eq!(
        &passes[passes.len() - 3..],
        &[
            PassKind::AlphaBlend,
            PassKind::PostProcess { effects },
            PassKind::Blit {
                viewport: Viewport::FULL
            },
        ]
    );
}

#[test]
fn every_layout_fits_the_default_device_limits() {
    let limits = wgpu::Limits::default();
    for layout in FramebufferLayout::built_in() {
        assert!(layout.validate_formats().is_ok(), "{}", layout.name);
        let bytes = layout.colour_bytes_per_sample().unwrap();
        assert!(bytes <= limits.max_color_attachment_bytes_per_sample, "{}: {bytes}", layout.name);
        assert!(layout.colours.len() as u32 <= limits.max_color_attachments, "{}", layout.name);
    }
}

#[test]
fn shadow_slice_bounds_recover_near_and_far() {
    let camera = LocalToWorld::default();
    let (near, far) = (2.0, 30.0);
    for aspect in [1.0, 16.0 / 9.0] {
        let slice = ShadowBounds::perspective(Mat4::IDENTITY, &camera, near, far, aspect, 1.0);
        assert!((slice.bounds.centre.z + slice.near() - near).abs() < EPSILON);
        assert!((slice.bounds.centre.z + slice.far() - far).abs() < EPSILON);
        assert!(slice.near() < 0.0 && slice.far() > 0.0);

        let far_half_height = far * 0.5f32.tan();
        assert!((slice.height() - 2.0 * far_half_height).abs() < EPSILON);
        assert!((slice.width() - 2.0 * far_half_height * aspect).abs() < EPSILON);
    }

    // A rotated light sees the same slice expressed in its own space.
    let light_view = Mat4::from_quat(Quat::from_rotation_y(0.4));
    let slice = ShadowBounds::perspective(light_view, &camera, near, far, 1.0, 1.0);
    assert!(slice.far() > 0.0);
    assert!((slice.far() + slice.near()).abs() < EPSILON);
}

#[test]
fn lights_split_into_fixed_size_passes() {
    let lights: Vec<usize> = (0..LIGHTS_PER_PASS * 2 + 3).collect();
    let passes = light_passes(&lights, LIGHTS_PER_PASS);
    assert_eq!(passes.len(), 3);
    assert_eq!(passes.len(), light_pass_count(lights.len()));
    assert!(passes[..2].iter().all(|pass| pass.len() == LIGHTS_PER_PASS));
    assert_eq!(passes[2], &lights[LIGHTS_PER_PASS * 2..]);

    let none: Vec<usize> = Vec::new();
    let passes = light_passes(&none, LIGHTS_PER_PASS);
    assert_eq!(passes.len(), 1);
    assert!(passes[0].is_empty());
    assert_eq!(light_pass_count(0), 1);
}

#[test]
fn capped_lights_keep_submission_order_and_limit_shadows() {
    let mut queue = SubmissionQueue::new();
    queue.submit_camera(&LocalToWorld::default(), &Camera::default());
    for i in 0..10 {
        queue.submit_light(&LocalToWorld::default(), &Light::point(Vec3::ONE, i as f32 + 1.0));
    }

    let kept: Vec<f32> = queue.lights_capped(6).iter().map(|s| s.light.power()).collect();
    assert_eq!(kept, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(queue.lights().len(), 6);

    let plan = FramePlan::build(&queue);
    let shadowed = plan.shadow_slots.iter().flatten().count();
    assert_eq!(shadowed, MAX_SHADOW_LIGHTS);
    assert_eq!(plan.shadow_slots.len(), 6);
    assert!(plan.shadow_slots[MAX_SHADOW_LIGHTS..].iter().all(Option::is_none));
}
