use glam::{Quat, Vec2, Vec3};
use winit::keyboard::KeyCode;

use wgpu_deferred::asset::MeshBuilder;
use wgpu_deferred::ecs::{Component, EntityId, FnSystem, FrameContext, Scene};
use wgpu_deferred::event::Event;
use wgpu_deferred::renderer::{ForwardShader, Material, PixelFormat, PostEffects, Texture};
use wgpu_deferred::scene::{Camera, Light, Name, Renderable, Transform, Viewport};
use wgpu_deferred::{Result, SetupContext};

/// Rotates an entity about a local axis.
#[derive(Clone, Copy, Debug)]
pub struct Spin {
    pub axis: Vec3,
    pub speed: f32,
}

impl Component for Spin {}

/// Marks the camera whose post effects `P` cycles through.
#[derive(Clone, Copy, Debug)]
pub struct PostCycle {
    pub index: usize,
}

impl Component for PostCycle {}

const POST_CYCLE: [PostEffects; 5] = [
    PostEffects::FOG,
    PostEffects::FOG.union(PostEffects::OUTLINE),
    PostEffects::BLUR,
    PostEffects::GREYSCALE,
    PostEffects::INVERT,
];

const CHECKER_SIZE: u32 = 64;

fn checker_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
    for y in 0..CHECKER_SIZE {
        for x in 0..CHECKER_SIZE {
            let light = ((x / 8) + (y / 8)) % 2 == 0;
            let value = if light { 220 } else { 90 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    pixels
}

fn spawn(
    scene: &mut Scene,
    name: &str,
    transform: Transform,
    renderable: Option<Renderable>,
) -> EntityId {
    let entity = scene.create_entity();
    *scene.transform_mut(entity) = transform;
    scene.add_component(entity, Name::new(name));
    if let Some(renderable) = renderable {
        scene.add_component(entity, renderable);
    }
    entity
}

/// Ground plane, a grid of spinning deferred cubes, forward spheres, glass
/// panes, three kinds of light and a picture-in-picture camera.
pub fn showcase(ctx: &mut SetupContext) -> Result<()> {
    let assets = &mut *ctx.assets;
    let scene = &mut *ctx.scene;

    let plane = assets.add_mesh(ctx.device, &MeshBuilder::plane(40.0), "Plane");
    let cube = assets.add_mesh(ctx.device, &MeshBuilder::cube(), "Cube");
    let sphere = assets.add_mesh(ctx.device, &MeshBuilder::sphere(24, 32), "Sphere");

    let checker = Texture::from_pixels(
        ctx.device,
        ctx.queue,
        &checker_pixels(),
        CHECKER_SIZE,
        CHECKER_SIZE,
        PixelFormat::Rgba8Srgb,
        "Checker",
    )?;
    let checker = assets.textures.insert(checker);

    let ground = assets.add_material(
        Material::deferred()
            .with_diffuse_texture(checker)
            .with_uv_transform(Vec2::ZERO, Vec2::splat(8.0))
            .with_specular(Vec3::splat(0.1), 8.0),
    );
    spawn(scene, "Ground", Transform::IDENTITY, Some(Renderable::new(plane, ground)));

    for x in -2..=2 {
        for z in -2..=2 {
            let tint = Vec3::new(0.5 + x as f32 * 0.1, 0.6, 0.5 + z as f32 * 0.1);
            let material = assets.add_material(Material::deferred().with_diffuse(tint));
            let position = Vec3::new(x as f32 * 3.0, 1.0, z as f32 * 3.0);
            let entity = spawn(
                scene,
                "Cube",
                Transform::from_translation(position),
                Some(Renderable::new(cube, material)),
            );
            scene.add_component(
                entity,
                Spin {
                    axis: Vec3::Y,
                    speed: 0.5 + (x + z + 4) as f32 * 0.1,
                },
            );
        }
    }

    let shiny = assets.add_material(
        Material::forward(ForwardShader::Lit)
            .with_diffuse(Vec3::new(0.8, 0.2, 0.2))
            .with_specular(Vec3::ONE, 96.0),
    );
    let glow = assets.add_material(
        Material::forward(ForwardShader::Unlit).with_diffuse(Vec3::new(1.0, 0.9, 0.4)),
    );
    spawn(
        scene,
        "Shiny sphere",
        Transform::from_translation(Vec3::new(-8.0, 1.5, 0.0)).with_scale(Vec3::splat(1.5)),
        Some(Renderable::new(sphere, shiny)),
    );

    // The point light's bulb is a child of its orbiting pivot.
    let pivot = spawn(scene, "Lamp pivot", Transform::from_translation(Vec3::new(0.0, 4.0, 0.0)), None);
    scene.add_component(
        pivot,
        Spin {
            axis: Vec3::Y,
            speed: 0.8,
        },
    );
    let lamp = spawn(
        scene,
        "Lamp",
        Transform::from_translation(Vec3::new(6.0, 0.0, 0.0)).with_scale(Vec3::splat(0.3)),
        Some(Renderable::new(sphere, glow)),
    );
    scene.set_parent(lamp, pivot);
    scene.add_component(lamp, Light::point(Vec3::new(1.0, 0.8, 0.5), 20.0).with_shadow_distance(25.0));

    let glass = assets.add_material(Material::transparent(0.35).with_diffuse(Vec3::new(0.3, 0.6, 1.0)));
    for (index, x) in [-4.5f32, 4.5].into_iter().enumerate() {
        spawn(
            scene,
            &format!("Glass {index}"),
            Transform::from_translation(Vec3::new(x, 1.5, 7.0)).with_scale(Vec3::new(2.5, 3.0, 0.05)),
            Some(Renderable::new(cube, glass)),
        );
    }

    let sun = spawn(
        scene,
        "Sun",
        Transform::looking_at(Vec3::new(10.0, 20.0, 8.0), Vec3::ZERO),
        None,
    );
    scene.add_component(sun, Light::directional(Vec3::new(1.0, 0.95, 0.85), 0.8));

    let spot = spawn(
        scene,
        "Spot",
        Transform::looking_at(Vec3::new(-8.0, 8.0, 6.0), Vec3::new(-8.0, 0.0, 0.0)),
        None,
    );
    let mut spot_light = Light::spot(Vec3::new(0.4, 0.6, 1.0), 30.0, 25f32.to_radians(), 40f32.to_radians());
    spot_light.set_attenuation(1.0, 0.05, 0.01);
    scene.add_component(spot, spot_light);

    let main_camera = spawn(
        scene,
        "Main camera",
        Transform::looking_at(Vec3::new(0.0, 9.0, 20.0), Vec3::new(0.0, 1.0, 0.0)),
        None,
    );
    let mut camera = Camera {
        aspect: ctx.aspect_ratio,
        post_effects: POST_CYCLE[0],
        ..Camera::default()
    };
    camera.skybox.colour = Vec3::new(0.35, 0.5, 0.75);
    scene.add_component(main_camera, camera);
    scene.add_component(main_camera, PostCycle { index: 0 });

    let overhead = spawn(
        scene,
        "Overhead camera",
        Transform::looking_at(Vec3::new(0.0, 30.0, 0.1), Vec3::ZERO),
        None,
    );
    let viewport = Viewport::new(0.72, 0.72, 0.98, 0.98);
    let overhead_camera = Camera {
        depth: 1,
        aspect: viewport_aspect(viewport, ctx.aspect_ratio),
        viewport,
        post_effects: PostEffects::OUTLINE,
        ..Camera::default()
    };
    scene.add_component(overhead, overhead_camera);

    scene.add_system(Box::new(FnSystem::new("spin", spin)));
    scene.add_system(Box::new(FnSystem::new("camera_aspect", camera_aspect)));
    scene.add_system(Box::new(FnSystem::new("cycle_post_effects", cycle_post_effects)));
    scene.add_system(Box::new(FnSystem::new("quit_on_escape", quit_on_escape)));
    Ok(())
}

fn viewport_aspect(viewport: Viewport, window_aspect: f32) -> f32 {
    let width = (viewport.top_x - viewport.bottom_x).abs().max(f32::EPSILON);
    let height = (viewport.top_y - viewport.bottom_y).abs().max(f32::EPSILON);
    window_aspect * width / height
}

fn spin(scene: &mut Scene, ctx: &mut FrameContext) {
    for entity in scene.entities_with::<(Spin,)>() {
        let spin = *scene.get_component::<Spin>(entity);
        scene
            .transform_mut(entity)
            .rotate(Quat::from_axis_angle(spin.axis, spin.speed * ctx.dt));
    }
}

fn camera_aspect(scene: &mut Scene, ctx: &mut FrameContext) {
    let Some((width, height)) = ctx.events.iter().rev().find_map(|event| match event {
        Event::Resized { width, height } if *width > 0 && *height > 0 => Some((*width, *height)),
        _ => None,
    }) else {
        return;
    };
    let window_aspect = width as f32 / height as f32;
    for entity in scene.entities_with::<(Camera,)>() {
        let camera = scene.get_component_mut::<Camera>(entity);
        camera.aspect = viewport_aspect(camera.viewport, window_aspect);
    }
}

fn cycle_post_effects(scene: &mut Scene, ctx: &mut FrameContext) {
    if !ctx.events.iter().any(|event| event.is_key_pressed(KeyCode::KeyP)) {
        return;
    }
    for entity in scene.entities_with::<(Camera, PostCycle)>() {
        let index = (scene.get_component::<PostCycle>(entity).index + 1) % POST_CYCLE.len();
        scene.get_component_mut::<PostCycle>(entity).index = index;
        scene.get_component_mut::<Camera>(entity).post_effects = POST_CYCLE[index];
        log::info!("Post effects: {:?}", POST_CYCLE[index]);
    }
}

fn quit_on_escape(_scene: &mut Scene, ctx: &mut FrameContext) {
    if ctx.events.iter().any(|event| event.is_key_pressed(KeyCode::Escape)) {
        ctx.request_quit();
    }
}
