// renderer/renderer.rs
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use glam::Mat4;
use winit::{dpi::PhysicalSize, window::Window};

use crate::asset::{Assets, Handle, Mesh, MeshBuilder};
use crate::error::Result;
use crate::renderer::instance::{pack_bucket, DrawBatch, InstanceRaw};
use crate::renderer::internal::{
    FrameTargets, InstanceBuffer, MaterialBindings, Pipelines, RenderContext, ShadowCasters,
    ShadowResources, UniformBinding,
};
use crate::renderer::lights::{light_pass_count, light_passes, LightRaw, LightsUniform, LIGHTS_PER_PASS};
use crate::renderer::material::RenderPath;
use crate::renderer::passes::{CameraPlan, FramePlan, PassKind};
use crate::renderer::post::{final_source, post_chain, PostEffects, PostSource, PostUniform};
use crate::renderer::queue::{LightSubmission, SubmissionQueue};
use crate::renderer::shadow::{
    directional_shadow_matrix, point_shadow_matrices, spot_shadow_matrix, LightShadow,
    ShadowMatricesUniform,
};
use crate::renderer::uniforms::{CameraUniform, SkyboxUniform};
use crate::renderer::Texture;
use crate::scene::{LightMode, Viewport};
use crate::settings::RenderSettings;

const INITIAL_INSTANCE_CAPACITY: usize = 1024;

/// Counters of the last rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub cameras: usize,
    pub lights: usize,
    pub passes: usize,
    pub draw_calls: usize,
    pub instances: usize,
}

/// Per-camera draw lists, one per render path.
struct CameraDraws {
    deferred: Vec<DrawBatch>,
    forward: Vec<DrawBatch>,
    transparent: Vec<DrawBatch>,
}

pub struct Renderer {
    context: RenderContext,
    pipelines: Pipelines,
    targets: FrameTargets,
    shadows: ShadowResources,
    materials: MaterialBindings,
    camera: UniformBinding,
    light_bindings: Vec<UniformBinding>,
    post_params: UniformBinding,
    skybox_uniform: wgpu::Buffer,
    skybox_bind_groups: HashMap<Option<Handle<Texture>>, wgpu::BindGroup>,
    blank_cubemap: Texture,
    skybox_mesh: Mesh,
    camera_instances: InstanceBuffer,
    shadow_instances: InstanceBuffer,
    blit_sampler: wgpu::Sampler,
    settings: RenderSettings,
    stats: RendererStats,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, settings: RenderSettings) -> Result<Self> {
        let context = RenderContext::new(window, &settings).await?;
        let device = &context.device;

        let pipelines = Pipelines::new(device, context.config.format)?;
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("BlitSampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let targets = FrameTargets::new(
            device,
            &pipelines.layouts,
            &blit_sampler,
            context.width(),
            context.height(),
        )?;
        let shadows = ShadowResources::new(device, &pipelines.layouts, settings.shadow_map_size);
        let materials = MaterialBindings::new(device, &context.queue);

        let camera = UniformBinding::new::<CameraUniform>(device, &pipelines.layouts.camera, "CameraUniform");
        let light_bindings = (0..light_pass_count(settings.max_lights))
            .map(|pass| {
                UniformBinding::new::<LightsUniform>(
                    device,
                    &pipelines.layouts.lights,
                    &format!("LightsUniform{pass}"),
                )
            })
            .collect();
        let post_params = UniformBinding::new::<PostUniform>(device, &pipelines.layouts.post_params, "PostUniform");

        let skybox_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SkyboxUniform"),
            size: std::mem::size_of::<SkyboxUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let blank_cubemap = Texture::blank_cubemap(device, &context.queue);
        let skybox_mesh = Mesh::new(device, &MeshBuilder::skybox(), "SkyboxMesh");

        let camera_instances = InstanceBuffer::new(device, "CameraInstances", INITIAL_INSTANCE_CAPACITY);
        let shadow_instances = InstanceBuffer::new(device, "ShadowInstances", INITIAL_INSTANCE_CAPACITY);

        Ok(Self {
            context,
            pipelines,
            targets,
            shadows,
            materials,
            camera,
            light_bindings,
            post_params,
            skybox_uniform,
            skybox_bind_groups: HashMap::new(),
            blank_cubemap,
            skybox_mesh,
            camera_instances,
            shadow_instances,
            blit_sampler,
            settings,
            stats: RendererStats::default(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.width() as f32 / self.context.height().max(1) as f32
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.context.config.format
    }

    /// Reconfigures the surface and reallocates every framebuffer. A zero
    /// size (minimised window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.context.resize(PhysicalSize::new(width, height)) {
            return Ok(());
        }
        self.targets = FrameTargets::new(
            &self.context.device,
            &self.pipelines.layouts,
            &self.blit_sampler,
            self.context.width(),
            self.context.height(),
        )?;
        Ok(())
    }

    /// Renders everything queued this frame and presents it. The queue is
    /// cleared afterwards whether or not the frame made it to the screen.
    pub fn render(&mut self, queue: &mut SubmissionQueue, assets: &Assets) -> Result<()> {
        let result = self.render_frame(queue, assets);
        queue.clear();
        result
    }

    fn render_frame(&mut self, queue: &mut SubmissionQueue, assets: &Assets) -> Result<()> {
        queue.lights_capped(self.settings.max_lights);
        let plan = FramePlan::build(queue);
        let mut stats = RendererStats {
            cameras: plan.cameras.len(),
            lights: queue.lights().len(),
            ..RendererStats::default()
        };
        if plan.is_empty() {
            self.stats = stats;
            return Ok(());
        }

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring the surface texture, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let material_handles: BTreeSet<_> = [RenderPath::Deferred, RenderPath::Forward, RenderPath::Transparent]
            .into_iter()
            .flat_map(|path| queue.bucket(path).keys().copied())
            .collect();
        self.materials.prepare(
            &self.context.device,
            &self.context.queue,
            &self.pipelines.layouts.material,
            assets,
            material_handles,
        );

        // Shadow casters are view independent: model matrices only.
        let mut shadow_instances = Vec::new();
        let shadow_batches: Vec<DrawBatch> = [RenderPath::Deferred, RenderPath::Forward, RenderPath::Transparent]
            .into_iter()
            .flat_map(|path| pack_bucket(queue.bucket(path), Mat4::IDENTITY, &mut shadow_instances))
            .collect();
        self.shadow_instances
            .upload(&self.context.device, &self.context.queue, &shadow_instances);

        let lights = queue.lights();
        let mut matrices = ShadowMatricesUniform::new();
        let shared = self.shared_shadows(lights, &plan.shadow_slots);
        for (slot, shadow) in &shared {
            matrices.set(*slot, shadow);
        }

        if plan.shared_shadows {
            let mut encoder = self
                .context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("SharedShadowEncoder"),
                });
            stats.draw_calls += self.shadows.encode(
                &self.context.queue,
                &mut encoder,
                &self.pipelines.shadow,
                &shared,
                &self.shadow_casters(&shadow_batches, assets),
            );
            stats.passes += 1;
            self.context.queue.submit(Some(encoder.finish()));
        }

        for (index, camera_plan) in plan.cameras.iter().enumerate() {
            self.render_camera(
                camera_plan,
                index == 0,
                queue,
                &plan.shadow_slots,
                &mut matrices,
                assets,
                &shadow_batches,
                &surface_view,
                &mut stats,
            );
        }

        frame.present();
        log::trace!(
            "Frame: {} cameras, {} lights, {} passes, {} draw calls, {} instances",
            stats.cameras,
            stats.lights,
            stats.passes,
            stats.draw_calls,
            stats.instances
        );
        self.stats = stats;
        Ok(())
    }

    /// Spot and point light matrices, shared by every camera.
    fn shared_shadows(&self, lights: &[LightSubmission], slots: &[Option<u32>]) -> Vec<(u32, LightShadow)> {
        let near = self.settings.shadow_near;
        lights
            .iter()
            .zip(slots)
            .filter_map(|(submission, slot)| {
                let slot = (*slot)?;
                let shadow = match submission.light.mode {
                    LightMode::Spot => LightShadow::Spot(spot_shadow_matrix(
                        &submission.transform,
                        &submission.light,
                        near,
                    )),
                    LightMode::Point => LightShadow::Point(point_shadow_matrices(
                        submission.transform.position,
                        &submission.light,
                        near,
                    )),
                    LightMode::Directional => return None,
                };
                Some((slot, shadow))
            })
            .collect()
    }

    fn shadow_casters<'a>(&'a self, batches: &'a [DrawBatch], assets: &'a Assets) -> ShadowCasters<'a> {
        ShadowCasters {
            instances: &self.shadow_instances.buffer,
            batches,
            assets,
            materials: &self.materials,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_camera(
        &mut self,
        plan: &CameraPlan,
        first: bool,
        queue: &SubmissionQueue,
        shadow_slots: &[Option<u32>],
        matrices: &mut ShadowMatricesUniform,
        assets: &Assets,
        shadow_batches: &[DrawBatch],
        surface_view: &wgpu::TextureView,
        stats: &mut RendererStats,
    ) {
        let gpu = &self.context.queue;
        let submission = &plan.camera;
        let view = submission.transform.view_matrix();
        self.camera
            .write(gpu, &CameraUniform::from_camera(&submission.transform, &submission.camera));

        let lights = queue.lights();
        let raws: Vec<LightRaw> = lights
            .iter()
            .zip(shadow_slots)
            .map(|(light, slot)| LightRaw::from_submission(light, view, *slot))
            .collect();
        for (pass, chunk) in light_passes(&raws, LIGHTS_PER_PASS).iter().enumerate() {
            if let Some(binding) = self.light_bindings.get(pass) {
                binding.write(gpu, &LightsUniform::new(pass, self.settings.ambient(), chunk));
            }
        }

        let directional: Vec<(u32, LightShadow)> = lights
            .iter()
            .zip(shadow_slots)
            .filter(|(light, _)| light.light.mode == LightMode::Directional)
            .filter_map(|(light, slot)| {
                let slot = (*slot)?;
                let matrix = directional_shadow_matrix(
                    &light.transform,
                    &light.light,
                    &submission.transform,
                    &submission.camera,
                );
                Some((slot, LightShadow::Directional(matrix)))
            })
            .collect();
        for (slot, shadow) in &directional {
            matrices.set(*slot, shadow);
        }
        self.shadows.write_matrices(gpu, matrices);

        let mut instances: Vec<InstanceRaw> = Vec::new();
        let draws = CameraDraws {
            deferred: pack_bucket(queue.bucket(RenderPath::Deferred), view, &mut instances),
            forward: pack_bucket(queue.bucket(RenderPath::Forward), view, &mut instances),
            transparent: pack_bucket(queue.bucket(RenderPath::Transparent), view, &mut instances),
        };
        stats.instances += instances.len();
        self.camera_instances
            .upload(&self.context.device, &self.context.queue, &instances);

        let skybox = &submission.camera.skybox;
        let cubemap = skybox.cubemap.filter(|handle| assets.textures.get(*handle).is_some());
        self.context.queue.write_buffer(
            &self.skybox_uniform,
            0,
            bytemuck::bytes_of(&SkyboxUniform::new(skybox, cubemap.is_some())),
        );
        self.ensure_skybox_bind_group(cubemap, assets);

        let post_effects = submission.camera.post_effects;
        if !post_effects.is_empty() {
            self.post_params.write(
                &self.context.queue,
                &PostUniform::new(&submission.camera, self.context.width(), self.context.height()),
            );
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("CameraEncoder"),
            });

        let light_pass_total = light_pass_count(lights.len()).min(self.light_bindings.len());
        for pass in &plan.passes {
            let draw_calls = match *pass {
                PassKind::SharedShadows => 0,
                PassKind::DirectionalShadows => self.shadows.encode(
                    &self.context.queue,
                    &mut encoder,
                    &self.pipelines.shadow,
                    &directional,
                    &self.shadow_casters(shadow_batches, assets),
                ),
                PassKind::Geometry => self.geometry_pass(&mut encoder, &draws.deferred, assets),
                PassKind::Lighting { passes } => {
                    self.lighting_pass(&mut encoder, passes.min(self.light_bindings.len()))
                }
                PassKind::Forward => {
                    self.targets.copy_deferred_into_forward(&mut encoder);
                    self.forward_pass(&mut encoder, &draws.forward, assets, light_pass_total)
                }
                PassKind::Skybox => self.skybox_pass(&mut encoder, cubemap),
                PassKind::AlphaWeight => self.alpha_weight_pass(&mut encoder, &draws.transparent, assets),
                PassKind::AlphaBlend => self.alpha_blend_pass(&mut encoder),
                PassKind::PostProcess { effects } => self.post_process_pass(&mut encoder, effects),
                PassKind::Blit { viewport } => self.blit_pass(
                    &mut encoder,
                    surface_view,
                    viewport,
                    final_source(post_effects),
                    first,
                ),
            };
            stats.draw_calls += draw_calls;
            stats.passes += 1;
        }

        self.context.queue.submit(Some(encoder.finish()));
    }

    fn ensure_skybox_bind_group(&mut self, cubemap: Option<Handle<Texture>>, assets: &Assets) {
        if self.skybox_bind_groups.contains_key(&cubemap) {
            return;
        }
        let texture = cubemap
            .and_then(|handle| assets.textures.get(handle))
            .unwrap_or(&self.blank_cubemap);
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SkyboxBindGroup"),
                layout: &self.pipelines.layouts.skybox,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.skybox_uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ],
            });
        self.skybox_bind_groups.insert(cubemap, bind_group);
    }

    fn draw_batches(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        batches: &[DrawBatch],
        assets: &Assets,
    ) -> usize {
        let mut draw_calls = 0;
        for batch in batches {
            let (Some(mesh), Some(material)) = (
                assets.meshes.get(batch.mesh),
                self.materials.bind_group(batch.material),
            ) else {
                continue;
            };
            pass.set_bind_group(1, material, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
            pass.set_index_buffer(mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count(), 0, batch.instances());
            draw_calls += 1;
        }
        draw_calls
    }

    fn geometry_pass(&self, encoder: &mut wgpu::CommandEncoder, batches: &[DrawBatch], assets: &Assets) -> usize {
        let gbuffer = &self.targets.gbuffer;
        // Position w = 0 marks pixels no geometry covered.
        let colour_attachments = gbuffer.colour_attachments(|_| wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GeometryPass"),
            color_attachments: &colour_attachments,
            depth_stencil_attachment: Some(depth_attachment(gbuffer.view("depth"), wgpu::LoadOp::Clear(1.0))),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.geometry);
        pass.set_bind_group(0, &self.camera.bind_group, &[]);
        pass.set_vertex_buffer(1, self.camera_instances.buffer.slice(..));
        self.draw_batches(&mut pass, batches, assets)
    }

    fn lighting_pass(&self, encoder: &mut wgpu::CommandEncoder, passes: usize) -> usize {
        for (index, lights) in self.light_bindings.iter().take(passes).enumerate() {
            let load = if index == 0 {
                wgpu::LoadOp::Clear(wgpu::Color::BLACK)
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("LightingPass"),
                color_attachments: &self.targets.lbuffer.colour_attachments(|_| load),
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.lighting);
            pass.set_bind_group(0, &self.camera.bind_group, &[]);
            pass.set_bind_group(1, &self.targets.gbuffer_bind_group, &[]);
            pass.set_bind_group(2, &lights.bind_group, &[]);
            pass.set_bind_group(3, self.shadows.bind_group(), &[]);
            pass.draw(0..3, 0..1);
        }
        passes
    }

    fn forward_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        batches: &[DrawBatch],
        assets: &Assets,
        light_passes: usize,
    ) -> usize {
        let forward = &self.targets.forward;
        let colour_attachments = forward.load_attachments();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ForwardPass"),
            color_attachments: &colour_attachments,
            depth_stencil_attachment: Some(depth_attachment(forward.view("depth"), wgpu::LoadOp::Load)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        if batches.is_empty() {
            return 0;
        }

        pass.set_bind_group(0, &self.camera.bind_group, &[]);
        pass.set_bind_group(3, self.shadows.bind_group(), &[]);
        pass.set_vertex_buffer(1, self.camera_instances.buffer.slice(..));

        let mut draw_calls = 0;
        for (index, lights) in self.light_bindings.iter().take(light_passes.max(1)).enumerate() {
            let pipeline = if index == 0 {
                &self.pipelines.forward_base
            } else {
                &self.pipelines.forward_add
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(2, &lights.bind_group, &[]);
            draw_calls += self.draw_batches(&mut pass, batches, assets);
        }
        draw_calls
    }

    fn skybox_pass(&self, encoder: &mut wgpu::CommandEncoder, cubemap: Option<Handle<Texture>>) -> usize {
        let Some(skybox) = self.skybox_bind_groups.get(&cubemap) else {
            return 0;
        };
        let forward = &self.targets.forward;
        let colour_attachments = forward.load_attachments();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("SkyboxPass"),
            color_attachments: &colour_attachments,
            depth_stencil_attachment: Some(depth_attachment(forward.view("depth"), wgpu::LoadOp::Load)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.skybox);
        pass.set_bind_group(0, &self.camera.bind_group, &[]);
        pass.set_bind_group(1, skybox, &[]);
        pass.set_vertex_buffer(0, self.skybox_mesh.vertex_buffer().slice(..));
        pass.set_index_buffer(self.skybox_mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.skybox_mesh.index_count(), 0, 0..1);
        1
    }

    fn alpha_weight_pass(&self, encoder: &mut wgpu::CommandEncoder, batches: &[DrawBatch], assets: &Assets) -> usize {
        let Some(lights) = self.light_bindings.first() else {
            return 0;
        };
        let colour_attachments = self.targets.alpha.colour_attachments(|desc| {
            let clear = if desc.name == "revealage" {
                wgpu::Color {
                    r: 1.0,
                    g: 0.0,
                    b: 0.0,
                    a: 0.0,
                }
            } else {
                wgpu::Color::TRANSPARENT
            };
            wgpu::LoadOp::Clear(clear)
        });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("AlphaWeightPass"),
            color_attachments: &colour_attachments,
            depth_stencil_attachment: Some(depth_attachment(
                self.targets.forward.view("depth"),
                wgpu::LoadOp::Load,
            )),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.alpha_weight);
        pass.set_bind_group(0, &self.camera.bind_group, &[]);
        pass.set_bind_group(2, &lights.bind_group, &[]);
        pass.set_vertex_buffer(1, self.camera_instances.buffer.slice(..));
        self.draw_batches(&mut pass, batches, assets)
    }

    fn alpha_blend_pass(&self, encoder: &mut wgpu::CommandEncoder) -> usize {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("AlphaBlendPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.targets.forward.view("composite"),
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.alpha_blend);
        pass.set_bind_group(0, &self.targets.alpha_bind_group, &[]);
        pass.draw(0..3, 0..1);
        1
    }

    fn post_process_pass(&self, encoder: &mut wgpu::CommandEncoder, effects: PostEffects) -> usize {
        let mut draw_calls = 0;
        for step in post_chain(effects) {
            let (Some(pipeline), Some(input)) = (
                self.pipelines.post_effect(step.effect),
                self.targets.post_input_bind_groups.get(step.source.index()),
            ) else {
                log::warn!("No pipeline for post effect {:?}", step.effect);
                continue;
            };
            let colour_attachments =
                self.targets.post[step.target].colour_attachments(|_| wgpu::LoadOp::Clear(wgpu::Color::BLACK));
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("PostProcessPass"),
                color_attachments: &colour_attachments,
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.post_params.bind_group, &[]);
            pass.set_bind_group(1, input, &[]);
            pass.draw(0..3, 0..1);
            draw_calls += 1;
        }
        draw_calls
    }

    fn blit_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        viewport: Viewport,
        source: PostSource,
        first: bool,
    ) -> usize {
        let Some(source) = self.targets.blit_bind_groups.get(source.index()) else {
            return 0;
        };
        let load = if first {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        } else {
            wgpu::LoadOp::Load
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("BlitPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let [x, y, width, height] = viewport.pixel_rect(self.context.width(), self.context.height());
        pass.set_viewport(x, y, width, height, 0.0, 1.0);
        pass.set_pipeline(&self.pipelines.blit);
        pass.set_bind_group(0, source, &[]);
        pass.draw(0..3, 0..1);
        1
    }
}

fn depth_attachment(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<f32>,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}
