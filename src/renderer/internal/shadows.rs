use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::asset::Assets;
use crate::renderer::instance::DrawBatch;
use crate::renderer::internal::materials::MaterialBindings;
use crate::renderer::internal::pipelines::BindGroupLayouts;
use crate::renderer::shadow::{LightShadow, ShadowMatricesUniform, CUBE_FACES, MAX_SHADOW_LIGHTS, SHADOW_MATRIX_COUNT};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ShadowViewUniform {
    view_proj: [[f32; 4]; 4],
}

const VIEW_UNIFORM_SIZE: u64 = mem::size_of::<ShadowViewUniform>() as u64;

struct ShadowArray {
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
}

impl ShadowArray {
    fn new(device: &wgpu::Device, label: &str, layers: u32, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}ArrayView")),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            array_layer_count: Some(layers),
            ..Default::default()
        });

        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}Layer{layer}")),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        Self {
            array_view,
            layer_views,
        }
    }

    fn layer_view(&self, index: usize) -> Option<&wgpu::TextureView> {
        let view = self.layer_views.get(index);
        if view.is_none() {
            log::warn!("Shadow layer {} out of range ({} layers)", index, self.layer_views.len());
        }
        view
    }
}

/// What a shadow pass draws: every bucket's batches against instances built
/// with an identity view.
pub(crate) struct ShadowCasters<'a> {
    pub(crate) instances: &'a wgpu::Buffer,
    pub(crate) batches: &'a [DrawBatch],
    pub(crate) assets: &'a Assets,
    pub(crate) materials: &'a MaterialBindings,
}

/// Depth arrays for every shadow slot. Directional and spot lights use one
/// layer of the planar array at their slot; point lights use six layers of
/// the point array starting at `slot * 6`, at half resolution.
pub(crate) struct ShadowResources {
    planar: ShadowArray,
    point: ShadowArray,
    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    staging_buffer: wgpu::Buffer,
    matrices_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ShadowResources {
    pub(crate) fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, shadow_map_size: u32) -> Self {
        let planar = ShadowArray::new(
            device,
            "PlanarShadowMap",
            MAX_SHADOW_LIGHTS as u32,
            shadow_map_size,
        );
        let point = ShadowArray::new(
            device,
            "PointShadowMap",
            SHADOW_MATRIX_COUNT as u32,
            (shadow_map_size / 2).max(1),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowViewBuffer"),
            size: VIEW_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ShadowViewBindGroup"),
            layout: &layouts.shadow_view,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        // One matrix per slot face; each pass copies its own into the view buffer.
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowStagingBuffer"),
            size: VIEW_UNIFORM_SIZE * SHADOW_MATRIX_COUNT as u64,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let matrices_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowMatricesBuffer"),
            size: mem::size_of::<ShadowMatricesUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ShadowsBindGroup"),
            layout: &layouts.shadows,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: matrices_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&planar.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&point.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        log::info!(
            "Created shadow maps: {} planar layers at {}, {} point layers at {}",
            MAX_SHADOW_LIGHTS,
            shadow_map_size,
            SHADOW_MATRIX_COUNT,
            (shadow_map_size / 2).max(1)
        );

        Self {
            planar,
            point,
            view_buffer,
            view_bind_group,
            staging_buffer,
            matrices_buffer,
            bind_group,
        }
    }

    /// Matrices, both depth arrays and the comparison sampler.
    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub(crate) fn write_matrices(&self, queue: &wgpu::Queue, matrices: &ShadowMatricesUniform) {
        queue.write_buffer(&self.matrices_buffer, 0, bytemuck::bytes_of(matrices));
    }

    /// Records one depth pass per face of every shadow. Staging writes land
    /// before the encoder's submit, so the encoder must be submitted before
    /// the same slots are written again. Returns the draw calls recorded.
    pub(crate) fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        shadows: &[(u32, LightShadow)],
        casters: &ShadowCasters,
    ) -> usize {
        let mut draw_calls = 0;
        for (slot, shadow) in shadows {
            for (face, matrix) in shadow.faces().iter().enumerate() {
                let index = *slot as usize * CUBE_FACES + face;
                let target = match shadow {
                    LightShadow::Point(_) => self.point.layer_view(index),
                    LightShadow::Directional(_) | LightShadow::Spot(_) => {
                        self.planar.layer_view(*slot as usize)
                    }
                };
                let Some(target) = target else {
                    continue;
                };

                let offset = index as u64 * VIEW_UNIFORM_SIZE;
                queue.write_buffer(&self.staging_buffer, offset, bytemuck::bytes_of(&view_uniform(*matrix)));
                encoder.copy_buffer_to_buffer(&self.staging_buffer, offset, &self.view_buffer, 0, VIEW_UNIFORM_SIZE);

                draw_calls += self.render_pass(encoder, pipeline, target, casters);
            }
        }
        draw_calls
    }

    fn render_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        target: &wgpu::TextureView,
        casters: &ShadowCasters,
    ) -> usize {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ShadowPass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.view_bind_group, &[]);
        pass.set_vertex_buffer(1, casters.instances.slice(..));

        let mut draw_calls = 0;
        for batch in casters.batches {
            let (Some(mesh), Some(material)) = (
                casters.assets.meshes.get(batch.mesh),
                casters.materials.bind_group(batch.material),
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
}

fn view_uniform(matrix: Mat4) -> ShadowViewUniform {
    ShadowViewUniform {
        view_proj: matrix.to_cols_array_2d(),
    }
}
