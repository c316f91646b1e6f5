use crate::error::{RenderError, Result};
use crate::renderer::framebuffer::{FramebufferLayout, PixelFormat};
use crate::renderer::instance::InstanceRaw;
use crate::renderer::pipeline_builder::{ADDITIVE_BLEND, RESOLVE_BLEND, REVEALAGE_BLEND};
use crate::renderer::post::PostEffects;
use crate::renderer::{PipelineBuilder, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// Shared WGSL prepended to the programs that need it.
const COMMON: &str = include_str!("../../shader/common.wgsl");
const MATERIAL: &str = include_str!("../../shader/material.wgsl");
const SHADING: &str = include_str!("../../shader/shading.wgsl");
const SHADOWS: &str = include_str!("../../shader/shadows.wgsl");
const POST: &str = include_str!("../../shader/post.wgsl");

/// Fragment program of every post effect, each composed after `POST`.
const POST_EFFECT_SHADERS: [(PostEffects, &str, &str); 5] = [
    (PostEffects::FOG, "PostFogShader", include_str!("../../shader/post_fog.wgsl")),
    (PostEffects::OUTLINE, "PostOutlineShader", include_str!("../../shader/post_outline.wgsl")),
    (PostEffects::BLUR, "PostBlurShader", include_str!("../../shader/post_blur.wgsl")),
    (PostEffects::GREYSCALE, "PostGreyscaleShader", include_str!("../../shader/post_greyscale.wgsl")),
    (PostEffects::INVERT, "PostInvertShader", include_str!("../../shader/post_invert.wgsl")),
];

/// Every bind group layout of the frame, shared by the pipelines below and
/// by the bind groups the renderer builds against them.
pub(crate) struct BindGroupLayouts {
    pub(crate) camera: wgpu::BindGroupLayout,
    pub(crate) material: wgpu::BindGroupLayout,
    pub(crate) gbuffer: wgpu::BindGroupLayout,
    pub(crate) lights: wgpu::BindGroupLayout,
    pub(crate) shadows: wgpu::BindGroupLayout,
    pub(crate) shadow_view: wgpu::BindGroupLayout,
    pub(crate) skybox: wgpu::BindGroupLayout,
    pub(crate) alpha: wgpu::BindGroupLayout,
    pub(crate) post_params: wgpu::BindGroupLayout,
    pub(crate) post_input: wgpu::BindGroupLayout,
    pub(crate) blit: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("CameraBindGroupLayout"),
            entries: &[uniform_entry(0, stages)],
        });

        // Uniform, diffuse, normal, specular, gloss, displacement, sampler.
        // Displacement is read in the vertex stage.
        let mut material_entries = vec![uniform_entry(0, stages)];
        material_entries.extend((1..=5).map(|binding| {
            texture_entry(binding, stages, wgpu::TextureSampleType::Float { filterable: true })
        }));
        material_entries.push(sampler_entry(6, stages, wgpu::SamplerBindingType::Filtering));
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MaterialBindGroupLayout"),
            entries: &material_entries,
        });

        let gbuffer_entries: Vec<_> = (0..FramebufferLayout::gbuffer().colours.len() as u32)
            .map(|binding| {
                texture_entry(
                    binding,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::TextureSampleType::Float { filterable: false },
                )
            })
            .collect();
        let gbuffer = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GBufferBindGroupLayout"),
            entries: &gbuffer_entries,
        });

        let lights = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("LightsBindGroupLayout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });

        let depth_array = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2Array,
                multisampled: false,
            },
            count: None,
        };
        let shadows = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowsBindGroupLayout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                depth_array(1),
                depth_array(2),
                sampler_entry(3, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Comparison),
            ],
        });

        let shadow_view = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowViewBindGroupLayout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let skybox = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SkyboxBindGroupLayout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let alpha = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("AlphaResolveBindGroupLayout"),
            entries: &[
                texture_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::TextureSampleType::Float { filterable: false },
                ),
                texture_entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::TextureSampleType::Float { filterable: false },
                ),
            ],
        });

        let post_params = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PostParamsBindGroupLayout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });

        // Image being processed, forward position, normal and depth, sampler.
        let unfiltered = wgpu::TextureSampleType::Float { filterable: false };
        let post_input = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PostInputBindGroupLayout"),
            entries: &[
                texture_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::TextureSampleType::Float { filterable: true },
                ),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, unfiltered),
                texture_entry(2, wgpu::ShaderStages::FRAGMENT, unfiltered),
                texture_entry(3, wgpu::ShaderStages::FRAGMENT, wgpu::TextureSampleType::Depth),
                sampler_entry(4, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
            ],
        });

        Self {
            camera,
            material,
            gbuffer,
            lights,
            shadows,
            shadow_view,
            skybox,
            alpha,
            post_params,
            post_input,
            blit: blit_bind_group_layout(device),
        }
    }
}

/// Texture plus filtering sampler, read by the full-screen blit.
pub(crate) fn blit_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("BlitBindGroupLayout"),
        entries: &[
            texture_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                wgpu::TextureSampleType::Float { filterable: true },
            ),
            sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
        ],
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    sample_type: wgpu::TextureSampleType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Compiles WGSL inside a validation error scope so a broken shader is
/// reported as an error instead of a device panic.
pub(crate) fn shader_module(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(RenderError::Shader {
            label,
            message: error.to_string(),
        }),
        None => Ok(module),
    }
}

pub(crate) struct Pipelines {
    pub(crate) layouts: BindGroupLayouts,
    pub(crate) geometry: wgpu::RenderPipeline,
    pub(crate) lighting: wgpu::RenderPipeline,
    pub(crate) forward_base: wgpu::RenderPipeline,
    pub(crate) forward_add: wgpu::RenderPipeline,
    pub(crate) skybox: wgpu::RenderPipeline,
    pub(crate) alpha_weight: wgpu::RenderPipeline,
    pub(crate) alpha_blend: wgpu::RenderPipeline,
    pub(crate) shadow: wgpu::RenderPipeline,
    pub(crate) post: Vec<(PostEffects, wgpu::RenderPipeline)>,
    pub(crate) blit: wgpu::RenderPipeline,
}

impl Pipelines {
    /// Builds every pipeline inside a validation error scope, so a target
    /// set the device cannot render to is reported instead of panicking.
    pub(crate) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self> {
        for layout in FramebufferLayout::built_in() {
            layout.validate_formats()?;
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipelines = Self::build(device, surface_format);
        let error = pollster::block_on(device.pop_error_scope());
        let pipelines = pipelines?;
        match error {
            Some(error) => Err(RenderError::Pipeline(error.to_string())),
            None => {
                log::info!("Render pipelines created");
                Ok(pipelines)
            }
        }
    }

    pub(crate) fn post_effect(&self, effect: PostEffects) -> Option<&wgpu::RenderPipeline> {
        self.post
            .iter()
            .find(|(candidate, _)| *candidate == effect)
            .map(|(_, pipeline)| pipeline)
    }

    fn build(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self> {
        let layouts = BindGroupLayouts::new(device);
        let pipeline_layout = |label: &str, groups: &[&wgpu::BindGroupLayout]| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: groups,
                push_constant_ranges: &[],
            })
        };

        let geometry_shader = shader_module(
            device,
            "GeometryShader",
            &compose(&[COMMON, MATERIAL, include_str!("../../shader/geometry.wgsl")]),
        )?;
        let lighting_shader = shader_module(
            device,
            "LightingShader",
            &compose(&[COMMON, SHADING, SHADOWS, include_str!("../../shader/lighting.wgsl")]),
        )?;
        let forward_shader = shader_module(
            device,
            "ForwardShader",
            &compose(&[COMMON, MATERIAL, SHADING, SHADOWS, include_str!("../../shader/forward.wgsl")]),
        )?;
        let skybox_shader = shader_module(
            device,
            "SkyboxShader",
            &compose(&[COMMON, include_str!("../../shader/skybox.wgsl")]),
        )?;
        let alpha_weight_shader = shader_module(
            device,
            "AlphaWeightShader",
            &compose(&[COMMON, MATERIAL, SHADING, include_str!("../../shader/alpha_weight.wgsl")]),
        )?;
        let alpha_blend_shader =
            shader_module(device, "AlphaBlendShader", include_str!("../../shader/alpha_blend.wgsl"))?;
        let shadow_shader = shader_module(
            device,
            "ShadowShader",
            &compose(&[COMMON, MATERIAL, include_str!("../../shader/shadow.wgsl")]),
        )?;
        let blit_shader = shader_module(device, "BlitShader", include_str!("../../shader/blit.wgsl"))?;

        let geometry_layout = pipeline_layout("GeometryPipelineLayout", &[&layouts.camera, &layouts.material]);
        let mut geometry = PipelineBuilder::new(device, &geometry_layout, &geometry_shader)
            .with_label("GeometryPipeline")
            .with_vertex_buffer(Vertex::layout())
            .with_vertex_buffer(InstanceRaw::layout())
            .with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::Less);
        for attachment in &FramebufferLayout::gbuffer().colours {
            geometry = geometry.with_color_target(attachment.format.to_wgpu(), None);
        }
        let geometry = geometry.build();

        let lighting_layout = pipeline_layout(
            "LightingPipelineLayout",
            &[&layouts.camera, &layouts.gbuffer, &layouts.lights, &layouts.shadows],
        );
        let lighting = PipelineBuilder::new(device, &lighting_layout, &lighting_shader)
            .with_label("LightingPipeline")
            .with_no_culling()
            .with_color_target(PixelFormat::Rgba16f.to_wgpu(), Some(ADDITIVE_BLEND))
            .build();

        let forward_layout = pipeline_layout(
            "ForwardPipelineLayout",
            &[&layouts.camera, &layouts.material, &layouts.lights, &layouts.shadows],
        );
        let forward_formats: Vec<wgpu::TextureFormat> = FramebufferLayout::forward()
            .colours
            .iter()
            .map(|a| a.format.to_wgpu())
            .collect();

        let mut forward_base = PipelineBuilder::new(device, &forward_layout, &forward_shader)
            .with_label("ForwardBasePipeline")
            .with_vertex_buffer(Vertex::layout())
            .with_vertex_buffer(InstanceRaw::layout())
            .with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::Less);
        for format in &forward_formats {
            forward_base = forward_base.with_color_target(*format, None);
        }
        let forward_base = forward_base.build();

        // Further light passes add onto the composite only.
        let forward_add = with_composite_only(
            PipelineBuilder::new(device, &forward_layout, &forward_shader)
                .with_label("ForwardAddPipeline")
                .with_vertex_buffer(Vertex::layout())
                .with_vertex_buffer(InstanceRaw::layout())
                .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::Equal),
            &forward_formats,
            Some(ADDITIVE_BLEND),
        )
        .build();

        let skybox_layout = pipeline_layout("SkyboxPipelineLayout", &[&layouts.camera, &layouts.skybox]);
        let skybox = with_composite_only(
            PipelineBuilder::new(device, &skybox_layout, &skybox_shader)
                .with_label("SkyboxPipeline")
                .with_no_culling()
                .with_vertex_buffer(Vertex::layout())
                .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual),
            &forward_formats,
            None,
        )
        .build();

        let alpha_weight_layout = pipeline_layout(
            "AlphaWeightPipelineLayout",
            &[&layouts.camera, &layouts.material, &layouts.lights],
        );
        let alpha = FramebufferLayout::alpha();
        let alpha_weight = PipelineBuilder::new(device, &alpha_weight_layout, &alpha_weight_shader)
            .with_label("AlphaWeightPipeline")
            .with_no_culling()
            .with_vertex_buffer(Vertex::layout())
            .with_vertex_buffer(InstanceRaw::layout())
            .with_color_target(alpha.colours[0].format.to_wgpu(), Some(ADDITIVE_BLEND))
            .with_color_target(alpha.colours[1].format.to_wgpu(), Some(REVEALAGE_BLEND))
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::Less)
            .build();

        let alpha_blend_layout = pipeline_layout("AlphaBlendPipelineLayout", &[&layouts.alpha]);
        let alpha_blend = PipelineBuilder::new(device, &alpha_blend_layout, &alpha_blend_shader)
            .with_label("AlphaBlendPipeline")
            .with_no_culling()
            .with_color_target(PixelFormat::Rgba16f.to_wgpu(), Some(RESOLVE_BLEND))
            .build();

        let shadow_layout = pipeline_layout("ShadowPipelineLayout", &[&layouts.shadow_view, &layouts.material]);
        let shadow = PipelineBuilder::new(device, &shadow_layout, &shadow_shader)
            .with_label("ShadowPipeline")
            .with_no_culling()
            .with_vertex_buffer(Vertex::layout())
            .with_vertex_buffer(InstanceRaw::layout())
            .with_depth_stencil_biased(DEPTH_FORMAT, true, wgpu::CompareFunction::LessEqual, 2, 2.0)
            .build();

        let post_layout = pipeline_layout("PostPipelineLayout", &[&layouts.post_params, &layouts.post_input]);
        let post_format = FramebufferLayout::post().colours[0].format.to_wgpu();
        let post = POST_EFFECT_SHADERS
            .iter()
            .map(|&(effect, label, source)| {
                let shader = shader_module(device, label, &compose(&[POST, source]))?;
                let pipeline = PipelineBuilder::new(device, &post_layout, &shader)
                    .with_label(label)
                    .with_no_culling()
                    .with_color_target(post_format, None)
                    .build();
                Ok((effect, pipeline))
            })
            .collect::<Result<Vec<_>>>()?;

        let blit_layout = pipeline_layout("BlitPipelineLayout", &[&layouts.blit]);
        let blit = PipelineBuilder::new(device, &blit_layout, &blit_shader)
            .with_label("BlitPipeline")
            .with_no_culling()
            .with_color_target(surface_format, None)
            .build();

        Ok(Self {
            layouts,
            geometry,
            lighting,
            forward_base,
            forward_add,
            skybox,
            alpha_weight,
            alpha_blend,
            shadow,
            post,
            blit,
        })
    }
}

fn compose(parts: &[&str]) -> String {
    parts.join("\n")
}

/// Declares every forward buffer target but writes only the first.
fn with_composite_only<'a>(
    mut builder: PipelineBuilder<'a>,
    formats: &[wgpu::TextureFormat],
    blend: Option<wgpu::BlendState>,
) -> PipelineBuilder<'a> {
    for (index, format) in formats.iter().enumerate() {
        builder = if index == 0 {
            builder.with_color_target(*format, blend)
        } else {
            builder.with_masked_color_target(*format, None, wgpu::ColorWrites::empty())
        };
    }
    builder
}
