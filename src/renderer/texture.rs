// renderer/texture.rs (sampled textures with mipmaps)

use crate::error::{RenderError, Result};
use crate::renderer::PixelFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    D2,
    Cube,
}

/// Sampled texture owned by the asset cache.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub kind: TextureKind,
}

impl Texture {
    fn calculate_mip_levels(width: u32, height: u32) -> u32 {
        let max_dimension = width.max(height).max(1);
        u32::BITS - max_dimension.leading_zeros()
    }

    /// Storage stays linear so mip generation can render into it; sRGB data
    /// is decoded through an sRGB view.
    fn formats_for_color_space(srgb: bool) -> (wgpu::TextureFormat, Option<wgpu::TextureFormat>) {
        if srgb {
            (
                wgpu::TextureFormat::Rgba8Unorm,
                Some(wgpu::TextureFormat::Rgba8UnormSrgb),
            )
        } else {
            (wgpu::TextureFormat::Rgba8Unorm, None)
        }
    }

    /// 2D texture with a full mip chain.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
        srgb: bool,
        label: &str,
    ) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba8(device, queue, image.as_raw(), width, height, srgb, label)
    }

    /// 2D texture from tightly packed pixels. Only 8-bit RGBA data is
    /// accepted; the mip chain is generated from it.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        label: &str,
    ) -> Result<Self> {
        let srgb = check_pixels(data, width, height, format, label)?;
        Ok(Self::from_rgba8(device, queue, data, width, height, srgb, label))
    }

    /// 1x1 texture of a single colour.
    pub fn from_color(device: &wgpu::Device, queue: &wgpu::Queue, color: [u8; 4], label: &str) -> Self {
        Self::from_rgba8(device, queue, &color, 1, 1, false, label)
    }

    /// Flat tangent-space normal, bound where a material has no normal map.
    pub fn flat_normal(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_color(device, queue, [128, 128, 255, 255], "FlatNormal")
    }

    fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
        label: &str,
    ) -> Self {
        let (format, view_format) = Self::formats_for_color_space(srgb);
        let mip_level_count = Self::calculate_mip_levels(width, height);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let view_formats: Vec<wgpu::TextureFormat> = view_format.into_iter().collect();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &view_formats,
        });

        write_layer(queue, &texture, data, width, height, 0);
        generate_mipmaps(device, queue, &texture, mip_level_count, format);

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            format: view_format.or(Some(format)),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            kind: TextureKind::D2,
        }
    }

    /// Cube map from six equally sized faces (+X, -X, +Y, -Y, +Z, -Z).
    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::RgbaImage],
        label: &str,
    ) -> Result<Self> {
        if faces.len() != 6 {
            return Err(RenderError::InvalidTexture {
                label: label.to_string(),
                reason: format!("a cube map needs 6 faces, got {}", faces.len()),
            });
        }
        let (width, height) = faces[0].dimensions();
        if width != height || faces.iter().any(|face| face.dimensions() != (width, height)) {
            return Err(RenderError::InvalidTexture {
                label: label.to_string(),
                reason: "cube map faces must be square and of equal size".to_string(),
            });
        }

        let raw: Vec<&[u8]> = faces.iter().map(|face| face.as_raw().as_slice()).collect();
        Ok(Self::cubemap_from_layers(device, queue, &raw, width, label))
    }

    /// 1x1 white cube map, bound when a camera's skybox has none.
    pub fn blank_cubemap(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = [255u8; 4];
        let layers = [&white[..]; 6];
        Self::cubemap_from_layers(device, queue, &layers, 1, "BlankCubemap")
    }

    fn cubemap_from_layers(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layers: &[&[u8]],
        size: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, data) in layers.iter().enumerate() {
            write_layer(queue, &texture, data, size, size, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            kind: TextureKind::Cube,
        }
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    data: &[u8],
    width: u32,
    height: u32,
    layer: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Fills mips 1.. by repeatedly drawing the previous level through the blit
/// shader with a linear sampler.
fn generate_mipmaps(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level_count: u32,
    format: wgpu::TextureFormat,
) {
    if mip_level_count <= 1 {
        return;
    }

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mipmap Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shader/blit.wgsl").into()),
    });
    let layout = super::internal::blit_bind_group_layout(device);
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mipmap Pipeline Layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = super::PipelineBuilder::new(device, &pipeline_layout, &shader)
        .with_label("Mipmap Pipeline")
        .with_no_culling()
        .with_color_target(format, None)
        .build();

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Mip Sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Mipmap Generator"),
    });

    let mip_view = |level: u32, usage: wgpu::TextureUsages| {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Mip Level"),
            format: Some(format),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: level,
            mip_level_count: Some(1),
            base_array_layer: 0,
            array_layer_count: Some(1),
            usage: Some(usage),
            ..Default::default()
        })
    };

    for target_mip in 1..mip_level_count {
        let src_view = mip_view(target_mip - 1, wgpu::TextureUsages::TEXTURE_BINDING);
        let dst_view = mip_view(target_mip, wgpu::TextureUsages::RENDER_ATTACHMENT);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mip Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mipmap Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &dst_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_pipeline(&pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    queue.submit(Some(encoder.finish()));
}

/// Validates raw pixel data and reports whether it is sRGB encoded.
fn check_pixels(data: &[u8], width: u32, height: u32, format: PixelFormat, label: &str) -> Result<bool> {
    let srgb = match format {
        PixelFormat::Rgba8 => false,
        PixelFormat::Rgba8Srgb => true,
        other => return Err(RenderError::UnsupportedPixelFormat(other)),
    };
    let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
    if width == 0 || height == 0 || data.len() != expected {
        return Err(RenderError::InvalidTexture {
            label: label.to_string(),
            reason: format!("{width}x{height} needs {expected} bytes, got {}", data.len()),
        });
    }
    Ok(srgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_pixels_are_checked_before_upload() {
        let pixels = [255u8; 16];
        assert_eq!(check_pixels(&pixels, 2, 2, PixelFormat::Rgba8, "t").ok(), Some(false));
        assert_eq!(check_pixels(&pixels, 2, 2, PixelFormat::Rgba8Srgb, "t").ok(), Some(true));
        assert!(matches!(
            check_pixels(&pixels, 2, 2, PixelFormat::Depth32f, "t"),
            Err(RenderError::UnsupportedPixelFormat(PixelFormat::Depth32f))
        ));
        assert!(matches!(
            check_pixels(&pixels[..12], 2, 2, PixelFormat::Rgba8, "t"),
            Err(RenderError::InvalidTexture { .. })
        ));
    }

    #[test]
    fn mip_chain_runs_down_to_one_texel() {
        assert_eq!(Texture::calculate_mip_levels(1, 1), 1);
        assert_eq!(Texture::calculate_mip_levels(4, 4), 3);
        assert_eq!(Texture::calculate_mip_levels(256, 128), 9);
        assert_eq!(Texture::calculate_mip_levels(1920, 1080), 11);
        assert_eq!(Texture::calculate_mip_levels(0, 0), 1);
    }

    #[test]
    fn srgb_textures_keep_linear_storage() {
        let (storage, view) = Texture::formats_for_color_space(true);
        assert_eq!(storage, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(view, Some(wgpu::TextureFormat::Rgba8UnormSrgb));
        assert_eq!(Texture::formats_for_color_space(false).1, None);
    }

    // Needs a GPU adapter.
    #[test]
    #[ignore]
    fn mismatched_cubemap_faces_are_rejected() {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .expect("Failed to find adapter");
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .expect("Failed to create device");

            let mut faces = vec![image::RgbaImage::new(4, 4); 6];
            faces[3] = image::RgbaImage::new(2, 2);
            let err = Texture::cubemap(&device, &queue, &faces, "Broken").unwrap_err();
            assert!(matches!(err, RenderError::InvalidTexture { .. }));
        });
    }
}
