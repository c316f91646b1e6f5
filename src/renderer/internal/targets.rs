use crate::error::Result;
use crate::renderer::framebuffer::{Framebuffer, FramebufferLayout};
use crate::renderer::internal::pipelines::BindGroupLayouts;
use crate::renderer::post::POST_SOURCES;

/// The per-camera framebuffers and the bind groups that read them. Cameras
/// render one after another, so a single set serves all of them.
pub(crate) struct FrameTargets {
    pub(crate) gbuffer: Framebuffer,
    pub(crate) lbuffer: Framebuffer,
    pub(crate) forward: Framebuffer,
    pub(crate) alpha: Framebuffer,
    /// Ping-pong pair the post effects alternate between.
    pub(crate) post: [Framebuffer; 2],
    pub(crate) gbuffer_bind_group: wgpu::BindGroup,
    pub(crate) alpha_bind_group: wgpu::BindGroup,
    /// Indexed by `PostSource::index`.
    pub(crate) post_input_bind_groups: Vec<wgpu::BindGroup>,
    /// Indexed by `PostSource::index`.
    pub(crate) blit_bind_groups: Vec<wgpu::BindGroup>,
}

impl FrameTargets {
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let gbuffer = Framebuffer::new(device, FramebufferLayout::gbuffer(), width, height)?;
        let lbuffer = Framebuffer::new(device, FramebufferLayout::lbuffer(), width, height)?;
        let forward = Framebuffer::new(device, FramebufferLayout::forward(), width, height)?;
        let alpha = Framebuffer::new(device, FramebufferLayout::alpha(), width, height)?;
        let post = [
            Framebuffer::new(device, FramebufferLayout::post(), width, height)?,
            Framebuffer::new(device, FramebufferLayout::post(), width, height)?,
        ];

        let gbuffer_entries: Vec<_> = gbuffer
            .colours()
            .iter()
            .enumerate()
            .map(|(binding, attachment)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(&attachment.view),
            })
            .collect();
        let gbuffer_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GBufferBindGroup"),
            layout: &layouts.gbuffer,
            entries: &gbuffer_entries,
        });

        let alpha_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("AlphaResolveBindGroup"),
            layout: &layouts.alpha,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(alpha.view("accumulation")),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(alpha.view("revealage")),
                },
            ],
        });

        // Same order as `PostSource::index`.
        let sources: Vec<&wgpu::TextureView> = (0..POST_SOURCES)
            .map(|index| match index {
                0 => forward.view("composite"),
                _ => post[index - 1].view("composite"),
            })
            .collect();

        let post_input_bind_groups = sources
            .iter()
            .map(|source| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("PostInputBindGroup"),
                    layout: &layouts.post_input,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(source),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(forward.view("position")),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(forward.view("normal")),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(forward.view("depth")),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                })
            })
            .collect();

        let blit_bind_groups = sources
            .iter()
            .map(|source| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("BlitBindGroup"),
                    layout: &layouts.blit,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(source),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                })
            })
            .collect();

        log::info!("Created frame targets at {}x{}", width, height);

        Ok(Self {
            gbuffer,
            lbuffer,
            forward,
            alpha,
            post,
            gbuffer_bind_group,
            alpha_bind_group,
            post_input_bind_groups,
            blit_bind_groups,
        })
    }

    /// Seeds the forward buffer with the lit deferred image, its position
    /// and normal attachments and its depth.
    pub(crate) fn copy_deferred_into_forward(&self, encoder: &mut wgpu::CommandEncoder) {
        let copies = [
            (self.lbuffer.attachment("composite"), self.forward.attachment("composite")),
            (self.gbuffer.attachment("position"), self.forward.attachment("position")),
            (self.gbuffer.attachment("normal"), self.forward.attachment("normal")),
            (self.gbuffer.attachment("depth"), self.forward.attachment("depth")),
        ];
        let extent = self.forward.extent();
        for (source, destination) in copies {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &source.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &destination.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                extent,
            );
        }
    }
}
