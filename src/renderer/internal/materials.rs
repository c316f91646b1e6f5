use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::asset::{Assets, Handle};
use crate::renderer::material::{Material, MaterialUniform, TextureSlots};
use crate::renderer::Texture;

struct MaterialBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    textures: [Option<Handle<Texture>>; 5],
}

/// Bind group per material, rebuilt only when its texture set changes.
/// Uniform contents are rewritten every frame a material is drawn.
pub(crate) struct MaterialBindings {
    entries: HashMap<Handle<Material>, MaterialBinding>,
    white: Texture,
    flat_normal: Texture,
    sampler: wgpu::Sampler,
}

impl MaterialBindings {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("MaterialSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            entries: HashMap::new(),
            white: Texture::from_color(device, queue, [255, 255, 255, 255], "DefaultWhite"),
            flat_normal: Texture::flat_normal(device, queue),
            sampler,
        }
    }

    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        assets: &Assets,
        handles: impl IntoIterator<Item = Handle<Material>>,
    ) {
        for handle in handles {
            let Some(material) = assets.materials.get(handle) else {
                log::warn!("Skipping unknown material {:?}", handle);
                continue;
            };

            // Handles that do not resolve are drawn with the default texture.
            let textures = material
                .textures
                .in_bind_order()
                .map(|slot| slot.filter(|texture| assets.textures.get(*texture).is_some()));
            let mut uniform = MaterialUniform::from_material(material);
            uniform.flags[0] &= resolved_slots(&textures).bits();

            let stale = self
                .entries
                .get(&handle)
                .map_or(true, |binding| binding.textures != textures);
            if stale {
                let binding = self.create(device, layout, assets, handle, &uniform, textures);
                self.entries.insert(handle, binding);
            } else if let Some(binding) = self.entries.get(&handle) {
                queue.write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&uniform));
            }
        }
    }

    pub(crate) fn bind_group(&self, handle: Handle<Material>) -> Option<&wgpu::BindGroup> {
        self.entries.get(&handle).map(|binding| &binding.bind_group)
    }

    fn create(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        assets: &Assets,
        handle: Handle<Material>,
        uniform: &MaterialUniform,
        textures: [Option<Handle<Texture>>; 5],
    ) -> MaterialBinding {
        let label = format!("Material{}", handle.index());
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::bytes_of(uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let views: Vec<&wgpu::TextureView> = textures
            .iter()
            .enumerate()
            .map(|(slot, texture)| {
                match texture.and_then(|t| assets.textures.get(t)) {
                    Some(texture) => &texture.view,
                    // Slot 1 is the normal map.
                    None if slot == 1 => &self.flat_normal.view,
                    None => &self.white.view,
                }
            })
            .collect();

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        entries.extend(views.iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: slot as u32 + 1,
            resource: wgpu::BindingResource::TextureView(view),
        }));
        entries.push(wgpu::BindGroupEntry {
            binding: 6,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout,
            entries: &entries,
        });
        log::debug!("Created bind group for {:?}", handle);

        MaterialBinding {
            buffer,
            bind_group,
            textures,
        }
    }
}

fn resolved_slots(textures: &[Option<Handle<Texture>>; 5]) -> TextureSlots {
    let order = [
        TextureSlots::DIFFUSE,
        TextureSlots::NORMAL,
        TextureSlots::SPECULAR,
        TextureSlots::GLOSS,
        TextureSlots::DISPLACEMENT,
    ];
    textures
        .iter()
        .zip(order)
        .filter(|(texture, _)| texture.is_some())
        .fold(TextureSlots::empty(), |slots, (_, slot)| slots | slot)
}
