// renderer/material.rs
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::asset::Handle;
use crate::renderer::Texture;

/// Highest gloss exponent. The G-buffer stores gloss as a fraction of it in
/// the 8-bit specular alpha channel.
pub const MAX_GLOSS: f32 = 256.0;

/// Which pass family draws a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RenderPath {
    #[default]
    Deferred,
    Forward,
    Transparent,
}

/// Shading model for forward and transparent materials. Deferred materials
/// always go through the shared geometry and lighting programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ForwardShader {
    #[default]
    Lit,
    Unlit,
}

bitflags! {
    /// Texture slots a material actually samples.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TextureSlots: u32 {
        const DIFFUSE = 1 << 0;
        const NORMAL = 1 << 1;
        const SPECULAR = 1 << 2;
        const GLOSS = 1 << 3;
        const DISPLACEMENT = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MaterialTextures {
    pub diffuse: Option<Handle<Texture>>,
    pub normal: Option<Handle<Texture>>,
    pub specular: Option<Handle<Texture>>,
    pub gloss: Option<Handle<Texture>>,
    pub displacement: Option<Handle<Texture>>,
}

impl MaterialTextures {
    pub fn slots(&self) -> TextureSlots {
        let mut slots = TextureSlots::empty();
        slots.set(TextureSlots::DIFFUSE, self.diffuse.is_some());
        slots.set(TextureSlots::NORMAL, self.normal.is_some());
        slots.set(TextureSlots::SPECULAR, self.specular.is_some());
        slots.set(TextureSlots::GLOSS, self.gloss.is_some());
        slots.set(TextureSlots::DISPLACEMENT, self.displacement.is_some());
        slots
    }

    /// Slots in bind order: diffuse, normal, specular, gloss, displacement.
    pub fn in_bind_order(&self) -> [Option<Handle<Texture>>; 5] {
        [
            self.diffuse,
            self.normal,
            self.specular,
            self.gloss,
            self.displacement,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub render_path: RenderPath,
    pub forward_shader: ForwardShader,
    /// Alpha is only meaningful on the transparent path.
    pub diffuse_colour: Vec4,
    pub specular_colour: Vec3,
    pub gloss: f32,
    pub displacement_scale: f32,
    pub texture_offset: Vec2,
    pub texture_scale: Vec2,
    pub textures: MaterialTextures,
}

impl Material {
    pub fn new(render_path: RenderPath) -> Self {
        Self {
            render_path,
            forward_shader: ForwardShader::Lit,
            diffuse_colour: Vec4::ONE,
            specular_colour: Vec3::splat(0.5),
            gloss: 32.0,
            displacement_scale: 0.0,
            texture_offset: Vec2::ZERO,
            texture_scale: Vec2::ONE,
            textures: MaterialTextures::default(),
        }
    }

    pub fn deferred() -> Self {
        Self::new(RenderPath::Deferred)
    }

    pub fn forward(shader: ForwardShader) -> Self {
        Self::new(RenderPath::Forward).with_forward_shader(shader)
    }

    pub fn transparent(alpha: f32) -> Self {
        let mut material = Self::new(RenderPath::Transparent);
        material.diffuse_colour.w = alpha.clamp(0.0, 1.0);
        material
    }

    pub fn with_diffuse(mut self, colour: Vec3) -> Self {
        self.diffuse_colour = colour.extend(self.diffuse_colour.w);
        self
    }

    pub fn with_specular(mut self, colour: Vec3, gloss: f32) -> Self {
        self.specular_colour = colour;
        self.gloss = gloss.clamp(1.0, MAX_GLOSS);
        self
    }

    pub fn with_forward_shader(mut self, shader: ForwardShader) -> Self {
        self.forward_shader = shader;
        self
    }

    pub fn with_uv_transform(mut self, offset: Vec2, scale: Vec2) -> Self {
        self.texture_offset = offset;
        self.texture_scale = scale;
        self
    }

    pub fn with_diffuse_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.diffuse = Some(texture);
        self
    }

    pub fn with_normal_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.normal = Some(texture);
        self
    }

    pub fn with_specular_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.specular = Some(texture);
        self
    }

    pub fn with_gloss_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.gloss = Some(texture);
        self
    }

    pub fn with_displacement_texture(mut self, texture: Handle<Texture>, scale: f32) -> Self {
        self.textures.displacement = Some(texture);
        self.displacement_scale = scale;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::deferred()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MaterialUniform {
    pub diffuse: [f32; 4],
    /// rgb specular, w gloss exponent.
    pub specular: [f32; 4],
    /// xy offset, zw scale.
    pub uv_transform: [f32; 4],
    /// x displacement scale.
    pub params: [f32; 4],
    /// x texture slots, y 1 when unlit, z 1 on the transparent path.
    pub flags: [u32; 4],
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        let unlit = material.forward_shader == ForwardShader::Unlit
            && material.render_path != RenderPath::Deferred;
        Self {
            diffuse: material.diffuse_colour.to_array(),
            specular: material.specular_colour.extend(material.gloss).to_array(),
            uv_transform: [
                material.texture_offset.x,
                material.texture_offset.y,
                material.texture_scale.x,
                material.texture_scale.y,
            ],
            params: [material.displacement_scale, 0.0, 0.0, 0.0],
            flags: [
                material.textures.slots().bits(),
                unlit as u32,
                (material.render_path == RenderPath::Transparent) as u32,
                0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_tracks_bound_texture_slots() {
        let material = Material::deferred()
            .with_diffuse_texture(Handle::new(0))
            .with_gloss_texture(Handle::new(1));
        let uniform = MaterialUniform::from_material(&material);
        let slots = TextureSlots::from_bits_truncate(uniform.flags[0]);
        assert_eq!(slots, TextureSlots::DIFFUSE | TextureSlots::GLOSS);
    }

    #[test]
    fn unlit_flag_only_applies_off_the_deferred_path() {
        let forward = Material::forward(ForwardShader::Unlit);
        assert_eq!(MaterialUniform::from_material(&forward).flags[1], 1);

        let deferred = Material::deferred().with_forward_shader(ForwardShader::Unlit);
        assert_eq!(MaterialUniform::from_material(&deferred).flags[1], 0);
        assert_eq!(MaterialUniform::from_material(&deferred).flags[2], 0);
        assert_eq!(MaterialUniform::from_material(&Material::transparent(0.5)).flags[2], 1);
    }

    #[test]
    fn transparent_alpha_is_clamped_and_kept_by_diffuse() {
        let material = Material::transparent(1.5).with_diffuse(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(material.diffuse_colour, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(Material::transparent(0.25).diffuse_colour.w, 0.25);
    }

    #[test]
    fn gloss_stays_within_the_stored_range() {
        assert_eq!(Material::deferred().with_specular(Vec3::ONE, 4096.0).gloss, MAX_GLOSS);
        assert_eq!(Material::deferred().with_specular(Vec3::ONE, 0.0).gloss, 1.0);
        let uniform = MaterialUniform::from_material(&Material::deferred().with_specular(Vec3::ONE, 96.0));
        assert_eq!(uniform.specular[3], 96.0);
    }

    #[test]
    fn uniform_size_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }
}
