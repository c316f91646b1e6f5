// renderer/lights.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::renderer::queue::LightSubmission;

/// Lights shaded by one lighting draw. More lights means more passes,
/// accumulated additively.
pub const LIGHTS_PER_PASS: usize = 8;

/// Written into `LightRaw::info[1]` when a light has no shadow map.
pub const NO_SHADOW: u32 = u32::MAX;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct LightRaw {
    /// Camera-space position; w unused.
    pub position: [f32; 4],
    /// Camera-space direction, w power.
    pub direction_power: [f32; 4],
    pub colour: [f32; 4],
    /// constant, linear, quadratic.
    pub attenuation: [f32; 4],
    /// cos(inner / 2), cos(outer / 2).
    pub cone: [f32; 4],
    /// mode, shadow slot.
    pub info: [u32; 4],
}

impl LightRaw {
    pub fn from_submission(submission: &LightSubmission, view: Mat4, shadow_slot: Option<u32>) -> Self {
        let light = &submission.light;
        let [constant, linear, quadratic] = light.attenuation();
        let position = view.transform_point3(submission.transform.position);
        let direction = view
            .transform_vector3(submission.transform.forward)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);

        Self {
            position: position.extend(1.0).to_array(),
            direction_power: direction.extend(light.power()).to_array(),
            colour: light.colour.extend(1.0).to_array(),
            attenuation: [constant, linear, quadratic, 0.0],
            cone: [light.inner_cosine(), light.outer_cosine(), 0.0, 0.0],
            info: [light.mode.as_u32(), shadow_slot.unwrap_or(NO_SHADOW), 0, 0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    /// light count, pass index.
    pub header: [u32; 4],
    /// rgb ambient, added by the first pass only.
    pub ambient: [f32; 4],
    pub lights: [LightRaw; LIGHTS_PER_PASS],
}

impl LightsUniform {
    pub fn new(pass_index: usize, ambient: Vec3, lights: &[LightRaw]) -> Self {
        let mut uniform = Self::zeroed();
        let count = lights.len().min(LIGHTS_PER_PASS);
        uniform.header = [count as u32, pass_index as u32, 0, 0];
        uniform.ambient = ambient.extend(0.0).to_array();
        uniform.lights[..count].copy_from_slice(&lights[..count]);
        uniform
    }
}

/// Splits `lights` into passes of at most `per_pass`. Always yields at
/// least one pass so ambient light reaches the screen with no lights at all.
pub fn light_passes<T>(lights: &[T], per_pass: usize) -> Vec<&[T]> {
    if lights.is_empty() || per_pass == 0 {
        return vec![&lights[..0]];
    }
    lights.chunks(per_pass).collect()
}

pub fn light_pass_count(light_count: usize) -> usize {
    light_count.div_ceil(LIGHTS_PER_PASS).max(1)
}
