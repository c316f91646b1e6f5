use glam::Vec3;

use crate::ecs::Component;

const MIN_CONE: f32 = 1.0 * (std::f32::consts::PI / 180.0);
const MAX_CONE: f32 = 179.0 * (std::f32::consts::PI / 180.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LightMode {
    #[default]
    Point,
    Spot,
    Directional,
}

impl LightMode {
    pub fn as_u32(self) -> u32 {
        match self {
            LightMode::Point => 0,
            LightMode::Spot => 1,
            LightMode::Directional => 2,
        }
    }
}

/// Light source attached to an entity; position and direction come from the
/// entity's `LocalToWorld` (forward axis).
///
/// Fields with range constraints are private and clamped by their setters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub mode: LightMode,
    pub colour: Vec3,
    pub casts_shadow: bool,
    power: f32,
    attenuation_constant: f32,
    attenuation_linear: f32,
    attenuation_quadratic: f32,
    inner_angle: f32,
    outer_angle: f32,
    shadow_distance: f32,
}

impl Component for Light {}

impl Default for Light {
    fn default() -> Self {
        Self {
            mode: LightMode::Point,
            colour: Vec3::ONE,
            casts_shadow: true,
            power: 1.0,
            attenuation_constant: 1.0,
            attenuation_linear: 0.0045,
            attenuation_quadratic: 0.0075,
            inner_angle: 60f32.to_radians(),
            outer_angle: 90f32.to_radians(),
            shadow_distance: 50.0,
        }
    }
}

impl Light {
    pub fn point(colour: Vec3, power: f32) -> Self {
        Self::default().with_colour(colour).with_power(power)
    }

    pub fn spot(colour: Vec3, power: f32, inner: f32, outer: f32) -> Self {
        let mut light = Self {
            mode: LightMode::Spot,
            ..Self::point(colour, power)
        };
        light.set_outer_angle(outer);
        light.set_inner_angle(inner);
        light
    }

    pub fn directional(colour: Vec3, power: f32) -> Self {
        Self {
            mode: LightMode::Directional,
            ..Self::point(colour, power)
        }
    }

    pub fn with_colour(mut self, colour: Vec3) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.set_power(power);
        self
    }

    pub fn with_shadow_distance(mut self, distance: f32) -> Self {
        self.set_shadow_distance(distance);
        self
    }

    pub fn with_shadows(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn set_power(&mut self, power: f32) {
        self.power = power.max(0.0);
    }

    pub fn attenuation(&self) -> [f32; 3] {
        [
            self.attenuation_constant,
            self.attenuation_linear,
            self.attenuation_quadratic,
        ]
    }

    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) {
        self.attenuation_constant = constant.max(0.0);
        self.attenuation_linear = linear.max(0.0);
        self.attenuation_quadratic = quadratic.max(0.0);
    }

    /// Full inner cone angle in radians, never wider than the outer cone.
    pub fn inner_angle(&self) -> f32 {
        self.inner_angle.min(self.outer_angle)
    }

    pub fn set_inner_angle(&mut self, radians: f32) {
        self.inner_angle = radians.clamp(MIN_CONE, MAX_CONE);
    }

    /// Full outer cone angle in radians.
    pub fn outer_angle(&self) -> f32 {
        self.outer_angle
    }

    pub fn set_outer_angle(&mut self, radians: f32) {
        self.outer_angle = radians.clamp(MIN_CONE, MAX_CONE);
    }

    pub fn inner_cosine(&self) -> f32 {
        (self.inner_angle() * 0.5).cos()
    }

    pub fn outer_cosine(&self) -> f32 {
        (self.outer_angle * 0.5).cos()
    }

    /// Far plane of the shadow projection for point and spot lights, and the
    /// furthest camera distance covered by directional shadows.
    pub fn shadow_distance(&self) -> f32 {
        self.shadow_distance
    }

    pub fn set_shadow_distance(&mut self, distance: f32) {
        self.shadow_distance = distance.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp() {
        let mut light = Light::default();
        light.set_power(-3.0);
        light.set_attenuation(-1.0, 0.5, -0.25);
        assert_eq!(light.power(), 0.0);
        assert_eq!(light.attenuation(), [0.0, 0.5, 0.0]);

        light.set_outer_angle(0.0);
        assert!((light.outer_angle() - 1f32.to_radians()).abs() < 1e-6);
        light.set_outer_angle(std::f32::consts::TAU);
        assert!((light.outer_angle() - 179f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn inner_never_exceeds_outer() {
        let light = Light::spot(Vec3::ONE, 1.0, 80f32.to_radians(), 30f32.to_radians());
        assert!((light.inner_angle() - 30f32.to_radians()).abs() < 1e-6);
        assert!(light.inner_cosine() >= light.outer_cosine());
    }

    #[test]
    fn defaults() {
        let light = Light::default();
        assert_eq!(light.mode, LightMode::Point);
        assert_eq!(light.attenuation(), [1.0, 0.0045, 0.0075]);
        assert_eq!(light.shadow_distance(), 50.0);
        assert!((light.outer_cosine() - (45f32.to_radians()).cos()).abs() < 1e-6);
    }
}
