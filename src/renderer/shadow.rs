// renderer/shadow.rs
//! Light-space matrices and shadow slot bookkeeping. GPU resources live in
//! `renderer::internal::shadows`.
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::renderer::queue::LightSubmission;
use crate::scene::{Camera, Light, LightMode, LocalToWorld, Projection};

/// Shadow-casting lights honoured per frame; further casters are lit unshadowed.
pub const MAX_SHADOW_LIGHTS: usize = 4;
pub const CUBE_FACES: usize = 6;
pub const SHADOW_MATRIX_COUNT: usize = MAX_SHADOW_LIGHTS * CUBE_FACES;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
    pub centre: Vec3,
}

impl BoundingBox {
    pub fn from_points(points: &[Vec3]) -> Self {
        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        if points.is_empty() {
            return Self {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
                centre: Vec3::ZERO,
            };
        }
        Self {
            min,
            max,
            centre: (min + max) * 0.5,
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Light-space bounds of a camera frustum slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowBounds {
    pub bounds: BoundingBox,
}

impl ShadowBounds {
    pub fn perspective(
        light_view: Mat4,
        camera: &LocalToWorld,
        near: f32,
        far: f32,
        aspect: f32,
        fov: f32,
    ) -> Self {
        let half_extent = |distance: f32| {
            let half_height = distance * (fov * 0.5).tan();
            (half_height * aspect, half_height)
        };
        Self::from_slice(light_view, camera, near, far, half_extent)
    }

    pub fn orthographic(
        light_view: Mat4,
        camera: &LocalToWorld,
        near: f32,
        far: f32,
        aspect: f32,
        ortho_size: f32,
    ) -> Self {
        let half_height = ortho_size * 0.5;
        Self::from_slice(light_view, camera, near, far, |_| {
            (half_height * aspect, half_height)
        })
    }

    fn from_slice(
        light_view: Mat4,
        camera: &LocalToWorld,
        near: f32,
        far: f32,
        half_extent: impl Fn(f32) -> (f32, f32),
    ) -> Self {
        let right = camera.right();
        let mut corners = [Vec3::ZERO; 8];
        for (plane, distance) in [near, far].into_iter().enumerate() {
            let (half_width, half_height) = half_extent(distance);
            let centre = camera.position + camera.forward * distance;
            for (i, (sx, sy)) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .into_iter()
                .enumerate()
            {
                let corner = centre + right * (sx * half_width) + camera.up * (sy * half_height);
                corners[plane * 4 + i] = light_view.transform_point3(corner);
            }
        }
        Self {
            bounds: BoundingBox::from_points(&corners),
        }
    }

    pub fn width(&self) -> f32 {
        self.bounds.size().x
    }

    pub fn height(&self) -> f32 {
        self.bounds.size().y
    }

    /// Signed, expected negative: the far side of the slice from the light.
    pub fn near(&self) -> f32 {
        self.bounds.min.z - self.bounds.centre.z
    }

    /// Signed, expected positive: the side of the slice facing the light.
    pub fn far(&self) -> f32 {
        self.bounds.max.z - self.bounds.centre.z
    }

    /// Orthographic view-projection around the box centre. `caster_margin`
    /// extends the volume towards the light so occluders outside the
    /// camera slice still cast into it.
    pub fn view_projection(&self, light_view: Mat4, caster_margin: f32) -> Mat4 {
        let (half_width, half_height) = (self.width() * 0.5, self.height() * 0.5);
        let view = Mat4::from_translation(-self.bounds.centre) * light_view;
        let projection = Mat4::orthographic_rh(
            -half_width,
            half_width,
            -half_height,
            half_height,
            -self.far() - caster_margin.max(0.0),
            -self.near(),
        );
        projection * view
    }
}

/// Light-space matrices for one shadow-casting light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightShadow {
    Directional(Mat4),
    Spot(Mat4),
    Point([Mat4; CUBE_FACES]),
}

impl LightShadow {
    /// The single view-projection of a directional or spot light. Point
    /// lights have none; their six faces are the real output.
    pub fn primary(&self) -> Mat4 {
        match self {
            LightShadow::Directional(m) | LightShadow::Spot(m) => *m,
            LightShadow::Point(_) => Mat4::IDENTITY,
        }
    }

    pub fn faces(&self) -> &[Mat4] {
        match self {
            LightShadow::Directional(m) | LightShadow::Spot(m) => std::slice::from_ref(m),
            LightShadow::Point(faces) => faces,
        }
    }
}

/// Fits an orthographic volume around the part of `camera`'s frustum that
/// lies within the light's shadow distance.
pub fn directional_shadow_matrix(
    light_transform: &LocalToWorld,
    light: &Light,
    camera_transform: &LocalToWorld,
    camera: &Camera,
) -> Mat4 {
    let light_view = Mat4::look_to_rh(Vec3::ZERO, light_transform.forward, light_transform.up);
    let near = camera.near;
    let far = camera.far.min(light.shadow_distance()).max(near + f32::EPSILON);

    let bounds = match camera.projection {
        Projection::Perspective => ShadowBounds::perspective(
            light_view,
            camera_transform,
            near,
            far,
            camera.aspect,
            camera.fov,
        ),
        Projection::Orthographic => ShadowBounds::orthographic(
            light_view,
            camera_transform,
            near,
            far,
            camera.aspect,
            camera.ortho_size,
        ),
    };

    bounds.view_projection(light_view, light.shadow_distance())
}

pub fn spot_shadow_matrix(light_transform: &LocalToWorld, light: &Light, near: f32) -> Mat4 {
    let far = light.shadow_distance().max(near + 0.01);
    let projection = Mat4::perspective_rh(light.outer_angle(), 1.0, near, far);
    let view = Mat4::look_to_rh(light_transform.position, light_transform.forward, light_transform.up);
    projection * view
}

/// Face order matches the cube array layers: +X, -X, +Y, -Y, +Z, -Z.
pub fn point_shadow_matrices(position: Vec3, light: &Light, near: f32) -> [Mat4; CUBE_FACES] {
    const FACES: [(Vec3, Vec3); CUBE_FACES] = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    let far = light.shadow_distance().max(near + 0.01);
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
    FACES.map(|(direction, up)| projection * Mat4::look_to_rh(position, direction, up))
}

/// Shadow slot per light, in submission order among shadow casters.
/// Casters past `MAX_SHADOW_LIGHTS` get `None`.
pub fn assign_shadow_slots(lights: &[LightSubmission]) -> Vec<Option<u32>> {
    let mut next = 0u32;
    lights
        .iter()
        .map(|submission| {
            if !submission.light.casts_shadow {
                return None;
            }
            if next as usize >= MAX_SHADOW_LIGHTS {
                log::debug!("Shadow slots exhausted, light rendered without shadows");
                return None;
            }
            next += 1;
            Some(next - 1)
        })
        .collect()
}

/// Whether any light holding a slot needs the per-camera directional pass
/// (`directional == true`) or the shared point/spot pass.
pub fn needs_shadow_pass(lights: &[LightSubmission], slots: &[Option<u32>], directional: bool) -> bool {
    lights
        .iter()
        .zip(slots)
        .any(|(s, slot)| slot.is_some() && (s.light.mode == LightMode::Directional) == directional)
}

/// Every shadow matrix of the frame, indexed `slot * CUBE_FACES + face`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ShadowMatricesUniform {
    pub matrices: [[[f32; 4]; 4]; SHADOW_MATRIX_COUNT],
}

impl ShadowMatricesUniform {
    pub fn new() -> Self {
        Self::zeroed()
    }

    pub fn set(&mut self, slot: u32, shadow: &LightShadow) {
        let base = slot as usize * CUBE_FACES;
        for (face, matrix) in shadow.faces().iter().enumerate() {
            if let Some(dst) = self.matrices.get_mut(base + face) {
                *dst = matrix.to_cols_array_2d();
            }
        }
    }
}

impl Default for ShadowMatricesUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4Swizzles};

    fn transform_at(position: Vec3, rotation: Quat) -> LocalToWorld {
        LocalToWorld::from_parts(Mat4::from_rotation_translation(rotation, position), rotation)
    }

    #[test]
    fn bounds_relative_to_centre_are_signed() {
        let camera = LocalToWorld::default();
        let bounds = ShadowBounds::perspective(Mat4::IDENTITY, &camera, 1.0, 10.0, 1.0, 1.0);
        let centre_z = bounds.bounds.centre.z;

        assert!(bounds.near() < 0.0);
        assert!(bounds.far() > 0.0);
        assert!((centre_z + bounds.near() - 1.0).abs() < 1e-5);
        assert!((centre_z + bounds.far() - 10.0).abs() < 1e-5);
        // Far plane half height is 10 * tan(0.5).
        assert!((bounds.height() - 20.0 * 0.5f32.tan()).abs() < 1e-4);
    }

    #[test]
    fn orthographic_slice_has_constant_extent() {
        let camera = LocalToWorld::default();
        let bounds = ShadowBounds::orthographic(Mat4::IDENTITY, &camera, 0.0, 4.0, 2.0, 3.0);
        assert!((bounds.width() - 6.0).abs() < 1e-5);
        assert!((bounds.height() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn directional_matrix_maps_whole_slice_into_clip_volume() {
        let sun = transform_at(Vec3::new(0.0, 50.0, 0.0), Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let light = Light::directional(Vec3::ONE, 1.0).with_shadow_distance(30.0);
        let eye = transform_at(Vec3::new(2.0, 1.0, 0.0), Quat::from_rotation_y(0.3));
        let camera = Camera {
            near: 0.5,
            far: 100.0,
            ..Camera::default()
        };

        let matrix = directional_shadow_matrix(&sun, &light, &eye, &camera);

        // Points inside the slice (far clipped to 30) land inside the clip box.
        for distance in [0.5, 10.0, 29.9] {
            let p = eye.position + eye.forward * distance;
            let clip = matrix * p.extend(1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() <= 1.0 + 1e-4 && ndc.y.abs() <= 1.0 + 1e-4, "{ndc:?}");
            assert!((-1e-4..=1.0 + 1e-4).contains(&ndc.z), "{ndc:?}");
        }
    }

    #[test]
    fn spot_matrix_looks_along_forward() {
        let lamp = transform_at(Vec3::new(0.0, 5.0, 0.0), Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let light = Light::spot(Vec3::ONE, 1.0, 0.5, 1.0);
        let matrix = spot_shadow_matrix(&lamp, &light, 0.1);

        let ahead = lamp.position + lamp.forward * 3.0;
        let clip = matrix * ahead.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn point_faces_cover_each_axis() {
        let light = Light::point(Vec3::ONE, 1.0);
        let faces = point_shadow_matrices(Vec3::ZERO, &light, 0.1);
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in faces.iter().zip(axes) {
            let clip = *face * (axis * 2.0).extend(1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{axis:?} -> {ndc:?}");
        }
        assert_eq!(LightShadow::Point(faces).primary(), Mat4::IDENTITY);
        assert_eq!(LightShadow::Point(faces).faces().len(), CUBE_FACES);
    }

    #[test]
    fn slots_follow_submission_order_and_cap() {
        let caster = LightSubmission {
            transform: LocalToWorld::default(),
            light: Light::default(),
        };
        let non_caster = LightSubmission {
            light: Light::default().with_shadows(false),
            ..caster
        };
        let lights = [caster, non_caster, caster, caster, caster, caster];
        let slots = assign_shadow_slots(&lights);
        assert_eq!(slots, vec![Some(0), None, Some(1), Some(2), Some(3), None]);
        assert!(needs_shadow_pass(&lights, &slots, false));
        assert!(!needs_shadow_pass(&lights, &slots, true));
    }

    #[test]
    fn uniform_places_faces_at_slot_offset() {
        let mut uniform = ShadowMatricesUniform::new();
        let m = Mat4::from_translation(Vec3::X);
        uniform.set(1, &LightShadow::Spot(m));
        assert_eq!(uniform.matrices[CUBE_FACES], m.to_cols_array_2d());
        assert_eq!(uniform.matrices[0], [[0.0; 4]; 4]);
    }
}
