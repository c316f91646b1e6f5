// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::scene::{Camera, LocalToWorld, Skybox};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    /// Camera space back to world space; shadow lookups need world positions.
    pub inverse_view: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn new() -> Self {
        Self::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }

    pub fn from_camera(transform: &LocalToWorld, camera: &Camera) -> Self {
        Self::from_matrices(transform.view_matrix(), camera.projection_matrix(), transform.position)
    }

    pub fn from_matrices(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_proj: (projection * view).to_cols_array_2d(),
            inverse_view: view.inverse().to_cols_array_2d(),
            position: position.to_array(),
            _padding: 0.0,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct SkyboxUniform {
    pub colour: [f32; 4],
    /// x 1 when a cubemap is bound.
    pub flags: [u32; 4],
}

impl SkyboxUniform {
    pub fn new(skybox: &Skybox, has_cubemap: bool) -> Self {
        Self {
            colour: skybox.colour.extend(1.0).to_array(),
            flags: [has_cubemap as u32, 0, 0, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn camera_uniform_is_272_bytes() {
        // 4 * mat4x4<f32> = 256 bytes, vec3<f32> + padding = 16 bytes.
        assert_eq!(std::mem::size_of::<CameraUniform>(), 272);
    }

    #[test]
    fn inverse_view_returns_to_world() {
        let rotation = Quat::from_rotation_y(0.4);
        let transform = LocalToWorld::from_parts(
            Mat4::from_rotation_translation(rotation, Vec3::new(1.0, 2.0, 3.0)),
            rotation,
        );
        let uniform = CameraUniform::from_camera(&transform, &Camera::default());
        let view = Mat4::from_cols_array_2d(&uniform.view);
        let inverse = Mat4::from_cols_array_2d(&uniform.inverse_view);

        let world = Vec3::new(-4.0, 0.5, 7.0);
        let back = inverse.transform_point3(view.transform_point3(world));
        assert!(back.abs_diff_eq(world, 1e-4));
        assert_eq!(uniform.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn skybox_uniform_flags_cubemap() {
        let skybox = Skybox::default();
        assert_eq!(SkyboxUniform::new(&skybox, true).flags[0], 1);
        assert_eq!(SkyboxUniform::new(&skybox, false).flags[0], 0);
    }
}
