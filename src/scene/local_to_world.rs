use glam::{Mat4, Quat, Vec3};

use crate::ecs::Storable;

/// World-space state derived from the hierarchy. Written only by
/// `LocalToWorldSystem`; everything else reads it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalToWorld {
    pub matrix: Mat4,
    pub rotation: Quat,
    pub position: Vec3,
    pub left: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Storable for LocalToWorld {}

impl Default for LocalToWorld {
    fn default() -> Self {
        Self::from_parts(Mat4::IDENTITY, Quat::IDENTITY)
    }
}

impl LocalToWorld {
    pub fn from_parts(matrix: Mat4, rotation: Quat) -> Self {
        Self {
            matrix,
            rotation,
            position: matrix.w_axis.truncate(),
            left: rotation * Vec3::X,
            up: rotation * Vec3::Y,
            forward: rotation * Vec3::Z,
        }
    }

    pub fn right(&self) -> Vec3 {
        -self.left
    }

    /// View matrix looking from `position` along `forward`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }
}
