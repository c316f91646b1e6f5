// asset/builder.rs
use glam::Vec3;
use std::f32::consts::{PI, TAU};

use super::mesh::MeshData;
use crate::renderer::Vertex;

/// Procedural meshes. Everything is centred on the origin, one unit across,
/// counter-clockwise front faces.
pub struct MeshBuilder;

// (normal, u axis, v axis) per face, with u x v == normal.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

impl MeshBuilder {
    pub fn cube() -> MeshData {
        Self::box_faces(false)
    }

    /// 24-vertex cube seen from the inside.
    pub fn skybox() -> MeshData {
        Self::box_faces(true)
    }

    /// Square in the XZ plane facing +Y, `size` units across.
    pub fn plane(size: f32) -> MeshData {
        let mut data = MeshData::default();
        push_quad(&mut data, Vec3::ZERO, Vec3::Y, Vec3::X * size, Vec3::NEG_Z * size, false);
        data
    }

    /// Full-screen quad in normalised device coordinates.
    pub fn screen_quad() -> MeshData {
        let mut data = MeshData::default();
        push_quad(&mut data, Vec3::ZERO, Vec3::Z, Vec3::X * 2.0, Vec3::Y * 2.0, false);
        data
    }

    /// UV sphere of radius 0.5. `rings` and `sectors` are clamped to at
    /// least 2 and 3.
    pub fn sphere(rings: u32, sectors: u32) -> MeshData {
        let rings = rings.max(2);
        let sectors = sectors.max(3);
        let mut data = MeshData::default();

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            for sector in 0..=sectors {
                let theta = TAU * sector as f32 / sectors as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                data.vertices.push(Vertex {
                    position: (normal * 0.5).to_array(),
                    uv: [
                        sector as f32 / sectors as f32,
                        1.0 - ring as f32 / rings as f32,
                    ],
                    normal: normal.to_array(),
                    tangent: [-theta.sin(), 0.0, theta.cos()],
                });
            }
        }

        let stride = sectors + 1;
        for ring in 0..rings {
            for sector in 0..sectors {
                let top = ring * stride + sector;
                let bottom = top + stride;
                data.indices
                    .extend_from_slice(&[top, top + 1, bottom, top + 1, bottom + 1, bottom]);
            }
        }

        data
    }

    fn box_faces(inward: bool) -> MeshData {
        let mut data = MeshData::default();
        for (normal, u, v) in CUBE_FACES {
            push_quad(&mut data, normal * 0.5, normal, u, v, inward);
        }
        data
    }
}

fn push_quad(data: &mut MeshData, centre: Vec3, normal: Vec3, u: Vec3, v: Vec3, inward: bool) {
    let base = data.vertices.len() as u32;
    let facing = if inward { -normal } else { normal };
    let tangent = u.normalize_or_zero();

    for (du, dv) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
        let position = centre + u * (du - 0.5) + v * (dv - 0.5);
        data.vertices.push(Vertex {
            position: position.to_array(),
            uv: [du, dv],
            normal: facing.to_array(),
            tangent: tangent.to_array(),
        });
    }

    if inward {
        data.indices
            .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
    } else {
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
