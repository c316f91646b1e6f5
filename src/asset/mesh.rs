// asset/mesh.rs
use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

use crate::renderer::Vertex;

/// CPU-side geometry. Kept around only until it is uploaded into a [`Mesh`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recomputes per-vertex tangents from positions and UVs.
    ///
    /// Face tangents are accumulated on their three vertices, then
    /// orthogonalised against the vertex normal. Vertices that only touch
    /// faces with degenerate UVs keep a +X tangent.
    pub fn compute_tangents(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(a), Some(b), Some(c)) = (
                self.vertices.get(i0),
                self.vertices.get(i1),
                self.vertices.get(i2),
            ) else {
                continue;
            };

            let edge1 = Vec3::from(b.position) - Vec3::from(a.position);
            let edge2 = Vec3::from(c.position) - Vec3::from(a.position);
            let duv1 = Vec2::from(b.uv) - Vec2::from(a.uv);
            let duv2 = Vec2::from(c.uv) - Vec2::from(a.uv);

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;

            for i in [i0, i1, i2] {
                accumulated[i] += tangent;
            }
        }

        for (vertex, tangent) in self.vertices.iter_mut().zip(accumulated) {
            let normal = Vec3::from(vertex.normal);
            let orthogonal = tangent - normal * normal.dot(tangent);
            vertex.tangent = orthogonal.try_normalize().unwrap_or(Vec3::X).to_array();
        }
    }

    /// Smooth normals from face normals, for sources that ship none.
    pub fn compute_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0.max(i1).max(i2) >= self.vertices.len() {
                continue;
            }
            let a = Vec3::from(self.vertices[i0].position);
            let b = Vec3::from(self.vertices[i1].position);
            let c = Vec3::from(self.vertices[i2].position);
            // Area weighted.
            let face = (b - a).cross(c - a);
            for i in [i0, i1, i2] {
                accumulated[i] += face;
            }
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            vertex.normal = normal.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }
}

/// Immutable GPU geometry with 32-bit indices.
#[derive(Debug)]
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "Uploaded mesh '{}': {} vertices, {} triangles",
            label,
            data.vertices.len(),
            data.triangle_count()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
