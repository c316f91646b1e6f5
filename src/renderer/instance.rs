// renderer/instance.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use rayon::prelude::*;
use std::mem;

use crate::asset::{Handle, Mesh};
use crate::renderer::material::Material;
use crate::renderer::queue::MeshBucket;

/// Per-instance transforms for one draw. `normal` is in view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshInstanceData {
    pub model: Mat4,
    pub normal: Mat3,
}

impl MeshInstanceData {
    /// Normal matrix = transpose(inverse(view * model)), upper 3x3. A
    /// singular model-view (zero scale) falls back to identity.
    pub fn from_model(view: Mat4, model: Mat4) -> Self {
        let model_view = view * model;
        let normal = if model_view.determinant().abs() > f32::EPSILON {
            Mat3::from_mat4(model_view.inverse().transpose())
        } else {
            Mat3::IDENTITY
        };
        Self { model, normal }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    // mat3 columns padded to vec4 for the vertex fetch.
    pub normal: [[f32; 4]; 3],
}

impl InstanceRaw {
    pub const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4,
        10 => Float32x4,
        11 => Float32x4
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    pub fn from_data(data: &MeshInstanceData) -> Self {
        Self {
            model: data.model.to_cols_array_2d(),
            normal: [
                data.normal.x_axis.extend(0.0).to_array(),
                data.normal.y_axis.extend(0.0).to_array(),
                data.normal.z_axis.extend(0.0).to_array(),
            ],
        }
    }
}

/// Instance records for every model matrix, computed in parallel.
pub fn build_instances(view: Mat4, models: &[Mat4]) -> Vec<InstanceRaw> {
    models
        .par_iter()
        .map(|model| InstanceRaw::from_data(&MeshInstanceData::from_model(view, *model)))
        .collect()
}

/// One instanced draw: a contiguous range of the frame's instance buffer
/// sharing a material and a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBatch {
    pub material: Handle<Material>,
    pub mesh: Handle<Mesh>,
    pub first_instance: u32,
    pub instance_count: u32,
}

impl DrawBatch {
    pub fn instances(&self) -> std::ops::Range<u32> {
        self.first_instance..self.first_instance + self.instance_count
    }
}

/// Appends the bucket's instances to `instances` and returns one batch per
/// (material, mesh) pair, ordered by material then mesh so bind groups
/// change as rarely as possible.
pub fn pack_bucket(bucket: &MeshBucket, view: Mat4, instances: &mut Vec<InstanceRaw>) -> Vec<DrawBatch> {
    let mut pairs: Vec<_> = bucket
        .iter()
        .flat_map(|(material, meshes)| {
            meshes
                .iter()
                .map(move |(mesh, models)| (*material, *mesh, models.as_slice()))
        })
        .filter(|(_, _, models)| !models.is_empty())
        .collect();
    pairs.sort_by_key(|(material, mesh, _)| (material.index(), mesh.index()));

    pairs
        .into_iter()
        .map(|(material, mesh, models)| {
            let first_instance = instances.len() as u32;
            instances.extend(build_instances(view, models));
            DrawBatch {
                material,
                mesh,
                first_instance,
                instance_count: models.len() as u32,
            }
        })
        .collect()
}
