// asset/loader.rs
use std::path::Path;

use crate::error::{RenderError, Result};
use crate::renderer::Vertex;

use super::mesh::MeshData;

/// Loads every model of an OBJ file into one mesh. Faces are triangulated,
/// missing normals are recomputed and tangents are always rebuilt.
pub fn load_obj(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    log::info!("Loading mesh: {:?}", path);

    let (models, _materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| RenderError::Mesh {
            path: path.to_path_buf(),
            source,
        })?;

    let mut data = MeshData::default();
    let mut missing_normals = false;

    for model in &models {
        let mesh = &model.mesh;
        let base = data.vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        missing_normals |= mesh.normals.len() < count * 3;

        for i in 0..count {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let uv = match mesh.texcoords.get(2 * i..2 * i + 2) {
                Some(uv) => [uv[0], uv[1]],
                None => [0.0, 0.0],
            };
            let normal = match mesh.normals.get(3 * i..3 * i + 3) {
                Some(n) => [n[0], n[1], n[2]],
                None => [0.0, 0.0, 0.0],
            };
            data.vertices.push(Vertex {
                position,
                uv,
                normal,
                tangent: [1.0, 0.0, 0.0],
            });
        }

        data.indices
            .extend(mesh.indices.iter().map(|&index| base + index));
    }

    if data.indices.is_empty() {
        return Err(RenderError::EmptyMesh {
            path: path.to_path_buf(),
        });
    }

    if missing_normals {
        log::debug!("{:?} has no normals, computing them", path);
        data.compute_normals();
    }
    data.compute_tangents();

    Ok(data)
}

/// Decodes an image into RGBA8. With `flip` the rows are reversed so UV
/// (0,0) addresses the bottom-left texel, matching the mesh convention.
pub fn load_image(path: impl AsRef<Path>, flip: bool) -> Result<image::RgbaImage> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);

    let img = image::open(path).map_err(|source| RenderError::Texture {
        path: path.to_path_buf(),
        source,
    })?;
    let img = if flip { img.flipv() } else { img };

    Ok(img.to_rgba8())
}
