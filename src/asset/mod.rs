// asset/mod.rs
pub mod builder;
pub mod cache;
pub mod handle;
pub mod loader;
pub mod mesh;

pub use builder::MeshBuilder;
pub use cache::AssetCache;
pub use handle::Handle;
pub use mesh::{Mesh, MeshData};

use std::path::Path;

use crate::error::Result;
use crate::renderer::{Material, Texture};

/// Everything the scene refers to by handle.
#[derive(Default)]
pub struct Assets {
    pub meshes: AssetCache<Mesh>,
    pub materials: AssetCache<Material>,
    pub textures: AssetCache<Texture>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, device: &wgpu::Device, data: &MeshData, label: &str) -> Handle<Mesh> {
        self.meshes.insert(Mesh::new(device, data, label))
    }

    pub fn add_material(&mut self, material: Material) -> Handle<Material> {
        self.materials.insert(material)
    }

    pub fn load_mesh(&mut self, device: &wgpu::Device, path: impl AsRef<Path>) -> Result<Handle<Mesh>> {
        let path = path.as_ref();
        let data = loader::load_obj(path)?;
        Ok(self.add_mesh(device, &data, &path.to_string_lossy()))
    }

    /// Loads a 2D texture; colour data should pass `srgb = true`, data maps
    /// such as normals or gloss `false`.
    pub fn load_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        srgb: bool,
    ) -> Result<Handle<Texture>> {
        let path = path.as_ref();
        let image = loader::load_image(path, true)?;
        let texture = Texture::from_image(device, queue, &image, srgb, &path.to_string_lossy());
        Ok(self.textures.insert(texture))
    }

    /// Cube map from six faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn load_cubemap<P: AsRef<Path>>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: [P; 6],
    ) -> Result<Handle<Texture>> {
        let mut images = Vec::with_capacity(6);
        for face in &faces {
            images.push(loader::load_image(face, false)?);
        }
        let texture = Texture::cubemap(device, queue, &images, "Cubemap")?;
        Ok(self.textures.insert(texture))
    }
}
