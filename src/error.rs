// error.rs
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to acquire surface texture: {0}")]
    SurfaceTexture(#[from] wgpu::SurfaceError),

    #[error("incomplete {framebuffer} framebuffer: {reason}")]
    IncompleteFramebuffer {
        framebuffer: &'static str,
        reason: String,
    },

    #[error("shader `{label}` failed to compile: {message}")]
    Shader { label: &'static str, message: String },

    #[error("failed to create render pipelines: {0}")]
    Pipeline(String),

    #[error("failed to load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load mesh {}: {source}", path.display())]
    Mesh {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("invalid texture `{label}`: {reason}")]
    InvalidTexture { label: String, reason: String },

    #[error("mesh {} contains no geometry", path.display())]
    EmptyMesh { path: PathBuf },

    #[error("pixel format {0:?} cannot be uploaded from raw data")]
    UnsupportedPixelFormat(crate::renderer::PixelFormat),
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    pub(crate) fn incomplete(framebuffer: &'static str, reason: impl Into<String>) -> Self {
        Self::IncompleteFramebuffer {
            framebuffer,
            reason: reason.into(),
        }
    }
}
