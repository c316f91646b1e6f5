mod buffers;
mod context;
mod materials;
mod pipelines;
mod shadows;
mod targets;

pub(crate) use buffers::{InstanceBuffer, UniformBinding};
pub(crate) use context::RenderContext;
pub(crate) use materials::MaterialBindings;
pub(crate) use pipelines::{blit_bind_group_layout, BindGroupLayouts, Pipelines};
pub(crate) use shadows::{ShadowCasters, ShadowResources};
pub(crate) use targets::FrameTargets;
