pub mod framebuffer;
pub mod instance;
pub mod lights;
pub mod material;
pub mod passes;
pub mod pipeline_builder;
pub mod post;
pub mod queue;
pub mod renderer;
pub mod shadow;
pub mod texture;
pub mod uniforms;
pub mod vertex;

mod internal;

pub use framebuffer::{AttachmentDesc, Framebuffer, FramebufferLayout, PixelFormat};
pub use instance::{DrawBatch, InstanceRaw, MeshInstanceData};
pub use lights::{LightRaw, LightsUniform, LIGHTS_PER_PASS};
pub use material::{ForwardShader, Material, MaterialTextures, MaterialUniform, RenderPath, TextureSlots};
pub use passes::{CameraPlan, FramePlan, PassKind};
pub use pipeline_builder::PipelineBuilder;
pub use post::{PostEffects, PostUniform};
pub use queue::{CameraSubmission, LightSubmission, MeshBucket, SubmissionQueue};
pub use renderer::{Renderer, RendererStats};
pub use shadow::{LightShadow, ShadowMatricesUniform, MAX_SHADOW_LIGHTS};
pub use texture::{Texture, TextureKind};
pub use uniforms::{CameraUniform, SkyboxUniform};
pub use vertex::Vertex;
