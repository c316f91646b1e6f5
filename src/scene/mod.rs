// scene/mod.rs

pub mod camera;
pub mod components;
pub mod light;
pub mod local_to_world;
pub mod systems;
pub mod transform;

mod internal;

pub use camera::{Camera, Projection, Skybox, Viewport};
pub use components::{Identity, Name, Renderable, Root};
pub use light::{Light, LightMode};
pub use local_to_world::LocalToWorld;
pub use systems::{LocalToWorldSystem, RenderableSystem};
pub use transform::Transform;
