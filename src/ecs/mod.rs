// ecs/mod.rs
//! Entity ids, sparse component pools and the scene registry that ties them
//! together.

pub mod component;
pub mod id;
pub mod pool;
pub mod registry;
pub mod system;

pub use component::{Component, ComponentSet, Storable};
pub use id::{EntityId, IdAllocator};
pub use pool::{ErasedPool, Pool};
pub use registry::Scene;
pub use system::{FnSystem, FrameContext, System};
