// scene/components.rs

use crate::asset::{Handle, Mesh};
use crate::ecs::{Component, Storable};
use crate::renderer::Material;

// ============================================================================
// Built-in components (managed by the scene, never added by hand)
// ============================================================================

/// Identity tag attached to every entity at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uuid: u64,
}

impl Storable for Identity {}

/// Marker carried by entities without a parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Root;

impl Storable for Root {}

// ============================================================================
// Rendering
// ============================================================================

/// Mesh + material pair. Either half may be missing (e.g. while an entity is
/// still being assembled), in which case nothing is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Renderable {
    pub mesh: Option<Handle<Mesh>>,
    pub material: Option<Handle<Material>>,
}

impl Component for Renderable {}

impl Renderable {
    pub fn new(mesh: Handle<Mesh>, material: Handle<Material>) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
        }
    }
}

// ============================================================================
// Utility
// ============================================================================

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Component for Name {}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
