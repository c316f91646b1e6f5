// ecs/component.rs
use std::any::TypeId;

/// Anything that can live in a component pool.
///
/// User types get this through [`Component`]. The scene's built-in
/// components implement it directly and deliberately do not implement
/// `Component`, so `Scene::add_component`/`remove_component` reject them at
/// compile time.
pub trait Storable: 'static {}

/// A component game code may attach and detach freely.
pub trait Component: 'static {}

impl<T: Component> Storable for T {}

/// A tuple of component types used by the multi-component queries.
pub trait ComponentSet {
    fn type_ids() -> Vec<TypeId>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Storable),+> ComponentSet for ($($name,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
