// ecs/system.rs
use crate::asset::Assets;
use crate::event::Event;
use crate::renderer::SubmissionQueue;

use super::Scene;

/// Per-frame state handed to every system: the explicit context that
/// replaces engine-wide singletons.
pub struct FrameContext<'a> {
    pub dt: f32,
    pub events: &'a [Event],
    pub queue: &'a mut SubmissionQueue,
    pub assets: &'a Assets,
    quit_requested: bool,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        dt: f32,
        events: &'a [Event],
        queue: &'a mut SubmissionQueue,
        assets: &'a Assets,
    ) -> Self {
        Self {
            dt,
            events,
            queue,
            assets,
            quit_requested: false,
        }
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

/// Logic run by the scene once per frame, in registration order.
pub trait System {
    fn name(&self) -> &str;

    fn update(&mut self, scene: &mut Scene, ctx: &mut FrameContext);
}

/// Adapts a closure into a [`System`].
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut Scene, &mut FrameContext) + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut Scene, &mut FrameContext) + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, scene: &mut Scene, ctx: &mut FrameContext) {
        (self.func)(scene, ctx);
    }
}
