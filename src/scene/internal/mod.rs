mod rendering;
mod transforms;

pub(crate) use rendering::submit_renderables;
pub(crate) use transforms::propagate_transforms;
