// renderer/passes.rs
//! The ordered pass list of one frame, decided from the submission queue
//! alone so it can be inspected without a device.
use crate::renderer::lights::light_pass_count;
use crate::renderer::material::RenderPath;
use crate::renderer::post::PostEffects;
use crate::renderer::queue::{CameraSubmission, SubmissionQueue};
use crate::renderer::shadow::{assign_shadow_slots, needs_shadow_pass};
use crate::scene::Viewport;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassKind {
    /// Point and spot shadow maps, rendered once and shared by every camera.
    SharedShadows,
    /// Directional shadow maps fitted to the current camera.
    DirectionalShadows,
    Geometry,
    Lighting { passes: usize },
    Forward,
    Skybox,
    AlphaWeight,
    AlphaBlend,
    /// The camera's post effects, ping-ponged between the post buffers.
    PostProcess { effects: PostEffects },
    Blit { viewport: Viewport },
}

#[derive(Clone, Debug)]
pub struct CameraPlan {
    pub camera: CameraSubmission,
    pub passes: Vec<PassKind>,
}

#[derive(Clone, Debug, Default)]
pub struct FramePlan {
    pub shared_shadows: bool,
    /// Shadow slot per submitted light, parallel to `SubmissionQueue::lights`.
    pub shadow_slots: Vec<Option<u32>>,
    /// Cameras in render order.
    pub cameras: Vec<CameraPlan>,
}

impl FramePlan {
    /// Plans the frame for whatever is currently queued. Lights are taken
    /// as they are; cap them first with `SubmissionQueue::lights_capped`.
    pub fn build(queue: &SubmissionQueue) -> Self {
        let cameras = queue.cameras_in_order();
        if cameras.is_empty() {
            return Self::default();
        }

        let lights = queue.lights();
        let shadow_slots = assign_shadow_slots(lights);
        let shared_shadows = needs_shadow_pass(lights, &shadow_slots, false);
        let directional_shadows = needs_shadow_pass(lights, &shadow_slots, true);
        let lighting_passes = light_pass_count(lights.len());
        let transparent = queue.instance_count(RenderPath::Transparent) > 0;

        let cameras = cameras
            .into_iter()
            .map(|camera| {
                let mut passes = Vec::with_capacity(10);
                if directional_shadows {
                    passes.push(PassKind::DirectionalShadows);
                }
                passes.push(PassKind::Geometry);
                passes.push(PassKind::Lighting {
                    passes: lighting_passes,
                });
                passes.push(PassKind::Forward);
                if camera.camera.skybox.enabled {
                    passes.push(PassKind::Skybox);
                }
                if transparent {
                    passes.push(PassKind::AlphaWeight);
                    passes.push(PassKind::AlphaBlend);
                }
                let effects = camera.camera.post_effects;
                if !effects.is_empty() {
                    passes.push(PassKind::PostProcess { effects });
                }
                passes.push(PassKind::Blit {
                    viewport: camera.camera.viewport,
                });
                CameraPlan { camera, passes }
            })
            .collect();

        Self {
            shared_shadows,
            shadow_slots,
            cameras,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Every pass of the frame in execution order.
    pub fn passes(&self) -> Vec<PassKind> {
        let shared = self.shared_shadows.then_some(PassKind::SharedShadows);
        shared
            .into_iter()
            .chain(self.cameras.iter().flat_map(|plan| plan.passes.iter().copied()))
            .collect()
    }
}
