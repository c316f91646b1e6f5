// renderer/post.rs
//! Full-screen effects run after transparency, before the final blit.
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::scene::{Camera, Projection};

bitflags! {
    /// Post-processing effects of a camera, applied in declaration order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PostEffects: u8 {
        /// Blends towards the skybox colour with camera-space depth.
        const FOG = 1 << 0;
        /// Darkens depth and normal discontinuities.
        const OUTLINE = 1 << 1;
        const BLUR = 1 << 2;
        const GREYSCALE = 1 << 3;
        const INVERT = 1 << 4;
    }
}

impl PostEffects {
    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

/// Number of images an effect or the blit can read: the forward composite
/// and the two post-process buffers.
pub const POST_SOURCES: usize = 3;

/// Image a post effect or the final blit reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostSource {
    Forward,
    Post(usize),
}

impl PostSource {
    /// Slot of the source in the renderer's per-source bind groups.
    pub fn index(self) -> usize {
        match self {
            PostSource::Forward => 0,
            PostSource::Post(buffer) => 1 + buffer,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostStep {
    pub effect: PostEffects,
    pub source: PostSource,
    /// Post-process buffer written, 0 or 1.
    pub target: usize,
}

/// The effects in order, each reading the previous result and writing the
/// other post-process buffer. The first reads the forward composite.
pub fn post_chain(effects: PostEffects) -> Vec<PostStep> {
    effects
        .iter()
        .enumerate()
        .map(|(index, effect)| PostStep {
            effect,
            source: match index {
                0 => PostSource::Forward,
                _ => PostSource::Post((index - 1) % 2),
            },
            target: index % 2,
        })
        .collect()
}

/// Image holding a camera's finished frame once its effects have run.
pub fn final_source(effects: PostEffects) -> PostSource {
    match effects.count() {
        0 => PostSource::Forward,
        count => PostSource::Post((count - 1) % 2),
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct PostUniform {
    pub fog_colour: [f32; 4],
    /// x near, y far, zw target size in pixels.
    pub planes: [f32; 4],
    /// x 1 for orthographic projections.
    pub flags: [u32; 4],
}

impl PostUniform {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            fog_colour: camera.skybox.colour.extend(1.0).to_array(),
            planes: [camera.near, camera.far, width as f32, height as f32],
            flags: [(camera.projection == Projection::Orthographic) as u32, 0, 0, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_effects_blit_the_forward_composite() {
        assert!(post_chain(PostEffects::empty()).is_empty());
        assert_eq!(final_source(PostEffects::empty()), PostSource::Forward);
    }

    #[test]
    fn effects_ping_pong_in_declaration_order() {
        let effects = PostEffects::INVERT | PostEffects::FOG | PostEffects::BLUR;
        let chain = post_chain(effects);
        assert_eq!(
            chain,
            vec![
                PostStep {
                    effect: PostEffects::FOG,
                    source: PostSource::Forward,
                    target: 0,
                },
                PostStep {
                    effect: PostEffects::BLUR,
                    source: PostSource::Post(0),
                    target: 1,
                },
                PostStep {
                    effect: PostEffects::INVERT,
                    source: PostSource::Post(1),
                    target: 0,
                },
            ]
        );
        assert_eq!(final_source(effects), PostSource::Post(0));
        assert_eq!(final_source(PostEffects::FOG | PostEffects::BLUR), PostSource::Post(1));
    }

    #[test]
    fn no_step_reads_the_buffer_it_writes() {
        let chain = post_chain(PostEffects::all());
        assert_eq!(chain.len(), 5);
        for step in &chain {
            assert_ne!(step.source, PostSource::Post(step.target));
            assert!(step.source.index() < POST_SOURCES);
        }
    }

    #[test]
    fn uniform_carries_the_camera_planes() {
        let camera = Camera {
            projection: Projection::Orthographic,
            ..Camera::default()
        };
        let uniform = PostUniform::new(&camera, 1280, 720);
        assert_eq!(uniform.planes, [0.5, 500.0, 1280.0, 720.0]);
        assert_eq!(uniform.flags[0], 1);
        assert_eq!(std::mem::size_of::<PostUniform>() % 16, 0);
    }
}
