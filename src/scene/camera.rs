use glam::{Mat4, Vec3};

use crate::asset::Handle;
use crate::ecs::Component;
use crate::renderer::{PostEffects, Texture};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Normalised screen rectangle; (0,0) is the bottom left, (1,1) the top right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub bottom_x: f32,
    pub bottom_y: f32,
    pub top_x: f32,
    pub top_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

impl Viewport {
    pub const FULL: Self = Self {
        bottom_x: 0.0,
        bottom_y: 0.0,
        top_x: 1.0,
        top_y: 1.0,
    };

    pub fn new(bottom_x: f32, bottom_y: f32, top_x: f32, top_y: f32) -> Self {
        Self {
            bottom_x,
            bottom_y,
            top_x,
            top_y,
        }
    }

    /// Pixel rectangle `(x, y, width, height)` with a top-left origin, the
    /// convention of `RenderPass::set_viewport`. The rectangle always covers
    /// at least one pixel and lies inside the target.
    pub fn pixel_rect(&self, width: u32, height: u32) -> [f32; 4] {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let x0 = self.bottom_x.clamp(0.0, 1.0) * w;
        let x1 = self.top_x.clamp(0.0, 1.0) * w;
        let y0 = self.bottom_y.clamp(0.0, 1.0) * h;
        let y1 = self.top_y.clamp(0.0, 1.0) * h;
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));

        let x = x0.min(w - 1.0);
        let y = (h - y1).min(h - 1.0);
        let width = (x1 - x0).max(1.0).min(w - x);
        let height = (y1 - y0).max(1.0).min(h - y);
        [x, y, width, height]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Skybox {
    pub enabled: bool,
    pub colour: Vec3,
    pub cubemap: Option<Handle<Texture>>,
}

impl Default for Skybox {
    fn default() -> Self {
        Self {
            enabled: true,
            colour: Vec3::new(0.35, 0.45, 0.6),
            cubemap: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Height of the orthographic view volume.
    pub ortho_size: f32,
    /// Render order; lower depths render first.
    pub depth: u8,
    pub viewport: Viewport,
    pub skybox: Skybox,
    pub post_effects: PostEffects,
}

impl Component for Camera {}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            near: 0.5,
            far: 500.0,
            aspect: 16.0 / 9.0,
            fov: std::f32::consts::FRAC_PI_4,
            ortho_size: 5.0,
            depth: 0,
            viewport: Viewport::FULL,
            skybox: Skybox::default(),
            post_effects: PostEffects::empty(),
        }
    }
}

impl Camera {
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
            }
            Projection::Orthographic => {
                let half_height = self.ortho_size * 0.5;
                let half_width = half_height * self.aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cam = Camera::default();
        assert_eq!(cam.near, 0.5);
        assert_eq!(cam.far, 500.0);
        assert!((cam.fov.to_degrees() - 45.0).abs() < 1e-4);
        assert_eq!(cam.depth, 0);
        assert_eq!(cam.viewport, Viewport::FULL);
    }

    #[test]
    fn projection_is_invertible() {
        for projection in [Projection::Perspective, Projection::Orthographic] {
            let cam = Camera {
                projection,
                ..Camera::default()
            };
            let p = cam.projection_matrix();
            assert!((p * p.inverse()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
        }
    }

    #[test]
    fn viewport_flips_to_top_left_origin() {
        let vp = Viewport::new(0.75, 0.75, 1.0, 1.0);
        assert_eq!(vp.pixel_rect(800, 400), [600.0, 0.0, 200.0, 100.0]);
        assert_eq!(Viewport::FULL.pixel_rect(800, 400), [0.0, 0.0, 800.0, 400.0]);
    }

    #[test]
    fn degenerate_viewports_stay_inside_the_target() {
        let cases = [
            Viewport::new(1.0, 0.0, 1.0, 1.0),
            Viewport::new(0.0, 0.0, 1.0, 0.0),
            Viewport::new(1.0, 1.0, 1.0, 1.0),
            Viewport::new(0.5, 0.5, 0.5, 0.5),
            Viewport::new(2.0, -1.0, 3.0, 0.0),
        ];
        for vp in cases {
            let [x, y, width, height] = vp.pixel_rect(800, 400);
            assert!(width >= 1.0 && height >= 1.0, "{vp:?}");
            assert!(x >= 0.0 && y >= 0.0, "{vp:?}");
            assert!(x + width <= 800.0 && y + height <= 400.0, "{vp:?}");
        }
        assert_eq!(Viewport::new(1.0, 1.0, 1.0, 1.0).pixel_rect(800, 400), [799.0, 0.0, 1.0, 1.0]);
        assert_eq!(Viewport::new(0.0, 0.0, 0.0, 0.0).pixel_rect(800, 400), [0.0, 399.0, 1.0, 1.0]);
    }
}
