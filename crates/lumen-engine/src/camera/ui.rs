use std::cell::Cell;

use glam::{Mat4, Vec2};

use super::{Camera, CameraMatrices};

/// Pixel-locked camera for overlay geometry.
///
/// UI space is measured in pixels with the origin at the viewport center and
/// +Y down, so `(-w/2, -h/2)` is the top-left corner of the screen. The view
/// matrix is always identity; position, rotation and zoom are fixed.
#[derive(Debug, Clone)]
pub struct UiCamera {
    viewport: (f32, f32),
    cache: Cell<Option<CameraMatrices>>,
}

impl UiCamera {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            viewport: (viewport_width.max(1.0), viewport_height.max(1.0)),
            cache: Cell::new(None),
        }
    }

    fn build(width: f32, height: f32) -> CameraMatrices {
        let hw = width.max(1.0) * 0.5;
        let hh = height.max(1.0) * 0.5;
        // bottom = +hh, top = -hh: +Y points down the screen.
        let projection = Mat4::orthographic_rh(-hw, hw, hh, -hh, -1.0, 1.0);
        CameraMatrices::new(Mat4::IDENTITY, projection)
    }
}

impl Camera for UiCamera {
    fn position(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn rotation(&self) -> f32 {
        0.0
    }

    fn zoom(&self) -> f32 {
        1.0
    }

    fn update_matrices(&mut self, viewport_width: f32, viewport_height: f32) {
        let viewport = (viewport_width.max(1.0), viewport_height.max(1.0));
        if viewport != self.viewport {
            self.viewport = viewport;
            self.cache.set(None);
        }
    }

    fn matrices(&self) -> CameraMatrices {
        if let Some(m) = self.cache.get() {
            return m;
        }
        let m = Self::build(self.viewport.0, self.viewport.1);
        self.cache.set(Some(m));
        m
    }

    fn matrices_for(&self, viewport_width: f32, viewport_height: f32) -> CameraMatrices {
        if (viewport_width, viewport_height) == self.viewport {
            self.matrices()
        } else {
            Self::build(viewport_width, viewport_height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_is_identity() {
        let cam = UiCamera::new(800.0, 600.0);
        assert_eq!(cam.view_matrix(), Mat4::IDENTITY);
        assert!(cam
            .combined_matrix()
            .abs_diff_eq(cam.projection_matrix() * cam.view_matrix(), 1e-6));
    }

    #[test]
    fn origin_is_viewport_center() {
        let cam = UiCamera::new(800.0, 600.0);
        let s = cam.world_to_screen(Vec2::ZERO, 800.0, 600.0);
        assert!(s.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));

        let s = cam.world_to_screen(Vec2::new(-400.0, -300.0), 800.0, 600.0);
        assert!(s.abs_diff_eq(Vec2::ZERO, 1e-3));

        let s = cam.world_to_screen(Vec2::new(400.0, 300.0), 800.0, 600.0);
        assert!(s.abs_diff_eq(Vec2::new(800.0, 600.0), 1e-3));
    }

    #[test]
    fn round_trip_inside_viewport() {
        let cam = UiCamera::new(1280.0, 720.0);
        for p in [
            Vec2::ZERO,
            Vec2::new(-640.0, -360.0),
            Vec2::new(123.5, -77.25),
            Vec2::new(639.0, 359.0),
        ] {
            let s = cam.world_to_screen(p, 1280.0, 720.0);
            let back = cam.screen_to_world(s, 1280.0, 720.0);
            assert!(back.abs_diff_eq(p, 1e-3), "{p} -> {s} -> {back}");
        }
    }

    #[test]
    fn other_viewport_does_not_touch_cache() {
        let cam = UiCamera::new(800.0, 600.0);
        let cached = cam.projection_matrix();
        let s = cam.world_to_screen(Vec2::ZERO, 200.0, 100.0);
        assert!(s.abs_diff_eq(Vec2::new(100.0, 50.0), 1e-3));
        assert_eq!(cam.projection_matrix(), cached);
    }
}
