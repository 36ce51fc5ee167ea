use std::cell::Cell;

use glam::{Mat4, Quat, Vec2, Vec3};

use super::{Camera, CameraMatrices};
use crate::config::CameraConfig;

/// Pannable, rotatable, zoomable camera for game-world geometry.
///
/// At zoom `1` the viewport spans two world units vertically and
/// `2 * aspect` horizontally, centered on `position`. `zoom` scales the camera's
/// footprint: a zoom of `2` shows twice as much of the world.
#[derive(Debug, Clone)]
pub struct WorldCamera {
    position: Vec2,
    rotation: f32,
    zoom: f32,
    config: CameraConfig,
    viewport: (f32, f32),
    cache: Cell<Option<CameraMatrices>>,
}

impl WorldCamera {
    pub fn new(config: CameraConfig, viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
            config,
            viewport: (viewport_width.max(1.0), viewport_height.max(1.0)),
            cache: Cell::new(None),
        }
    }

    pub fn set_position(&mut self, position: Vec2) {
        if position != self.position {
            self.position = position;
            self.invalidate();
        }
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }

    /// Rotation in radians, counter-clockwise.
    pub fn set_rotation(&mut self, radians: f32) {
        if radians != self.rotation {
            self.rotation = radians;
            self.invalidate();
        }
    }

    /// Sets the zoom. Zero, negative and non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if !(zoom.is_finite() && zoom > 0.0) {
            log::warn!("WorldCamera: ignoring invalid zoom {zoom}");
            return;
        }
        if zoom != self.zoom {
            self.zoom = zoom;
            self.invalidate();
        }
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    #[inline]
    fn invalidate(&self) {
        self.cache.set(None);
    }

    /// Distance of the eye from the `z = 0` plane. Zero for orthographic cameras.
    fn eye_distance(&self) -> f32 {
        if self.config.orthographic {
            0.0
        } else {
            1.0 / (self.config.fov_y * 0.5).tan()
        }
    }

    fn build(&self, width: f32, height: f32) -> CameraMatrices {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::new(self.zoom, self.zoom, 1.0),
            Quat::from_rotation_z(self.rotation),
            self.position.extend(self.eye_distance()),
        );
        let view = transform.inverse();

        let aspect = width.max(1.0) / height.max(1.0);
        let c = &self.config;
        let projection = if c.orthographic {
            Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, c.near, c.far)
        } else {
            Mat4::perspective_rh(c.fov_y, aspect, c.near, c.far)
        };

        CameraMatrices::new(view, projection)
    }
}

impl Camera for WorldCamera {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn rotation(&self) -> f32 {
        self.rotation
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn update_matrices(&mut self, viewport_width: f32, viewport_height: f32) {
        let viewport = (viewport_width.max(1.0), viewport_height.max(1.0));
        if viewport != self.viewport {
            self.viewport = viewport;
            self.invalidate();
        }
    }

    fn matrices(&self) -> CameraMatrices {
        if let Some(m) = self.cache.get() {
            return m;
        }
        let m = self.build(self.viewport.0, self.viewport.1);
        self.cache.set(Some(m));
        m
    }

    fn matrices_for(&self, viewport_width: f32, viewport_height: f32) -> CameraMatrices {
        if (viewport_width, viewport_height) == self.viewport {
            self.matrices()
        } else {
            self.build(viewport_width, viewport_height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perspective() -> CameraConfig {
        CameraConfig {
            fov_y: 1.0,
            near: 0.1,
            far: 100.0,
            orthographic: false,
        }
    }

    fn configured(config: CameraConfig) -> Vec<WorldCamera> {
        let mut cams = Vec::new();
        for (pos, rot, zoom) in [
            (Vec2::ZERO, 0.0, 1.0),
            (Vec2::new(3.5, -2.0), 0.0, 1.0),
            (Vec2::new(-1.0, 4.0), 0.7, 1.0),
            (Vec2::new(0.25, 0.5), -2.3, 2.5),
            (Vec2::new(100.0, -50.0), 3.0, 0.1),
        ] {
            let mut cam = WorldCamera::new(config, 800.0, 600.0);
            cam.set_position(pos);
            cam.set_rotation(rot);
            cam.set_zoom(zoom);
            cams.push(cam);
        }
        cams
    }

    // ── round trip ────────────────────────────────────────────────────────

    #[test]
    fn orthographic_round_trip() {
        for cam in configured(CameraConfig::default()) {
            for p in [Vec2::ZERO, Vec2::new(0.3, -0.8), Vec2::new(2.0, 1.0)] {
                let world = cam.position() + p * cam.zoom();
                let screen = cam.world_to_screen(world, 800.0, 600.0);
                let back = cam.screen_to_world(screen, 800.0, 600.0);
                assert!(back.abs_diff_eq(world, 1e-3), "{world} -> {screen} -> {back}");
            }
        }
    }

    #[test]
    fn perspective_round_trip() {
        for cam in configured(perspective()) {
            for p in [Vec2::ZERO, Vec2::new(0.5, 0.5), Vec2::new(-1.2, 0.4)] {
                let world = cam.position() + p * cam.zoom();
                let screen = cam.world_to_screen(world, 800.0, 600.0);
                let back = cam.screen_to_world(screen, 800.0, 600.0);
                assert!(back.abs_diff_eq(world, 1e-3), "{world} -> {screen} -> {back}");
            }
        }
    }

    #[test]
    fn screen_round_trip_for_pixels_inside_viewport() {
        for cam in configured(CameraConfig::default()) {
            for px in [Vec2::new(0.0, 0.0), Vec2::new(400.0, 300.0), Vec2::new(799.0, 1.0)] {
                let world = cam.screen_to_world(px, 800.0, 600.0);
                let back = cam.world_to_screen(world, 800.0, 600.0);
                assert!(back.abs_diff_eq(px, 1e-2), "{px} -> {back}");
            }
        }
    }

    // ── matrix composition ────────────────────────────────────────────────

    #[test]
    fn combined_is_view_then_projection() {
        for config in [CameraConfig::default(), perspective()] {
            for cam in configured(config) {
                let expected = cam.projection_matrix() * cam.view_matrix();
                assert!(cam.combined_matrix().abs_diff_eq(expected, 1e-5));
            }
        }
    }

    #[test]
    fn position_maps_to_viewport_center() {
        for cam in configured(CameraConfig::default()) {
            let screen = cam.world_to_screen(cam.position(), 800.0, 600.0);
            assert!(screen.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));
        }
    }

    #[test]
    fn zoom_widens_the_visible_area() {
        let mut cam = WorldCamera::new(CameraConfig::default(), 800.0, 600.0);
        let top = cam.world_to_screen(Vec2::new(0.0, 1.0), 800.0, 600.0);
        assert!(top.abs_diff_eq(Vec2::new(400.0, 0.0), 1e-3));

        cam.set_zoom(2.0);
        let top = cam.world_to_screen(Vec2::new(0.0, 1.0), 800.0, 600.0);
        assert!(top.abs_diff_eq(Vec2::new(400.0, 150.0), 1e-3));
    }

    // ── caching ───────────────────────────────────────────────────────────

    #[test]
    fn mutation_invalidates_cached_matrices() {
        let mut cam = WorldCamera::new(CameraConfig::default(), 800.0, 600.0);
        let before = cam.combined_matrix();
        cam.set_position(Vec2::new(1.0, 0.0));
        assert_ne!(cam.combined_matrix(), before);
    }

    #[test]
    fn viewport_change_invalidates_cached_matrices() {
        let mut cam = WorldCamera::new(CameraConfig::default(), 800.0, 600.0);
        let before = cam.projection_matrix();
        cam.update_matrices(600.0, 600.0);
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn invalid_zoom_is_ignored() {
        let mut cam = WorldCamera::new(CameraConfig::default(), 800.0, 600.0);
        cam.set_zoom(0.0);
        cam.set_zoom(-3.0);
        cam.set_zoom(f32::NAN);
        assert_eq!(cam.zoom(), 1.0);
    }
}
