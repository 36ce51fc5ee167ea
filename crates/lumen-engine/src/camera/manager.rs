use glam::Vec2;

use super::{Camera, UiCamera, WorldCamera};
use crate::config::CameraConfig;
use crate::coords::Viewport;
use crate::error::Result;

/// Owns the world and UI cameras and keeps them on the same viewport.
#[derive(Debug, Clone)]
pub struct CameraManager {
    world: WorldCamera,
    ui: UiCamera,
    viewport: Viewport,
}

impl CameraManager {
    pub fn new(config: CameraConfig, viewport: Viewport) -> Self {
        let (w, h) = (viewport.width_f32(), viewport.height_f32());
        Self {
            world: WorldCamera::new(config, w, h),
            ui: UiCamera::new(w, h),
            viewport,
        }
    }

    /// Resizes both cameras.
    ///
    /// Fails with [`crate::RenderError::InvalidViewport`] if either dimension is
    /// not positive; the cameras are left untouched in that case.
    pub fn update_viewport(&mut self, width: i64, height: i64) -> Result<()> {
        let viewport = Viewport::try_new(width, height)?;
        self.viewport = viewport;
        let (w, h) = (viewport.width_f32(), viewport.height_f32());
        self.world.update_matrices(w, h);
        self.ui.update_matrices(w, h);
        Ok(())
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn world(&self) -> &WorldCamera {
        &self.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut WorldCamera {
        &mut self.world
    }

    #[inline]
    pub fn ui(&self) -> &UiCamera {
        &self.ui
    }

    #[inline]
    pub fn ui_mut(&mut self) -> &mut UiCamera {
        &mut self.ui
    }

    /// Picks the game-world point under a screen pixel.
    pub fn screen_to_game_world(&self, screen: Vec2) -> Vec2 {
        let (w, h) = self.size();
        self.world.screen_to_world(screen, w, h)
    }

    /// Converts a screen pixel to UI space.
    pub fn screen_to_ui_world(&self, screen: Vec2) -> Vec2 {
        let (w, h) = self.size();
        self.ui.screen_to_world(screen, w, h)
    }

    pub fn game_world_to_screen(&self, world: Vec2) -> Vec2 {
        let (w, h) = self.size();
        self.world.world_to_screen(world, w, h)
    }

    pub fn ui_to_screen(&self, ui: Vec2) -> Vec2 {
        let (w, h) = self.size();
        self.ui.world_to_screen(ui, w, h)
    }

    fn size(&self) -> (f32, f32) {
        (self.viewport.width_f32(), self.viewport.height_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    fn manager() -> CameraManager {
        CameraManager::new(
            CameraConfig::default(),
            Viewport::try_new(800, 600).unwrap(),
        )
    }

    #[test]
    fn update_viewport_rejects_non_positive_sizes() {
        let mut m = manager();
        for (w, h) in [(0, 600), (800, 0), (-5, 10), (10, -5)] {
            let err = m.update_viewport(w, h).unwrap_err();
            assert!(matches!(err, RenderError::InvalidViewport { .. }));
        }
        assert_eq!(m.viewport(), Viewport::try_new(800, 600).unwrap());
    }

    #[test]
    fn update_viewport_resizes_both_cameras() {
        let mut m = manager();
        m.update_viewport(1024, 512).unwrap();
        let center = m.ui_to_screen(Vec2::ZERO);
        assert!(center.abs_diff_eq(Vec2::new(512.0, 256.0), 1e-3));
        let center = m.game_world_to_screen(m.world().position());
        assert!(center.abs_diff_eq(Vec2::new(512.0, 256.0), 1e-3));
    }

    #[test]
    fn delegating_transforms_round_trip() {
        let mut m = manager();
        m.world_mut().set_position(Vec2::new(2.0, -1.0));
        m.world_mut().set_rotation(0.4);
        m.world_mut().set_zoom(1.5);

        let px = Vec2::new(640.0, 120.0);
        let world = m.screen_to_game_world(px);
        assert!(m.game_world_to_screen(world).abs_diff_eq(px, 1e-2));

        let ui = m.screen_to_ui_world(px);
        assert!(ui.abs_diff_eq(Vec2::new(240.0, -180.0), 1e-3));
        assert!(m.ui_to_screen(ui).abs_diff_eq(px, 1e-3));
    }
}
