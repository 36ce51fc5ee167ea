//! World and UI cameras.
//!
//! Both cameras expose the same [`Camera`] capability. Matrices follow glam's
//! column-vector convention: the combined matrix applies the view first and the
//! projection second, `combined = projection * view`.
//!
//! Screen coordinates are pixels with the origin at the top-left corner and +Y
//! pointing down.

mod manager;
mod ui;
mod world;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

pub use manager::CameraManager;
pub use ui::UiCamera;
pub use world::WorldCamera;

/// View, projection and their composition for one viewport size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub combined: Mat4,
}

impl CameraMatrices {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            combined: projection * view,
        }
    }

    /// Projects a point on the `z = 0` plane to screen pixels.
    pub fn world_to_screen(&self, point: Vec2, width: f32, height: f32) -> Vec2 {
        let clip = self.combined * point.extend(0.0).extend(1.0);
        let ndc = clip.xy() / clip.w;
        Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height)
    }

    /// Casts a ray through a screen pixel and intersects it with `z = 0`.
    pub fn screen_to_world(&self, point: Vec2, width: f32, height: f32) -> Vec2 {
        let ndc = Vec2::new(point.x / width * 2.0 - 1.0, 1.0 - point.y / height * 2.0);
        let inverse = self.combined.inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));

        let dz = far.z - near.z;
        if dz.abs() <= f32::EPSILON {
            return near.truncate();
        }
        let t = -near.z / dz;
        (near + (far - near) * t).truncate()
    }
}

/// Capability shared by every camera.
///
/// Implementors cache their matrices for the viewport passed to
/// [`Camera::update_matrices`] and rebuild them lazily after a property change.
/// The transform helpers accept an explicit viewport; a viewport other than the
/// cached one is computed on the fly without touching the cache.
pub trait Camera {
    fn position(&self) -> Vec2;

    fn rotation(&self) -> f32;

    fn zoom(&self) -> f32;

    /// Records the viewport the cached matrices are built for.
    fn update_matrices(&mut self, viewport_width: f32, viewport_height: f32);

    /// Matrices for the cached viewport.
    fn matrices(&self) -> CameraMatrices;

    /// Matrices for an arbitrary viewport.
    fn matrices_for(&self, viewport_width: f32, viewport_height: f32) -> CameraMatrices;

    fn view_matrix(&self) -> Mat4 {
        self.matrices().view
    }

    fn projection_matrix(&self) -> Mat4 {
        self.matrices().projection
    }

    fn combined_matrix(&self) -> Mat4 {
        self.matrices().combined
    }

    fn world_to_screen(&self, point: Vec2, viewport_width: f32, viewport_height: f32) -> Vec2 {
        self.matrices_for(viewport_width, viewport_height)
            .world_to_screen(point, viewport_width, viewport_height)
    }

    fn screen_to_world(&self, point: Vec2, viewport_width: f32, viewport_height: f32) -> Vec2 {
        self.matrices_for(viewport_width, viewport_height)
            .screen_to_world(point, viewport_width, viewport_height)
    }
}
