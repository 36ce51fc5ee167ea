//! Render configuration.
//!
//! A [`RenderConfiguration`] is an immutable value produced by its builder and
//! consumed once by the preprocessor. It never touches the GPU or the
//! filesystem.

mod render_config;

pub use render_config::{
    CameraConfig, PostProcessConfig, QualityConfig, RenderConfiguration,
    RenderConfigurationBuilder, ResourceLimits, MAX_BLUR_RADIUS,
};
