//! Coordinate and color types shared across the pipeline.
//!
//! Screen space:
//! - physical pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! World and UI spaces are defined by the cameras in [`crate::camera`].

mod color;
mod viewport;

pub use color::ColorRgba;
pub use viewport::Viewport;
