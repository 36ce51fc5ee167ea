//! Screen-space bloom: capture targets, blur kernel and the frame compositor.

mod bloom;
mod kernel;
mod targets;

pub use bloom::{BloomPrograms, BloomResources, PostProcessor};
pub use kernel::{gaussian_kernel, gaussian_weights, pack_weights};
pub use targets::{PostTargets, RenderTarget, FULLSCREEN_QUAD};
