//! wgpu implementation of the GPU seam.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - translating [`crate::gpu::GpuBackend`] calls into render passes

mod backend;
mod init;
mod pipeline;
mod surface;

pub use backend::WgpuBackend;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
