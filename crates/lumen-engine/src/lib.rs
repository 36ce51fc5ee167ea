//! Lumen engine crate.
//!
//! A 2D rendering pipeline split into three phases: one-time preprocessing
//! (shader compilation, buffer allocation), per-frame draw submission, and a
//! bloom post pass. GPU work goes through the [`gpu::GpuBackend`] seam, with a
//! wgpu implementation in [`device`] and a recording one for tests.
//!
//! Typical flow:
//! 1. build a [`config::RenderConfiguration`]
//! 2. [`render::RenderPreprocessor::preprocess`] once
//! 3. [`render::RenderProcessor::new`], then per frame
//!    [`post::PostProcessor::begin_frame`], draws,
//!    [`post::PostProcessor::finalize_frame`] and `present`

pub mod error;
pub mod logging;

pub mod coords;
pub mod config;
pub mod vertex;
pub mod camera;

pub mod gpu;
pub mod device;
pub mod shader;
pub mod render;
pub mod post;

pub mod time;
pub mod core;
pub mod window;

pub use error::{RenderError, Result};
