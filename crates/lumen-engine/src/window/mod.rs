//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single window, and forwards events and
//! redraws to an [`crate::core::App`].

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
