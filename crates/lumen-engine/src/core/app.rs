use std::sync::Arc;

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::time::FrameTime;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`crate::window::Runtime`].
///
/// The runtime owns the window; the app owns everything built on it (GPU
/// backend, pipeline, cameras). An error from any callback stops the event
/// loop and is returned from `Runtime::run`.
pub trait App {
    /// Called once, after the window exists.
    fn on_start(&mut self, window: Arc<Window>) -> Result<()>;

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called when the window's physical size changes to a non-zero size.
    fn on_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let _ = size;
        Ok(())
    }

    /// Called once per redraw.
    fn on_frame(&mut self, time: FrameTime) -> Result<AppControl>;

    /// Called once before the event loop exits.
    fn on_exit(&mut self) {}
}
