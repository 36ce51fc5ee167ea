use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Redraw every loop iteration instead of only on request.
    pub continuous_redraw: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            continuous_redraw: true,
        }
    }
}

/// Single-window event loop.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `app` until it exits or fails.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct RuntimeState<A: App> {
    config: RuntimeConfig,
    app: A,
    window: Option<Arc<Window>>,
    clock: FrameClock,
    error: Option<anyhow::Error>,
    exiting: bool,
}

impl<A: App> RuntimeState<A> {
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            window: None,
            clock: FrameClock::new(),
            error: None,
            exiting: false,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        self.app
            .on_start(window.clone())
            .context("application failed to start")?;
        self.clock.reset();
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if !self.exiting {
            self.exiting = true;
            self.app.on_exit();
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("runtime: {err:#}");
        self.error.get_or_insert(err);
        self.exit(event_loop);
    }
}

impl<A: App> ApplicationHandler for RuntimeState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
        if self.config.continuous_redraw {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id || self.exiting {
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::Resized(size) => {
                // Minimized windows report zero; keep the last valid size.
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Err(err) = self.app.on_resize(size) {
                    self.fail(event_loop, err);
                    return;
                }
                window.request_redraw();
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                if size.width > 0 && size.height > 0 {
                    if let Err(err) = self.app.on_resize(size) {
                        self.fail(event_loop, err);
                        return;
                    }
                }
                window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                let time = self.clock.tick();
                match self.app.on_frame(time) {
                    Ok(AppControl::Continue) => {}
                    Ok(AppControl::Exit) => self.exit(event_loop),
                    Err(err) => self.fail(event_loop, err),
                }
            }

            _ => {}
        }
    }
}
