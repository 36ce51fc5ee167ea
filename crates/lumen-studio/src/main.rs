use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Affine2, Vec2};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

use lumen_engine::camera::{Camera, CameraManager};
use lumen_engine::config::RenderConfiguration;
use lumen_engine::coords::ColorRgba;
use lumen_engine::core::{App, AppControl};
use lumen_engine::device::{GpuInit, WgpuBackend};
use lumen_engine::gpu::{GpuError, Primitive, TextureId};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::post::PostProcessor;
use lumen_engine::render::{RenderPreprocessor, RenderProcessor, TextureImage};
use lumen_engine::shader::{DirectoryShaderLoader, ShaderLibrary, ShaderMode};
use lumen_engine::time::{FpsCounter, FrameTime};
use lumen_engine::vertex::{Mesh2d, Vertex};
use lumen_engine::window::{Runtime, RuntimeConfig};
use lumen_engine::RenderError;

const CLEAR: ColorRgba = ColorRgba::new(0.02, 0.02, 0.05, 1.0);

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "Lumen Studio".to_string(),
            ..RuntimeConfig::default()
        },
        Studio::default(),
    )
}

/// Shader sources come from `LUMEN_SHADER_DIR` when set, else the built-in set.
fn shader_library() -> ShaderLibrary {
    match std::env::var_os("LUMEN_SHADER_DIR") {
        Some(dir) => {
            log::info!("studio: loading shaders from {}", dir.to_string_lossy());
            ShaderLibrary::from_loader(DirectoryShaderLoader::new(dir))
        }
        None => ShaderLibrary::builtin(),
    }
}

#[derive(Default)]
struct Studio {
    scene: Option<Scene>,
    cursor: Vec2,
}

struct Scene {
    window: Arc<Window>,
    processor: RenderProcessor<WgpuBackend>,
    post: PostProcessor,
    cameras: CameraManager,
    checker: TextureId,
    hexagon: Mesh2d,
    tile: Mesh2d,
    marker: Option<Vec2>,
    fps: FpsCounter,
}

impl Scene {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let config = RenderConfiguration::builder()
            .viewport(size.width.max(1) as i64, size.height.max(1) as i64)
            .clear_color(CLEAR)
            .bloom(true)
            .bloom_threshold(1.0)
            .bloom_intensity(0.9)
            .blur_radius(8)
            .anisotropy(8)
            .build()
            .context("invalid render configuration")?;

        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            GpuInit::from_quality(config.quality()),
        ))?;

        let mut pre = RenderPreprocessor::new(backend, shader_library());
        let report = pre.preprocess(&config).context("preprocessing failed")?;
        if !report.bloom_active() {
            log::warn!("studio: running without bloom ({:?})", report.bloom);
        }
        let mut processor = RenderProcessor::new(pre)?;

        let checker = processor.load_texture(
            "studio/checker",
            &TextureImage::checker(64, 64, 8, [235, 235, 235, 255], [40, 90, 160, 255]),
        )?;

        Ok(Self {
            window,
            processor,
            post: PostProcessor::new(),
            cameras: CameraManager::new(*config.camera(), config.viewport()),
            checker,
            hexagon: Mesh2d::regular_polygon(6, 0.35),
            tile: Mesh2d::quad(Vec2::splat(0.6)),
            marker: None,
            fps: FpsCounter::default(),
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let (w, h) = (size.width as i64, size.height as i64);
        self.processor.resize(w, h)?;
        self.cameras.update_viewport(w, h)?;
        Ok(())
    }

    fn pick(&mut self, cursor: Vec2) {
        let world = self.cameras.screen_to_game_world(cursor);
        let ui = self.cameras.screen_to_ui_world(cursor);
        log::info!(
            "studio: pick screen ({:.0}, {:.0}) -> world ({:.3}, {:.3}), ui ({:.0}, {:.0})",
            cursor.x,
            cursor.y,
            world.x,
            world.y,
            ui.x,
            ui.y
        );
        self.marker = Some(world);
    }

    fn frame(&mut self, time: &FrameTime) -> Result<(), RenderError> {
        self.post.begin_frame(self.processor.context_mut())?;
        if !self.processor.context().bloom_active() {
            self.processor.clear(CLEAR);
        }

        self.draw_world(time)?;
        self.draw_ui()?;

        self.post.finalize_frame(self.processor.context_mut())?;
        self.processor.present()
    }

    fn draw_world(&mut self, time: &FrameTime) -> Result<(), RenderError> {
        let viewport = self.processor.viewport();
        let p = &mut self.processor;
        p.set_active_camera(self.cameras.world_mut(), viewport);
        p.set_primitive_type(Primitive::Triangles);

        // Textured tile; its UVs stay pinned while it spins.
        let spin = Affine2::from_angle_translation(time.elapsed * 0.6, Vec2::new(-0.9, 0.0));
        let tile = self.tile.transformed(&spin);
        p.set_shader_mode(ShaderMode::Baseline);
        p.set_color(ColorRgba::white());
        p.set_texture(Some(self.checker));
        p.update_vertices(&tile.vertices)?;
        p.draw_indexed(&tile.indices)?;
        p.set_texture(None);

        p.set_shader_mode(ShaderMode::SoftGlow);
        p.set_color(ColorRgba::new(0.4, 0.8, 1.0, 1.0));
        p.update_vertices(&self.hexagon.vertices)?;
        p.draw_indexed(&self.hexagon.indices)?;

        // HDR quads feed the bloom pass.
        p.set_shader_mode(ShaderMode::Bloom);
        p.set_color(ColorRgba::white());
        let pulse = 2.0 + (time.elapsed * 2.0).sin();
        for (i, x) in [0.7_f32, 1.0, 1.3].into_iter().enumerate() {
            let hdr = [pulse, 0.5 + i as f32 * 0.6, 0.3, 1.0];
            p.update_vertices(&hdr_quad(Vec2::new(x, 0.4 - i as f32 * 0.4), 0.1, hdr))?;
            p.draw_indexed(&[0, 1, 2, 0, 2, 3])?;
        }

        p.set_shader_mode(ShaderMode::DebugUv);
        let uv = self
            .tile
            .transformed(&Affine2::from_translation(Vec2::new(-0.9, -0.75)));
        p.update_vertices(&uv.vertices)?;
        p.draw_indexed(&uv.indices)?;

        if let Some(world) = self.marker {
            p.set_shader_mode(ShaderMode::Baseline);
            p.set_color(ColorRgba::new(1.0, 0.3, 0.2, 1.0));
            p.set_primitive_type(Primitive::LineStrip);
            let r = 0.05;
            p.update_positions(&[
                world.x - r, world.y,
                world.x, world.y + r,
                world.x + r, world.y,
                world.x, world.y - r,
                world.x - r, world.y,
            ])?;
            p.draw()?;
            p.set_primitive_type(Primitive::Triangles);
        }
        Ok(())
    }

    fn draw_ui(&mut self) -> Result<(), RenderError> {
        let viewport = self.processor.viewport();
        let p = &mut self.processor;
        p.set_active_camera(self.cameras.ui_mut(), viewport);
        p.set_shader_mode(ShaderMode::Baseline);
        p.set_primitive_type(Primitive::Triangles);
        p.set_texture(None);

        // Status bar along the top edge, in UI pixels (origin at the center).
        let half = Vec2::new(viewport.width_f32(), viewport.height_f32()) * 0.5;
        let (top, bottom) = (-half.y, -half.y + 28.0);
        p.set_color(ColorRgba::new(0.08, 0.08, 0.12, 0.9));
        p.update_positions(&[
            -half.x, top, half.x, top, half.x, bottom,
            -half.x, top, half.x, bottom, -half.x, bottom,
        ])?;
        p.draw()?;

        // Frame-rate gauge: one pixel per frame per second, capped to the bar.
        let width = self.fps.fps().min(viewport.width_f32() - 16.0).max(0.0);
        let (x0, y0, y1) = (-half.x + 8.0, top + 8.0, top + 20.0);
        p.set_color(ColorRgba::new(0.3, 0.9, 0.4, 1.0));
        p.update_positions(&[
            x0, y0, x0 + width, y0, x0 + width, y1,
            x0, y0, x0 + width, y1, x0, y1,
        ])?;
        p.draw()
    }
}

fn hdr_quad(center: Vec2, half: f32, color: [f32; 4]) -> [Vertex; 4] {
    let corner = |dx: f32, dy: f32, u: f32, v: f32| {
        Vertex::new([center.x + dx * half, center.y + dy * half], [u, v], color)
    };
    [
        corner(-1.0, -1.0, 0.0, 1.0),
        corner(1.0, -1.0, 1.0, 1.0),
        corner(1.0, 1.0, 1.0, 0.0),
        corner(-1.0, 1.0, 0.0, 0.0),
    ]
}

impl App for Studio {
    fn on_start(&mut self, window: Arc<Window>) -> Result<()> {
        self.scene = Some(Scene::new(window)?);
        log::info!("studio: click to pick, wheel to zoom, arrows to pan, R to rotate");
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => scene.pick(self.cursor),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                scene.cameras.world_mut().zoom_by(1.1_f32.powf(steps));
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                let world = scene.cameras.world_mut();
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
                    PhysicalKey::Code(KeyCode::ArrowLeft) => world.pan(Vec2::new(-0.1, 0.0)),
                    PhysicalKey::Code(KeyCode::ArrowRight) => world.pan(Vec2::new(0.1, 0.0)),
                    PhysicalKey::Code(KeyCode::ArrowUp) => world.pan(Vec2::new(0.0, 0.1)),
                    PhysicalKey::Code(KeyCode::ArrowDown) => world.pan(Vec2::new(0.0, -0.1)),
                    PhysicalKey::Code(KeyCode::KeyR) => {
                        let r = world.rotation();
                        world.set_rotation(r + 0.1);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        match self.scene.as_mut() {
            Some(scene) => scene.resize(size),
            None => Ok(()),
        }
    }

    fn on_frame(&mut self, time: FrameTime) -> Result<AppControl> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(AppControl::Continue);
        };
        let fps = scene.fps.record(&time);
        if time.index % 120 == 0 {
            scene
                .window
                .set_title(&format!("Lumen Studio · {fps:.0} fps"));
        }

        match scene.frame(&time) {
            Ok(()) => Ok(AppControl::Continue),
            // Lost/outdated surfaces are reconfigured by the backend; drop this frame.
            Err(RenderError::Gpu(GpuError::Surface(msg))) => {
                log::warn!("studio: frame skipped: {msg}");
                scene.post.reset_frame(scene.processor.context_mut());
                Ok(AppControl::Continue)
            }
            Err(err) => Err(err).context("frame failed"),
        }
    }

    fn on_exit(&mut self) {
        if let Some(scene) = self.scene.take() {
            let backend = scene.processor.dispose();
            log::info!(
                "studio: released pipeline ({} cached pipelines)",
                backend.pipeline_count()
            );
        }
    }
}
