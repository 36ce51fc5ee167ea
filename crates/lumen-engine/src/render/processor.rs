use glam::Mat4;

use super::{RenderContext, RenderPreprocessor, TextureImage};
use crate::camera::Camera;
use crate::coords::{ColorRgba, Viewport};
use crate::error::{RenderError, Result};
use crate::gpu::{GpuBackend, Primitive, TextureId, UniformValue};
use crate::shader::{ProgramEntry, ShaderMode};
use crate::vertex::{
    canonical_layout, canonicalize, canonicalize_positions, canonicalize_raw, Vertex,
    VertexFormat, VertexLayout,
};

/// Draw state retained between calls and applied to every draw.
#[derive(Debug, Copy, Clone)]
struct DrawState {
    mode: ShaderMode,
    color: ColorRgba,
    matrix: Mat4,
    primitive: Primitive,
    texture: Option<TextureId>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            mode: ShaderMode::Baseline,
            color: ColorRgba::white(),
            matrix: Mat4::IDENTITY,
            primitive: Primitive::Triangles,
            texture: None,
        }
    }
}

/// Per-frame draw submission.
///
/// Every upload path converges on the canonical [`Vertex`]. Each `draw` is
/// submitted immediately with the state current at the time of the call.
#[derive(Debug)]
pub struct RenderProcessor<B: GpuBackend> {
    ctx: RenderContext<B>,
    state: DrawState,
    uploaded: Vec<Vertex>,
}

impl<B: GpuBackend> RenderProcessor<B> {
    /// Takes over the resources of a preprocessed pipeline.
    pub fn new(preprocessor: RenderPreprocessor<B>) -> Result<Self> {
        let (backend, prepared) = preprocessor.into_prepared()?;
        let mut ctx = RenderContext::from_prepared(backend, prepared);

        let viewport = ctx.config.viewport();
        ctx.backend.bind_framebuffer(None);
        ctx.backend.set_viewport(viewport.width, viewport.height);

        let mut processor = Self {
            ctx,
            state: DrawState::default(),
            uploaded: Vec::new(),
        };
        processor.set_shader_mode(ShaderMode::Baseline);
        Ok(processor)
    }

    #[inline]
    pub fn context(&self) -> &RenderContext<B> {
        &self.ctx
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut RenderContext<B> {
        &mut self.ctx
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.ctx.backend
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.ctx.config.viewport()
    }

    // ── state ─────────────────────────────────────────────────────────────

    /// Clears the currently bound framebuffer.
    pub fn clear(&mut self, color: ColorRgba) {
        self.ctx.backend.clear(color);
    }

    pub fn set_color(&mut self, color: ColorRgba) {
        self.state.color = color;
    }

    #[inline]
    pub fn color(&self) -> ColorRgba {
        self.state.color
    }

    pub fn set_camera_matrix(&mut self, matrix: Mat4) {
        self.state.matrix = matrix;
    }

    #[inline]
    pub fn camera_matrix(&self) -> Mat4 {
        self.state.matrix
    }

    /// Refreshes `camera` for `viewport` and adopts its combined matrix.
    pub fn set_active_camera<C: Camera + ?Sized>(&mut self, camera: &mut C, viewport: Viewport) {
        camera.update_matrices(viewport.width_f32(), viewport.height_f32());
        self.state.matrix = camera.combined_matrix();
    }

    /// Switches program and blend mode. A mode that failed preprocessing is
    /// still recorded; draws in it are skipped.
    pub fn set_shader_mode(&mut self, mode: ShaderMode) {
        self.state.mode = mode;
        match self.ctx.registry.get(mode) {
            Some(entry) => {
                self.ctx.backend.use_program(Some(entry.program));
                self.ctx.backend.set_blend(mode.blend());
            }
            None => log::warn!("RenderProcessor: shader mode {mode} is unavailable"),
        }
    }

    #[inline]
    pub fn shader_mode(&self) -> ShaderMode {
        self.state.mode
    }

    pub fn set_primitive_type(&mut self, primitive: Primitive) {
        self.state.primitive = primitive;
    }

    #[inline]
    pub fn primitive_type(&self) -> Primitive {
        self.state.primitive
    }

    /// Texture sampled by the next draws; `None` draws untextured.
    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        self.state.texture = texture;
    }

    // ── uploads ───────────────────────────────────────────────────────────

    /// Flat `x, y` pairs.
    pub fn update_positions(&mut self, floats: &[f32]) -> Result<()> {
        let vertices = canonicalize_positions(floats)?;
        self.upload(vertices)
    }

    pub fn update_vertices<V: VertexFormat>(&mut self, vertices: &[V]) -> Result<()> {
        self.upload(canonicalize(vertices))
    }

    /// Interleaved floats described by `layout`.
    pub fn update_raw(&mut self, floats: &[f32], layout: &VertexLayout) -> Result<()> {
        let vertices = canonicalize_raw(floats, layout)?;
        self.upload(vertices)
    }

    fn upload(&mut self, vertices: Vec<Vertex>) -> Result<()> {
        self.ctx
            .buffers
            .upload_vertices(&mut self.ctx.backend, &vertices)?;
        self.uploaded = vertices;
        Ok(())
    }

    /// Canonical copy of the last upload.
    #[inline]
    pub fn uploaded_vertices(&self) -> &[Vertex] {
        &self.uploaded
    }

    // ── draws ─────────────────────────────────────────────────────────────

    pub fn draw(&mut self) -> Result<()> {
        if self.uploaded.is_empty() {
            log::warn!("RenderProcessor: draw skipped, no vertices uploaded");
            return Ok(());
        }
        let Some(entry) = self.active_program() else {
            return Ok(());
        };
        self.apply(&entry);
        self.ctx.backend.draw_arrays(
            self.state.primitive,
            self.ctx.buffers.vertex_buffer(),
            canonical_layout(),
            0,
            self.uploaded.len() as u32,
        )?;
        Ok(())
    }

    /// Draws the uploaded vertices through `indices`. Every index must address
    /// an uploaded vertex.
    pub fn draw_indexed(&mut self, indices: &[u32]) -> Result<()> {
        if self.uploaded.is_empty() {
            log::warn!("RenderProcessor: indexed draw skipped, no vertices uploaded");
            return Ok(());
        }
        let vertex_count = self.uploaded.len();
        if let Some(&index) = indices.iter().find(|i| **i as usize >= vertex_count) {
            return Err(RenderError::InvalidIndices {
                index,
                vertex_count,
            });
        }
        if indices.is_empty() {
            log::warn!("RenderProcessor: indexed draw skipped, no indices");
            return Ok(());
        }
        let Some(entry) = self.active_program() else {
            return Ok(());
        };

        self.ctx
            .buffers
            .upload_indices(&mut self.ctx.backend, indices)?;
        self.apply(&entry);
        self.ctx.backend.draw_indexed(
            self.state.primitive,
            self.ctx.buffers.vertex_buffer(),
            canonical_layout(),
            self.ctx.buffers.index_buffer(),
            indices.len() as u32,
        )?;
        Ok(())
    }

    fn active_program(&self) -> Option<ProgramEntry> {
        let entry = self.ctx.registry.get(self.state.mode).copied();
        if entry.is_none() {
            log::warn!(
                "RenderProcessor: draw skipped, shader mode {} is unavailable",
                self.state.mode
            );
        }
        entry
    }

    /// Binds program, blend and texture, then writes the draw uniforms.
    fn apply(&mut self, entry: &ProgramEntry) {
        let gpu = &mut self.ctx.backend;
        let u = &entry.uniforms;
        gpu.use_program(Some(entry.program));
        gpu.set_blend(self.state.mode.blend());
        gpu.bind_texture(0, self.state.texture);
        gpu.bind_texture(1, None);

        if let Some(loc) = u.matrix {
            gpu.set_uniform(loc, UniformValue::Mat4(self.state.matrix.to_cols_array()));
        }
        if let Some(loc) = u.color {
            gpu.set_uniform(loc, UniformValue::Vec4(self.state.color.to_array()));
        }
        if let Some(loc) = u.aspect {
            let aspect = self.ctx.config.viewport().aspect_ratio();
            gpu.set_uniform(loc, UniformValue::Float(aspect));
        }
        if let Some(loc) = u.use_texture {
            let flag = if self.state.texture.is_some() { 1.0 } else { 0.0 };
            gpu.set_uniform(loc, UniformValue::Float(flag));
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    /// Uploads `image` under `source_id`, or returns the texture already
    /// cached for that id.
    pub fn load_texture(&mut self, source_id: &str, image: &TextureImage) -> Result<TextureId> {
        self.ctx
            .textures
            .load(&mut self.ctx.backend, source_id, image)
    }

    pub fn texture(&self, source_id: &str) -> Option<TextureId> {
        self.ctx.textures.get(source_id)
    }

    /// Replaces the configuration with one for the new size, resizes the
    /// surface and reallocates bloom targets. Call between frames.
    ///
    /// Sizes above the device's texture limit fail with
    /// [`RenderError::MissingCapability`] and leave everything as it was. If
    /// the bloom targets cannot be reallocated bloom is switched off.
    pub fn resize(&mut self, width: i64, height: i64) -> Result<()> {
        let config = self.ctx.config.with_viewport(width, height)?;
        let viewport = config.viewport();
        let max = self.ctx.caps.max_texture_dimension;
        if viewport.width > max || viewport.height > max {
            return Err(RenderError::MissingCapability(format!(
                "viewport {}x{} exceeds max texture dimension {max}",
                viewport.width, viewport.height
            )));
        }

        self.ctx.backend.resize(viewport.width, viewport.height);
        self.ctx.backend.set_viewport(viewport.width, viewport.height);

        if let Some(bloom) = self.ctx.bloom.as_mut() {
            if let Err(err) = bloom.targets.resize(&mut self.ctx.backend, viewport) {
                log::warn!("RenderProcessor: bloom disabled after resize: {err}");
                if let Some(bloom) = self.ctx.bloom.take() {
                    bloom.release(&mut self.ctx.backend);
                }
            }
        }

        log::debug!("RenderProcessor: resized to {}x{}", viewport.width, viewport.height);
        self.ctx.config = config;
        Ok(())
    }

    /// Shows the default framebuffer.
    pub fn present(&mut self) -> Result<()> {
        self.ctx.backend.present()?;
        Ok(())
    }

    /// Releases every GPU handle and hands the backend back.
    pub fn dispose(mut self) -> B {
        self.ctx.release();
        self.ctx.backend
    }
}
