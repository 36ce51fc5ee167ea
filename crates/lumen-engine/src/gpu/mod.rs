//! GPU command seam.
//!
//! The pipeline talks to the GPU through [`GpuBackend`], a small handle-based
//! API in the spirit of GL: programs with uniform locations, buffers, textures,
//! framebuffers, bind state and draws. Two implementations exist:
//! - [`crate::device::WgpuBackend`] renders through wgpu into a window surface
//! - [`HeadlessBackend`] records every command and supports fault injection
//!
//! Handles are plain ids. Deleting an unknown or already deleted handle is a
//! no-op.

mod error;
mod headless;
mod uniforms;

pub use error::GpuError;
pub use headless::{DrawRecord, GpuCommand, HeadlessBackend};
pub use uniforms::{UniformValue, UNIFORM_BLOCK_SIZE, UNIFORM_PRELUDE};

pub(crate) use uniforms::{uniform_offset, UniformBlock};

use crate::coords::ColorRgba;
use crate::vertex::VertexLayout;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Linked vertex + fragment program.
    ProgramId
);
handle!(BufferId);
handle!(TextureId);
handle!(
    /// Offscreen render target wrapping one color texture.
    FramebufferId
);

/// Location of a uniform inside the shared uniform block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

impl UniformLocation {
    /// Byte offset inside the uniform block.
    #[inline]
    pub fn offset(self) -> u32 {
        self.0
    }
}

/// Primitive assembly for a draw.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Primitive {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source replaces destination.
    #[default]
    Disabled,
    /// Straight alpha: `src * a + dst * (1 - a)`.
    Alpha,
    /// `src + dst`.
    Additive,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    /// Half-float color, used for HDR capture.
    Rgba16Float,
}

impl TextureFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u64 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}

/// Texture creation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// The texture may be attached to a framebuffer.
    pub render_target: bool,
    /// Sampler anisotropy clamp; `1` disables anisotropic filtering.
    pub anisotropy: u16,
}

impl TextureDesc {
    /// Storage size of the base level in bytes.
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel()
    }
}

/// What the device can do, queried once during preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuCapabilities {
    pub max_texture_dimension: u32,
    pub max_vertex_attributes: u32,
    /// Half-float textures can be rendered to and sampled with filtering.
    pub float_render_targets: bool,
    pub max_anisotropy: u16,
    /// Supported MSAA sample counts, ascending.
    pub msaa_sample_counts: Vec<u32>,
}

impl Default for GpuCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 8192,
            max_vertex_attributes: 16,
            float_render_targets: true,
            max_anisotropy: 16,
            msaa_sample_counts: vec![1, 4],
        }
    }
}

/// Handle-based GPU API used by the pipeline.
///
/// State set through `bind_framebuffer`, `set_viewport`, `use_program`,
/// `set_blend`, `set_uniform` and `bind_texture` is retained and applies to
/// every subsequent draw. Draws execute immediately with the state current at
/// the time of the call.
pub trait GpuBackend {
    /// Returns and clears the pending device error, if any.
    fn take_error(&mut self) -> Option<GpuError>;

    fn capabilities(&self) -> GpuCapabilities;

    // ── programs ──────────────────────────────────────────────────────────

    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, GpuError>;

    /// Resolves a uniform by name. `None` if the program does not use it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn delete_program(&mut self, program: ProgramId);

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self, label: &str, kind: BufferKind, size: u64)
        -> Result<BufferId, GpuError>;

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), GpuError>;

    fn delete_buffer(&mut self, buffer: BufferId);

    // ── textures & framebuffers ───────────────────────────────────────────

    /// Creates a texture with the given initial contents.
    ///
    /// `pixels.len()` must equal [`TextureDesc::byte_len`].
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, GpuError>;

    fn delete_texture(&mut self, texture: TextureId);

    fn create_framebuffer(&mut self, label: &str, color: TextureId)
        -> Result<FramebufferId, GpuError>;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Binds an offscreen framebuffer, or the default (window) framebuffer for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn bound_framebuffer(&self) -> Option<FramebufferId>;

    // ── state ─────────────────────────────────────────────────────────────

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clears the bound framebuffer.
    fn clear(&mut self, color: ColorRgba);

    fn use_program(&mut self, program: Option<ProgramId>);

    fn set_blend(&mut self, blend: BlendMode);

    /// Writes a uniform of the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Binds a texture to sampler slot `0` or `1`; `None` binds opaque white.
    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>);

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        first: u32,
        count: u32,
    ) -> Result<(), GpuError>;

    fn draw_indexed(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        indices: BufferId,
        index_count: u32,
    ) -> Result<(), GpuError>;

    /// Shows the default framebuffer.
    fn present(&mut self) -> Result<(), GpuError>;

    /// Resizes the default framebuffer.
    fn resize(&mut self, width: u32, height: u32);
}
