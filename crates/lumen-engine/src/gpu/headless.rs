use std::collections::HashMap;

use super::{
    uniform_offset, BlendMode, BufferId, BufferKind, FramebufferId, GpuBackend, GpuCapabilities,
    GpuError, Primitive, ProgramId, TextureDesc, TextureId, UniformLocation, UniformValue,
};
use crate::coords::ColorRgba;
use crate::vertex::VertexLayout;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CompileProgram { program: ProgramId, label: String },
    DeleteProgram(ProgramId),
    CreateBuffer { buffer: BufferId, kind: BufferKind, size: u64 },
    WriteBuffer { buffer: BufferId, offset: u64, len: usize },
    DeleteBuffer(BufferId),
    CreateTexture { texture: TextureId, desc: TextureDesc },
    DeleteTexture(TextureId),
    CreateFramebuffer { framebuffer: FramebufferId, color: TextureId },
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    SetViewport { width: u32, height: u32 },
    Clear { target: Option<FramebufferId>, color: ColorRgba },
    UseProgram(Option<ProgramId>),
    SetBlend(BlendMode),
    SetUniform { location: UniformLocation, value: UniformValue },
    BindTexture { slot: u32, texture: Option<TextureId> },
    Draw(DrawRecord),
    Present,
    Resize { width: u32, height: u32 },
}

/// State captured for one draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub target: Option<FramebufferId>,
    pub blend: BlendMode,
    pub primitive: Primitive,
    pub vertices: BufferId,
    pub indices: Option<BufferId>,
    /// Vertex count for array draws, index count for indexed draws.
    pub count: u32,
    pub textures: [Option<TextureId>; 2],
}

#[derive(Debug)]
struct Program {
    label: String,
    source: String,
}

#[derive(Debug)]
struct Buffer {
    kind: BufferKind,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Texture {
    desc: TextureDesc,
    data: Vec<u8>,
}

/// Backend that keeps resources in memory and records every call.
///
/// Used by tests and headless runs. Compilation only checks that the stages
/// declare `vs_main` / `fs_main`; uniform names resolve when the program's
/// source references them.
///
/// Faults can be injected with [`HeadlessBackend::fail_label`],
/// [`HeadlessBackend::inject_error`] and [`HeadlessBackend::fail_next_draw`].
#[derive(Debug)]
pub struct HeadlessBackend {
    caps: GpuCapabilities,
    size: (u32, u32),
    next_id: u32,

    programs: HashMap<ProgramId, Program>,
    buffers: HashMap<BufferId, Buffer>,
    textures: HashMap<TextureId, Texture>,
    framebuffers: HashMap<FramebufferId, TextureId>,

    framebuffer: Option<FramebufferId>,
    program: Option<ProgramId>,
    blend: BlendMode,
    bound_textures: [Option<TextureId>; 2],

    commands: Vec<GpuCommand>,
    pending_error: Option<GpuError>,
    failing_labels: Vec<String>,
    fail_next_draw: bool,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            caps: GpuCapabilities::default(),
            size: (width, height),
            next_id: 1,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            framebuffer: None,
            program: None,
            blend: BlendMode::Disabled,
            bound_textures: [None; 2],
            commands: Vec::new(),
            pending_error: None,
            failing_labels: Vec::new(),
            fail_next_draw: false,
        }
    }

    pub fn with_capabilities(mut self, caps: GpuCapabilities) -> Self {
        self.caps = caps;
        self
    }

    // ── fault injection ───────────────────────────────────────────────────

    /// Makes every later creation call whose label contains `pattern` fail.
    pub fn fail_label(&mut self, pattern: impl Into<String>) {
        self.failing_labels.push(pattern.into());
    }

    /// Sets the error returned by the next [`GpuBackend::take_error`].
    pub fn inject_error(&mut self, error: GpuError) {
        self.pending_error = Some(error);
    }

    pub fn fail_next_draw(&mut self) {
        self.fail_next_draw = true;
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            GpuCommand::Draw(d) => Some(d),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_kind(&self, buffer: BufferId) -> Option<BufferKind> {
        self.buffers.get(&buffer).map(|b| b.kind)
    }

    pub fn texture_data(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(|t| t.data.as_slice())
    }

    pub fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&texture).map(|t| &t.desc)
    }

    pub fn framebuffer_texture(&self, framebuffer: FramebufferId) -> Option<TextureId> {
        self.framebuffers.get(&framebuffer).copied()
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs.get(&program).map(|p| p.label.as_str())
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Number of programs, buffers, textures and framebuffers still alive.
    pub fn live_handles(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.textures.len() + self.framebuffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_label(&self, label: &str) -> Result<(), String> {
        match self.failing_labels.iter().find(|p| label.contains(p.as_str())) {
            Some(p) => Err(format!("injected failure for '{p}'")),
            None => Ok(()),
        }
    }

    fn begin_draw(&mut self) -> Result<ProgramId, GpuError> {
        if std::mem::take(&mut self.fail_next_draw) {
            return Err(GpuError::Device("injected draw failure".to_string()));
        }
        self.program.ok_or(GpuError::NoProgram)
    }

    fn vertex_capacity(&self, buffer: BufferId, layout: &VertexLayout) -> Result<u64, GpuError> {
        let b = self.buffers.get(&buffer).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        Ok(b.data.len() as u64 / layout.stride() as u64)
    }

    fn record_draw(&mut self, record: DrawRecord) {
        self.commands.push(GpuCommand::Draw(record));
    }
}

impl GpuBackend for HeadlessBackend {
    fn take_error(&mut self) -> Option<GpuError> {
        self.pending_error.take()
    }

    fn capabilities(&self) -> GpuCapabilities {
        self.caps.clone()
    }

    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, GpuError> {
        let fail = |message: String| GpuError::ShaderCompile {
            label: label.to_string(),
            message,
        };
        self.check_label(label).map_err(fail)?;
        if !vertex_source.contains("fn vs_main") {
            return Err(fail("vertex stage has no vs_main entry point".to_string()));
        }
        if !fragment_source.contains("fn fs_main") {
            return Err(fail("fragment stage has no fs_main entry point".to_string()));
        }

        let program = ProgramId(self.next());
        self.programs.insert(
            program,
            Program {
                label: label.to_string(),
                source: format!("{vertex_source}\n{fragment_source}"),
            },
        );
        self.commands.push(GpuCommand::CompileProgram {
            program,
            label: label.to_string(),
        });
        Ok(program)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program)?;
        if !p.source.contains(name) {
            return None;
        }
        uniform_offset(name).map(UniformLocation)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            if self.program == Some(program) {
                self.program = None;
            }
            self.commands.push(GpuCommand::DeleteProgram(program));
        }
    }

    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        size: u64,
    ) -> Result<BufferId, GpuError> {
        self.check_label(label).map_err(|message| GpuError::Allocation {
            label: label.to_string(),
            message,
        })?;

        let buffer = BufferId(self.next());
        self.buffers.insert(
            buffer,
            Buffer {
                kind,
                data: vec![0; size as usize],
            },
        );
        self.commands.push(GpuCommand::CreateBuffer { buffer, kind, size });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let b = self.buffers.get_mut(&buffer).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        let start = offset as usize;
        let dst = b.data.get_mut(start..start + data.len()).ok_or_else(|| {
            GpuError::OutOfBounds(format!(
                "write of {} bytes at {offset} into buffer {}",
                data.len(),
                buffer.0
            ))
        })?;
        dst.copy_from_slice(data);
        self.commands.push(GpuCommand::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.commands.push(GpuCommand::DeleteBuffer(buffer));
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, GpuError> {
        let alloc_err = |message: String| GpuError::Allocation {
            label: desc.label.clone(),
            message,
        };
        self.check_label(&desc.label).map_err(alloc_err)?;

        let max = self.caps.max_texture_dimension;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(alloc_err(format!(
                "size {}x{} outside 1..={max}",
                desc.width, desc.height
            )));
        }
        if pixels.len() as u64 != desc.byte_len() {
            return Err(alloc_err(format!(
                "expected {} bytes of pixel data, got {}",
                desc.byte_len(),
                pixels.len()
            )));
        }

        let texture = TextureId(self.next());
        self.textures.insert(
            texture,
            Texture {
                desc: desc.clone(),
                data: pixels.to_vec(),
            },
        );
        self.commands.push(GpuCommand::CreateTexture {
            texture,
            desc: desc.clone(),
        });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            for slot in &mut self.bound_textures {
                if *slot == Some(texture) {
                    *slot = None;
                }
            }
            self.commands.push(GpuCommand::DeleteTexture(texture));
        }
    }

    fn create_framebuffer(
        &mut self,
        label: &str,
        color: TextureId,
    ) -> Result<FramebufferId, GpuError> {
        self.check_label(label).map_err(|message| GpuError::Allocation {
            label: label.to_string(),
            message,
        })?;
        let tex = self.textures.get(&color).ok_or(GpuError::UnknownHandle {
            kind: "texture",
            id: color.0,
        })?;
        if !tex.desc.render_target {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                message: format!("texture '{}' is not a render target", tex.desc.label),
            });
        }

        let framebuffer = FramebufferId(self.next());
        self.framebuffers.insert(framebuffer, color);
        self.commands
            .push(GpuCommand::CreateFramebuffer { framebuffer, color });
        Ok(framebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_some() {
            if self.framebuffer == Some(framebuffer) {
                self.framebuffer = None;
            }
            self.commands.push(GpuCommand::DeleteFramebuffer(framebuffer));
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.framebuffer = framebuffer.filter(|fb| self.framebuffers.contains_key(fb));
        self.commands.push(GpuCommand::BindFramebuffer(self.framebuffer));
    }

    fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(GpuCommand::SetViewport { width, height });
    }

    fn clear(&mut self, color: ColorRgba) {
        self.commands.push(GpuCommand::Clear {
            target: self.framebuffer,
            color,
        });
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.program = program.filter(|p| self.programs.contains_key(p));
        self.commands.push(GpuCommand::UseProgram(self.program));
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
        self.commands.push(GpuCommand::SetBlend(blend));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.commands.push(GpuCommand::SetUniform { location, value });
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>) {
        if let Some(s) = self.bound_textures.get_mut(slot as usize) {
            *s = texture.filter(|t| self.textures.contains_key(t));
        }
        self.commands.push(GpuCommand::BindTexture { slot, texture });
    }

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        first: u32,
        count: u32,
    ) -> Result<(), GpuError> {
        let program = self.begin_draw()?;
        let capacity = self.vertex_capacity(vertices, layout)?;
        if first as u64 + count as u64 > capacity {
            return Err(GpuError::OutOfBounds(format!(
                "vertices {first}..{} exceed buffer capacity {capacity}",
                first as u64 + count as u64
            )));
        }
        self.record_draw(DrawRecord {
            program,
            target: self.framebuffer,
            blend: self.blend,
            primitive,
            vertices,
            indices: None,
            count,
            textures: self.bound_textures,
        });
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        indices: BufferId,
        index_count: u32,
    ) -> Result<(), GpuError> {
        let program = self.begin_draw()?;
        self.vertex_capacity(vertices, layout)?;
        let ib = self.buffers.get(&indices).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: indices.0,
        })?;
        if index_count as u64 * 4 > ib.data.len() as u64 {
            return Err(GpuError::OutOfBounds(format!(
                "{index_count} indices exceed index buffer of {} bytes",
                ib.data.len()
            )));
        }
        self.record_draw(DrawRecord {
            program,
            target: self.framebuffer,
            blend: self.blend,
            primitive,
            vertices,
            indices: Some(indices),
            count: index_count,
            textures: self.bound_textures,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.commands.push(GpuCommand::Present);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.commands.push(GpuCommand::Resize { width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::canonical_layout;

    const VS: &str = "@vertex fn vs_main() {}";
    const FS: &str = "@fragment fn fs_main() { u.u_color; }";

    fn desc(render_target: bool) -> TextureDesc {
        TextureDesc {
            label: "t".to_string(),
            width: 2,
            height: 2,
            format: crate::gpu::TextureFormat::Rgba8Unorm,
            render_target,
            anisotropy: 1,
        }
    }

    // ── programs ──────────────────────────────────────────────────────────

    #[test]
    fn compile_requires_entry_points() {
        let mut gpu = HeadlessBackend::new(8, 8);
        assert!(gpu.compile_program("ok", VS, FS).is_ok());
        assert!(matches!(
            gpu.compile_program("bad", "", FS),
            Err(GpuError::ShaderCompile { .. })
        ));
    }

    #[test]
    fn uniform_locations_follow_source() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let p = gpu.compile_program("p", VS, FS).unwrap();
        assert_eq!(gpu.uniform_location(p, "u_color"), Some(UniformLocation(64)));
        assert_eq!(gpu.uniform_location(p, "u_matrix"), None);
    }

    #[test]
    fn failing_label_rejects_matching_calls_only() {
        let mut gpu = HeadlessBackend::new(8, 8);
        gpu.fail_label("glow");
        assert!(gpu.compile_program("soft_glow", VS, FS).is_err());
        assert!(gpu.compile_program("baseline", VS, FS).is_ok());
    }

    // ── resources ─────────────────────────────────────────────────────────

    #[test]
    fn buffer_writes_are_bounds_checked() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let b = gpu.create_buffer("vb", BufferKind::Vertex, 8).unwrap();
        gpu.write_buffer(b, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(gpu.buffer_data(b).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            gpu.write_buffer(b, 6, &[0; 4]),
            Err(GpuError::OutOfBounds(_))
        ));
    }

    #[test]
    fn framebuffer_needs_render_target_texture() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let plain = gpu.create_texture(&desc(false), &[0; 16]).unwrap();
        assert!(gpu.create_framebuffer("fb", plain).is_err());

        let target = gpu.create_texture(&desc(true), &[0; 16]).unwrap();
        let fb = gpu.create_framebuffer("fb", target).unwrap();
        gpu.bind_framebuffer(Some(fb));
        assert_eq!(gpu.bound_framebuffer(), Some(fb));

        gpu.delete_framebuffer(fb);
        assert_eq!(gpu.bound_framebuffer(), None);
    }

    #[test]
    fn live_handles_track_deletes() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let p = gpu.compile_program("p", VS, FS).unwrap();
        let b = gpu.create_buffer("b", BufferKind::Index, 4).unwrap();
        assert_eq!(gpu.live_handles(), 2);
        gpu.delete_program(p);
        gpu.delete_buffer(b);
        gpu.delete_buffer(b);
        assert_eq!(gpu.live_handles(), 0);
    }

    // ── draws ─────────────────────────────────────────────────────────────

    #[test]
    fn draw_records_current_state() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let p = gpu.compile_program("p", VS, FS).unwrap();
        let vb = gpu
            .create_buffer("vb", BufferKind::Vertex, 3 * 32)
            .unwrap();

        assert!(matches!(
            gpu.draw_arrays(Primitive::Triangles, vb, canonical_layout(), 0, 3),
            Err(GpuError::NoProgram)
        ));

        gpu.use_program(Some(p));
        gpu.set_blend(BlendMode::Additive);
        gpu.draw_arrays(Primitive::Triangles, vb, canonical_layout(), 0, 3)
            .unwrap();
        let d = gpu.draws().next().unwrap();
        assert_eq!(d.program, p);
        assert_eq!(d.blend, BlendMode::Additive);
        assert_eq!(d.count, 3);

        assert!(gpu
            .draw_arrays(Primitive::Triangles, vb, canonical_layout(), 1, 3)
            .is_err());
    }

    #[test]
    fn injected_draw_failure_fires_once() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let p = gpu.compile_program("p", VS, FS).unwrap();
        let vb = gpu.create_buffer("vb", BufferKind::Vertex, 32).unwrap();
        gpu.use_program(Some(p));
        gpu.fail_next_draw();
        assert!(gpu
            .draw_arrays(Primitive::Points, vb, canonical_layout(), 0, 1)
            .is_err());
        assert!(gpu
            .draw_arrays(Primitive::Points, vb, canonical_layout(), 0, 1)
            .is_ok());
        assert_eq!(gpu.draw_count(), 1);
    }
}
