use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::pipeline::{CompiledProgram, PipelineCache, PipelineKey};
use super::{surface, GpuInit, SurfaceErrorAction};
use crate::coords::ColorRgba;
use crate::gpu::{
    uniform_offset, BlendMode, BufferId, BufferKind, FramebufferId, GpuBackend, GpuCapabilities,
    GpuError, Primitive, ProgramId, TextureDesc, TextureFormat, TextureId, UniformBlock,
    UniformLocation, UniformValue, UNIFORM_BLOCK_SIZE, UNIFORM_PRELUDE,
};
use crate::vertex::VertexLayout;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
    size: (u32, u32),
}

/// The surface texture of the frame being drawn.
struct SurfaceFrame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// [`GpuBackend`] implemented on wgpu, drawing into a window surface.
///
/// Every draw records its own render pass and is submitted right away, so
/// buffer writes between draws are ordered the way the caller issued them.
/// Render pipelines are built lazily per program, blend mode, primitive,
/// target format and vertex layout.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    frame: Option<SurfaceFrame>,

    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: PipelineCache,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    uniforms: UniformBlock,
    white: GpuTexture,

    next_id: u32,
    programs: HashMap<ProgramId, CompiledProgram>,
    buffers: HashMap<BufferId, GpuBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
    framebuffers: HashMap<FramebufferId, TextureId>,

    framebuffer: Option<FramebufferId>,
    program: Option<ProgramId>,
    blend: BlendMode,
    viewport: (u32, u32),
    bound_textures: [Option<TextureId>; 2],
    pending_error: Option<GpuError>,

    // Keeps the window alive for as long as the surface.
    _window: Arc<Window>,
}

impl WgpuBackend {
    /// Creates the device and configures a surface for `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen-engine device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface::choose_alpha_mode(&caps, alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen texture bgl"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen uniform block"),
            size: UNIFORM_BLOCK_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let white_desc = TextureDesc {
            label: "lumen white".to_string(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            render_target: false,
            anisotropy: 1,
        };
        let white = upload_texture(&device, &queue, &white_desc, &[255; 4]);

        log::info!(
            "WgpuBackend: {} ({:?}), surface {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            frame: None,
            texture_layout,
            pipeline_layout,
            pipelines: PipelineCache::default(),
            uniform_buffer,
            uniform_group,
            uniforms: UniformBlock::default(),
            white,
            next_id: 1,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            framebuffer: None,
            program: None,
            blend: BlendMode::Disabled,
            viewport: (size.width, size.height),
            bound_textures: [None; 2],
            pending_error: None,
            _window: window,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    /// Number of render pipelines built so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Acquires the surface texture for this frame if the default framebuffer
    /// is bound and none is held yet.
    fn ensure_frame(&mut self) -> Result<(), GpuError> {
        if self.framebuffer.is_some() || self.frame.is_some() {
            return Ok(());
        }
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(SurfaceFrame { texture, view });
                Ok(())
            }
            Err(err) => {
                let action = surface::recover(&self.surface, &self.device, &self.config, &err);
                let gpu_err = GpuError::Surface(err.to_string());
                if action == SurfaceErrorAction::Fatal {
                    self.pending_error = Some(gpu_err.clone());
                }
                log::warn!("WgpuBackend: surface acquisition failed ({err}), {action:?}");
                Err(gpu_err)
            }
        }
    }

    /// View, format and size of the bound framebuffer.
    fn target(&self) -> Result<(&wgpu::TextureView, wgpu::TextureFormat, (u32, u32)), GpuError> {
        match self.framebuffer {
            Some(fb) => {
                let tex = self
                    .framebuffers
                    .get(&fb)
                    .and_then(|t| self.textures.get(t))
                    .ok_or(GpuError::UnknownHandle {
                        kind: "framebuffer",
                        id: fb.0,
                    })?;
                Ok((&tex.view, tex.format, tex.size))
            }
            None => {
                let frame = self
                    .frame
                    .as_ref()
                    .ok_or_else(|| GpuError::Surface("no surface texture acquired".into()))?;
                Ok((
                    &frame.view,
                    self.config.format,
                    (self.config.width, self.config.height),
                ))
            }
        }
    }

    fn texture_or_white(&self, slot: usize) -> &GpuTexture {
        self.bound_textures[slot]
            .and_then(|t| self.textures.get(&t))
            .unwrap_or(&self.white)
    }

    fn draw(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        indexed: Option<(BufferId, u32)>,
        range: std::ops::Range<u32>,
    ) -> Result<(), GpuError> {
        let program = self.program.ok_or(GpuError::NoProgram)?;
        self.ensure_frame()?;
        let (_, format, _) = self.target()?;

        let key = PipelineKey {
            program,
            blend: self.blend,
            primitive,
            format,
            layout: layout.clone(),
        };
        let compiled = self.programs.get(&program).ok_or(GpuError::UnknownHandle {
            kind: "program",
            id: program.0,
        })?;
        if let Err(err) = self
            .pipelines
            .ensure(&self.device, &self.pipeline_layout, &key, compiled)
        {
            self.pending_error = Some(err.clone());
            return Err(err);
        }

        self.queue
            .write_buffer(&self.uniform_buffer, 0, self.uniforms.as_bytes());

        let (view, _, (tw, th)) = self.target()?;
        let pipeline = self.pipelines.get(&key).ok_or(GpuError::NoProgram)?;
        let vb = self.buffers.get(&vertices).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: vertices.0,
        })?;
        let ib = match indexed {
            Some((ib, _)) => Some(self.buffers.get(&ib).ok_or(GpuError::UnknownHandle {
                kind: "buffer",
                id: ib.0,
            })?),
            None => None,
        };

        let main = self.texture_or_white(0);
        let aux = self.texture_or_white(1);
        let textures = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen texture bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&main.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&main.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&aux.view),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let (vw, vh) = (self.viewport.0.min(tw), self.viewport.1.min(th));
            rpass.set_viewport(0.0, 0.0, vw.max(1) as f32, vh.max(1) as f32, 0.0, 1.0);
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.uniform_group, &[]);
            rpass.set_bind_group(1, &textures, &[]);
            rpass.set_vertex_buffer(0, vb.buffer.slice(..));
            match (ib, indexed) {
                (Some(ib), Some((_, count))) => {
                    rpass.set_index_buffer(ib.buffer.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..count, 0, 0..1);
                }
                _ => rpass.draw(range, 0..1),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    desc: &TextureDesc,
    pixels: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    };
    let format = wgpu_format(desc.format);
    let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    if desc.render_target {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&desc.label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel() as u32),
            rows_per_image: Some(desc.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&desc.label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        anisotropy_clamp: desc.anisotropy.clamp(1, 16),
        ..Default::default()
    });

    GpuTexture {
        _texture: texture,
        view,
        sampler,
        format,
        size: (desc.width, desc.height),
    }
}

impl GpuBackend for WgpuBackend {
    fn take_error(&mut self) -> Option<GpuError> {
        self.pending_error.take()
    }

    fn capabilities(&self) -> GpuCapabilities {
        let limits = self.device.limits();
        let half = self
            .adapter
            .get_texture_format_features(wgpu::TextureFormat::Rgba16Float);
        let float_render_targets = half.allowed_usages.contains(
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        ) && half
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE);

        let surface = self.adapter.get_texture_format_features(self.config.format);
        let msaa_sample_counts = [1, 2, 4, 8, 16]
            .into_iter()
            .filter(|&n| n == 1 || surface.flags.sample_count_supported(n))
            .collect();

        GpuCapabilities {
            max_texture_dimension: limits.max_texture_dimension_2d,
            max_vertex_attributes: limits.max_vertex_attributes,
            float_render_targets,
            max_anisotropy: 16,
            msaa_sample_counts,
        }
    }

    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, GpuError> {
        let module = |stage: &str, source: &str| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("lumen {label} {stage}")),
                    source: wgpu::ShaderSource::Wgsl(format!("{UNIFORM_PRELUDE}\n{source}").into()),
                })
        };

        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = module("vs", vertex_source);
        let fragment = module("fs", fragment_source);
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(GpuError::ShaderCompile {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            CompiledProgram {
                label: label.to_string(),
                vertex,
                fragment,
                source: format!("{vertex_source}\n{fragment_source}"),
            },
        );
        log::debug!("WgpuBackend: compiled program '{label}' as {}", id.0);
        Ok(id)
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
            self.pipelines.evict_program(program);
            if self.program == Some(program) {
                self.program = None;
            }
        }
    }

    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        size: u64,
    ) -> Result<BufferId, GpuError> {
        let max = self.device.limits().max_buffer_size;
        if size == 0 || size > max {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                message: format!("size {size} outside 1..={max}"),
            });
        }
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        // wgpu requires copy sizes to be multiples of 4.
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let id = BufferId(self.next());
        self.buffers.insert(id, GpuBuffer { buffer, size });
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let b = self.buffers.get(&buffer).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        if offset + data.len() as u64 > b.size {
            return Err(GpuError::OutOfBounds(format!(
                "write of {} bytes at {offset} into buffer of {}",
                data.len(),
                b.size
            )));
        }
        self.queue.write_buffer(&b.buffer, offset, data);
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, GpuError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(GpuError::Allocation {
                label: desc.label.clone(),
                message: format!("size {}x{} outside 1..={max}", desc.width, desc.height),
            });
        }
        if pixels.len() as u64 != desc.byte_len() {
            return Err(GpuError::Allocation {
                label: desc.label.clone(),
                message: format!(
                    "expected {} bytes of pixel data, got {}",
                    desc.byte_len(),
                    pixels.len()
                ),
            });
        }

        let texture = upload_texture(&self.device, &self.queue, desc, pixels);
        let id = TextureId(self.next());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            for slot in &mut self.bound_textures {
                if *slot == Some(texture) {
                    *slot = None;
                }
            }
        }
    }

    fn create_framebuffer(
        &mut self,
        label: &str,
        color: TextureId,
    ) -> Result<FramebufferId, GpuError> {
        if !self.textures.contains_key(&color) {
            return Err(GpuError::UnknownHandle {
                kind: "texture",
                id: color.0,
            });
        }
        let id = FramebufferId(self.next());
        self.framebuffers.insert(id, color);
        log::debug!("WgpuBackend: framebuffer '{label}' -> texture {}", color.0);
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_some() && self.framebuffer == Some(framebuffer)
        {
            self.framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.framebuffer = framebuffer.filter(|fb| self.framebuffers.contains_key(fb));
    }

    fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: ColorRgba) {
        if let Err(err) = self.ensure_frame() {
            log::debug!("WgpuBackend: clear skipped: {err}");
            return;
        }
        let Ok((view, _, _)) = self.target() else { return };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color.r as f64,
                            g: color.g as f64,
                            b: color.b as f64,
                            a: color.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.program = program.filter(|p| self.programs.contains_key(p));
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if !self.uniforms.write(location.offset(), &value) {
            log::warn!("WgpuBackend: uniform at offset {} out of range", location.offset());
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>) {
        match self.bound_textures.get_mut(slot as usize) {
            Some(s) => *s = texture.filter(|t| self.textures.contains_key(t)),
            None => log::warn!("WgpuBackend: texture slot {slot} does not exist"),
        }
    }

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        first: u32,
        count: u32,
    ) -> Result<(), GpuError> {
        self.draw(primitive, vertices, layout, None, first..first + count)
    }

    fn draw_indexed(
        &mut self,
        primitive: Primitive,
        vertices: BufferId,
        layout: &VertexLayout,
        indices: BufferId,
        index_count: u32,
    ) -> Result<(), GpuError> {
        self.draw(primitive, vertices, layout, Some((indices, index_count)), 0..0)
    }

    fn present(&mut self) -> Result<(), GpuError> {
        if let Some(frame) = self.frame.take() {
            drop(frame.view);
            frame.texture.present();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        // A held surface texture must be released before reconfiguring.
        self.frame = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }
}
