use super::kernel::{gaussian_weights, pack_weights};
use super::targets::{PostTargets, RenderTarget};
use crate::config::RenderConfiguration;
use crate::coords::Viewport;
use crate::error::{RenderError, Result};
use crate::gpu::{
    BlendMode, BufferId, GpuBackend, GpuError, Primitive, TextureFormat, TextureId,
    UniformLocation, UniformValue,
};
use crate::render::RenderContext;
use crate::shader::{PostPass, ProgramEntry, ProgramOrigin, ShaderLibrary};
use crate::vertex::canonical_layout;

/// Linked programs of the three bloom passes.
#[derive(Debug, Copy, Clone)]
pub struct BloomPrograms {
    pub extract: ProgramEntry,
    pub blur: ProgramEntry,
    pub composite: ProgramEntry,
}

impl BloomPrograms {
    fn compile<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        library: &ShaderLibrary,
    ) -> std::result::Result<Self, String> {
        let mut linked: Vec<ProgramEntry> = Vec::with_capacity(PostPass::ALL.len());
        for pass in PostPass::ALL {
            let compiled = match library.post_source(pass) {
                Some(src) => {
                    let label = format!("bloom_{}", pass.name());
                    ProgramEntry::compile(gpu, &label, &src, ProgramOrigin::Primary)
                        .map_err(|e| e.to_string())
                }
                None => Err(format!(
                    "missing source {} / {}",
                    pass.vertex_file(),
                    pass.fragment_file()
                )),
            };
            match compiled {
                Ok(entry) => linked.push(entry),
                Err(reason) => {
                    for entry in &linked {
                        gpu.delete_program(entry.program);
                    }
                    return Err(reason);
                }
            }
        }
        Ok(Self {
            extract: linked[0],
            blur: linked[1],
            composite: linked[2],
        })
    }

    fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        gpu.delete_program(self.extract.program);
        gpu.delete_program(self.blur.program);
        gpu.delete_program(self.composite.program);
    }
}

/// Everything the bloom path owns on the GPU.
#[derive(Debug)]
pub struct BloomResources {
    pub programs: BloomPrograms,
    pub targets: PostTargets,
}

impl BloomResources {
    /// Compiles the pass programs and allocates the targets.
    ///
    /// Failure is reported as a reason string after releasing whatever was
    /// created; callers treat it as "bloom inactive".
    pub fn prepare<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        library: &ShaderLibrary,
        config: &RenderConfiguration,
        format: TextureFormat,
    ) -> std::result::Result<Self, String> {
        let programs = BloomPrograms::compile(gpu, library)?;
        let post = config.post();
        match PostTargets::allocate(gpu, config.viewport(), post.half_resolution, format) {
            Ok(targets) => Ok(Self { programs, targets }),
            Err(err) => {
                programs.release(gpu);
                Err(err.to_string())
            }
        }
    }

    pub fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        self.programs.release(gpu);
        self.targets.release(gpu);
    }
}

/// Restores default-framebuffer rendering when dropped.
///
/// Held for the whole of finalization so that an early return or a panic
/// still leaves the backend drawing to the screen with the frame closed.
struct FrameGuard<'a, B: GpuBackend> {
    gpu: &'a mut B,
    started: &'a mut bool,
    viewport: Viewport,
}

impl<'a, B: GpuBackend> FrameGuard<'a, B> {
    fn new(gpu: &'a mut B, started: &'a mut bool, viewport: Viewport) -> Self {
        Self {
            gpu,
            started,
            viewport,
        }
    }

    fn gpu(&mut self) -> &mut B {
        self.gpu
    }
}

impl<B: GpuBackend> Drop for FrameGuard<'_, B> {
    fn drop(&mut self) {
        self.gpu.bind_framebuffer(None);
        self.gpu.set_viewport(self.viewport.width, self.viewport.height);
        *self.started = false;
    }
}

/// Bloom compositor. Idle until `begin_frame`, then captures every draw
/// until `finalize_frame` composites the frame onto the screen.
///
/// With bloom inactive the methods only track the frame state.
#[derive(Debug, Default)]
pub struct PostProcessor {
    started: bool,
    frames: u64,
}

impl PostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_frame_started(&self) -> bool {
        self.started
    }

    /// Frames finalized so far, successful or not.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn begin_frame<B: GpuBackend>(&mut self, ctx: &mut RenderContext<B>) -> Result<()> {
        if self.started {
            return Err(RenderError::FrameAlreadyStarted);
        }
        if let Some(bloom) = &ctx.bloom {
            let scene = bloom.targets.scene();
            ctx.backend.bind_framebuffer(Some(scene.framebuffer));
            ctx.backend.set_viewport(scene.width, scene.height);
            ctx.backend.clear(ctx.config.clear_color());
        }
        self.started = true;
        Ok(())
    }

    /// Runs extract, horizontal blur, vertical blur and composite, leaving the
    /// result in the default framebuffer.
    pub fn finalize_frame<B: GpuBackend>(&mut self, ctx: &mut RenderContext<B>) -> Result<()> {
        if !self.started {
            return Err(RenderError::FrameNotStarted);
        }
        self.frames += 1;
        let viewport = ctx.config.viewport();
        let mut guard = FrameGuard::new(&mut ctx.backend, &mut self.started, viewport);
        let result = match &ctx.bloom {
            Some(bloom) => composite(guard.gpu(), bloom, &ctx.config),
            None => Ok(()),
        };
        drop(guard);
        result.map_err(|err| {
            log::warn!("PostProcessor: bloom composite failed: {err}");
            RenderError::from(err)
        })
    }

    /// Abandons the current frame, if any, and rebinds the default framebuffer.
    pub fn reset_frame<B: GpuBackend>(&mut self, ctx: &mut RenderContext<B>) {
        if self.started {
            log::debug!("PostProcessor: frame reset");
        }
        let viewport = ctx.config.viewport();
        drop(FrameGuard::new(&mut ctx.backend, &mut self.started, viewport));
    }
}

// ── passes ─────────────────────────────────────────────────────────────────

fn composite<B: GpuBackend>(
    gpu: &mut B,
    bloom: &BloomResources,
    config: &RenderConfiguration,
) -> std::result::Result<(), GpuError> {
    let post = config.post();
    let t = &bloom.targets;
    let p = &bloom.programs;
    let mut quad = FullscreenQuad {
        gpu,
        vertices: t.quad(),
    };

    quad.target(t.bright());
    quad.bind(&p.extract, [Some(t.scene().texture), None]);
    quad.uniform(p.extract.uniforms.threshold, UniformValue::Float(post.threshold));
    quad.draw()?;

    let weights = pack_weights(&gaussian_weights(post.blur_radius));
    let steps = [
        (t.bright(), t.ping(), [1.0, 0.0]),
        (t.ping(), t.pong(), [0.0, 1.0]),
    ];
    for (source, dest, direction) in steps {
        quad.target(dest);
        quad.bind(&p.blur, [Some(source.texture), None]);
        quad.uniform(p.blur.uniforms.texel, UniformValue::Vec2(source.texel_size()));
        quad.uniform(p.blur.uniforms.direction, UniformValue::Vec2(direction));
        for (loc, w) in p.blur.uniforms.weights.into_iter().zip(weights) {
            quad.uniform(loc, UniformValue::Vec4(w));
        }
        quad.draw()?;
    }

    let viewport = config.viewport();
    quad.gpu.bind_framebuffer(None);
    quad.gpu.set_viewport(viewport.width, viewport.height);
    quad.bind(&p.composite, [Some(t.scene().texture), Some(t.pong().texture)]);
    quad.uniform(p.composite.uniforms.intensity, UniformValue::Float(post.intensity));
    quad.draw()
}

struct FullscreenQuad<'a, B: GpuBackend> {
    gpu: &'a mut B,
    vertices: BufferId,
}

impl<B: GpuBackend> FullscreenQuad<'_, B> {
    fn target(&mut self, target: &RenderTarget) {
        self.gpu.bind_framebuffer(Some(target.framebuffer));
        self.gpu.set_viewport(target.width, target.height);
    }

    fn bind(&mut self, program: &ProgramEntry, textures: [Option<TextureId>; 2]) {
        self.gpu.use_program(Some(program.program));
        self.gpu.set_blend(BlendMode::Disabled);
        self.gpu.bind_texture(0, textures[0]);
        self.gpu.bind_texture(1, textures[1]);
    }

    fn uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        if let Some(loc) = location {
            self.gpu.set_uniform(loc, value);
        }
    }

    fn draw(&mut self) -> std::result::Result<(), GpuError> {
        self.gpu
            .draw_arrays(Primitive::TriangleStrip, self.vertices, canonical_layout(), 0, 4)
    }
}
