use crate::coords::Viewport;
use crate::gpu::{
    BufferId, BufferKind, FramebufferId, GpuBackend, GpuError, TextureDesc, TextureFormat,
    TextureId,
};
use crate::vertex::Vertex;

/// Color texture with the framebuffer that renders into it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub texture: TextureId,
    pub framebuffer: FramebufferId,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    fn allocate<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        label: &str,
        size: Viewport,
        format: TextureFormat,
    ) -> Result<Self, GpuError> {
        let max = gpu.capabilities().max_texture_dimension;
        if size.width > max || size.height > max {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                message: format!(
                    "size {}x{} exceeds max texture dimension {max}",
                    size.width, size.height
                ),
            });
        }
        let desc = TextureDesc {
            label: label.to_string(),
            width: size.width,
            height: size.height,
            format,
            render_target: true,
            anisotropy: 1,
        };
        let zeroed = vec![0u8; desc.byte_len() as usize];
        let texture = gpu.create_texture(&desc, &zeroed)?;
        let framebuffer = match gpu.create_framebuffer(label, texture) {
            Ok(fb) => fb,
            Err(err) => {
                gpu.delete_texture(texture);
                return Err(err);
            }
        };
        Ok(Self {
            texture,
            framebuffer,
            width: size.width,
            height: size.height,
        })
    }

    fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        gpu.delete_framebuffer(self.framebuffer);
        gpu.delete_texture(self.texture);
    }

    /// Size of one texel in uv units.
    #[inline]
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }
}

/// Fullscreen triangle strip in clip space. UV v runs top to bottom.
pub const FULLSCREEN_QUAD: [Vertex; 4] = [
    Vertex::new([-1.0, -1.0], [0.0, 1.0], [1.0; 4]),
    Vertex::new([1.0, -1.0], [1.0, 1.0], [1.0; 4]),
    Vertex::new([-1.0, 1.0], [0.0, 0.0], [1.0; 4]),
    Vertex::new([1.0, 1.0], [1.0, 0.0], [1.0; 4]),
];

#[derive(Debug, Copy, Clone)]
struct TargetSet {
    scene: RenderTarget,
    bright: RenderTarget,
    ping: RenderTarget,
    pong: RenderTarget,
}

impl TargetSet {
    fn allocate<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        viewport: Viewport,
        half_resolution: bool,
        format: TextureFormat,
    ) -> Result<Self, GpuError> {
        let reduced = if half_resolution {
            viewport.halved()
        } else {
            viewport
        };
        let plan = [
            ("bloom scene", viewport),
            ("bloom bright", reduced),
            ("bloom ping", reduced),
            ("bloom pong", reduced),
        ];

        let mut made = Vec::with_capacity(plan.len());
        for (label, size) in plan {
            match RenderTarget::allocate(gpu, label, size, format) {
                Ok(t) => made.push(t),
                Err(err) => {
                    for t in &made {
                        t.release(gpu);
                    }
                    return Err(err);
                }
            }
        }
        Ok(Self {
            scene: made[0],
            bright: made[1],
            ping: made[2],
            pong: made[3],
        })
    }

    fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        for t in [&self.scene, &self.bright, &self.ping, &self.pong] {
            t.release(gpu);
        }
    }
}

fn upload_quad<B: GpuBackend + ?Sized>(gpu: &mut B) -> Result<BufferId, GpuError> {
    let quad = gpu.create_buffer(
        "bloom fullscreen quad",
        BufferKind::Vertex,
        Vertex::SIZE * FULLSCREEN_QUAD.len() as u64,
    )?;
    if let Err(err) = gpu.write_buffer(quad, 0, bytemuck::cast_slice(&FULLSCREEN_QUAD)) {
        gpu.delete_buffer(quad);
        return Err(err);
    }
    Ok(quad)
}

/// Offscreen targets of the bloom path and the quad that samples them.
#[derive(Debug)]
pub struct PostTargets {
    set: TargetSet,
    quad: BufferId,
    format: TextureFormat,
    half_resolution: bool,
}

impl PostTargets {
    /// Allocates scene capture at full size and the extract/blur chain at full
    /// or half size. Texture storage starts zeroed. Nothing is left allocated
    /// on failure.
    pub fn allocate<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        viewport: Viewport,
        half_resolution: bool,
        format: TextureFormat,
    ) -> Result<Self, GpuError> {
        let set = TargetSet::allocate(gpu, viewport, half_resolution, format)?;

        let quad = match upload_quad(gpu) {
            Ok(q) => q,
            Err(err) => {
                set.release(gpu);
                return Err(err);
            }
        };

        log::debug!(
            "PostTargets: allocated {}x{} ({:?}, half resolution: {half_resolution})",
            viewport.width,
            viewport.height,
            format
        );
        Ok(Self {
            set,
            quad,
            format,
            half_resolution,
        })
    }

    #[inline]
    pub fn scene(&self) -> &RenderTarget {
        &self.set.scene
    }

    #[inline]
    pub fn bright(&self) -> &RenderTarget {
        &self.set.bright
    }

    #[inline]
    pub fn ping(&self) -> &RenderTarget {
        &self.set.ping
    }

    #[inline]
    pub fn pong(&self) -> &RenderTarget {
        &self.set.pong
    }

    #[inline]
    pub fn quad(&self) -> BufferId {
        self.quad
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Replaces the targets with ones sized for `viewport`. The quad is kept.
    /// On failure the old targets stay valid.
    pub fn resize<B: GpuBackend + ?Sized>(
        &mut self,
        gpu: &mut B,
        viewport: Viewport,
    ) -> Result<(), GpuError> {
        let set = TargetSet::allocate(gpu, viewport, self.half_resolution, self.format)?;
        self.set.release(gpu);
        self.set = set;
        log::debug!("PostTargets: resized to {}x{}", viewport.width, viewport.height);
        Ok(())
    }

    pub fn release<B: GpuBackend + ?Sized>(&self, gpu: &mut B) {
        self.set.release(gpu);
        gpu.delete_buffer(self.quad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    fn viewport(w: i64, h: i64) -> Viewport {
        Viewport::try_new(w, h).unwrap()
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn storage_starts_zeroed() {
        let mut gpu = HeadlessBackend::new(64, 32);
        let targets =
            PostTargets::allocate(&mut gpu, viewport(64, 32), true, TextureFormat::Rgba16Float)
                .unwrap();
        for t in [targets.scene(), targets.bright(), targets.ping(), targets.pong()] {
            let data = gpu.texture_data(t.texture).unwrap();
            assert!(!data.is_empty());
            assert!(data.iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn half_resolution_chain() {
        let mut gpu = HeadlessBackend::new(64, 32);
        let targets =
            PostTargets::allocate(&mut gpu, viewport(64, 32), true, TextureFormat::Rgba8Unorm)
                .unwrap();
        assert_eq!((targets.scene().width, targets.scene().height), (64, 32));
        assert_eq!((targets.bright().width, targets.bright().height), (32, 16));
        assert_eq!(targets.pong().texel_size(), [1.0 / 32.0, 1.0 / 16.0]);
    }

    #[test]
    fn quad_holds_fullscreen_strip() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let targets =
            PostTargets::allocate(&mut gpu, viewport(8, 8), false, TextureFormat::Rgba8Unorm)
                .unwrap();
        let data = gpu.buffer_data(targets.quad()).unwrap();
        assert_eq!(data, bytemuck::cast_slice::<Vertex, u8>(&FULLSCREEN_QUAD));
    }

    // ── failure ───────────────────────────────────────────────────────────

    #[test]
    fn partial_failure_leaves_nothing() {
        let mut gpu = HeadlessBackend::new(8, 8);
        gpu.fail_label("bloom pong");
        assert!(
            PostTargets::allocate(&mut gpu, viewport(8, 8), true, TextureFormat::Rgba8Unorm)
                .is_err()
        );
        assert_eq!(gpu.live_handles(), 0);

        let mut gpu = HeadlessBackend::new(8, 8);
        gpu.fail_label("quad");
        assert!(
            PostTargets::allocate(&mut gpu, viewport(8, 8), true, TextureFormat::Rgba8Unorm)
                .is_err()
        );
        assert_eq!(gpu.live_handles(), 0);
    }

    #[test]
    fn resize_replaces_targets_and_keeps_quad() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut targets =
            PostTargets::allocate(&mut gpu, viewport(8, 8), false, TextureFormat::Rgba8Unorm)
                .unwrap();
        let quad = targets.quad();
        let before = gpu.live_handles();

        targets.resize(&mut gpu, viewport(20, 10)).unwrap();
        assert_eq!(targets.quad(), quad);
        assert_eq!(targets.scene().width, 20);
        assert_eq!(gpu.live_handles(), before);

        targets.release(&mut gpu);
        assert_eq!(gpu.live_handles(), 0);
    }

    #[test]
    fn oversized_targets_fail_before_upload() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let max = gpu.capabilities().max_texture_dimension as i64;
        let err = PostTargets::allocate(
            &mut gpu,
            viewport(3_000_000, 3_000_000),
            false,
            TextureFormat::Rgba16Float,
        )
        .unwrap_err();
        assert!(matches!(err, GpuError::Allocation { .. }));
        assert_eq!(gpu.live_handles(), 0);

        let mut targets =
            PostTargets::allocate(&mut gpu, viewport(8, 8), false, TextureFormat::Rgba8Unorm)
                .unwrap();
        assert!(targets.resize(&mut gpu, viewport(max + 1, 8)).is_err());
        assert_eq!(targets.scene().width, 8);
    }
}
