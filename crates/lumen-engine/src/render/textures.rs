use std::collections::HashMap;

use crate::coords::ColorRgba;
use crate::error::{RenderError, Result};
use crate::gpu::{GpuBackend, TextureDesc, TextureFormat, TextureId};

/// Decoded RGBA8 image handed to [`TextureCache::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Single-color image; channels are clamped to `[0, 1]`.
    pub fn solid(width: u32, height: u32, color: ColorRgba) -> Self {
        let texel = color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let count = width as usize * height as usize;
        Self::new(width, height, texel.repeat(count))
    }

    /// Two-color checkerboard with square cells of `cell` pixels.
    pub fn checker(width: u32, height: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let even = (x / cell + y / cell) % 2 == 0;
                pixels.extend_from_slice(if even { &a } else { &b });
            }
        }
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }

    fn validate(&self, source_id: &str) -> Result<()> {
        let invalid = |reason: String| RenderError::InvalidTexture {
            source_id: source_id.to_string(),
            reason,
        };
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.pixels.len() as u64 != self.byte_len() {
            return Err(invalid(format!(
                "{}x{} RGBA8 needs {} bytes, got {}",
                self.width,
                self.height,
                self.byte_len(),
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
struct CachedTexture {
    texture: TextureId,
    bytes: u64,
}

/// One GPU texture per source identifier, bounded by an optional byte budget.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, CachedTexture>,
    used_bytes: u64,
    budget: Option<u64>,
    anisotropy: u16,
}

impl TextureCache {
    pub fn new(budget: Option<u64>, anisotropy: u16) -> Self {
        Self {
            entries: HashMap::new(),
            used_bytes: 0,
            budget,
            anisotropy: anisotropy.max(1),
        }
    }

    /// Returns the cached texture for `source_id`, uploading `image` on first use.
    ///
    /// A later call with the same id returns the existing handle and ignores
    /// `image`.
    pub fn load<B: GpuBackend + ?Sized>(
        &mut self,
        gpu: &mut B,
        source_id: &str,
        image: &TextureImage,
    ) -> Result<TextureId> {
        if let Some(cached) = self.entries.get(source_id) {
            return Ok(cached.texture);
        }
        image.validate(source_id)?;

        let requested = image.byte_len();
        if let Some(budget) = self.budget {
            let available = budget.saturating_sub(self.used_bytes);
            if requested > available {
                return Err(RenderError::TextureBudgetExceeded {
                    source_id: source_id.to_string(),
                    requested,
                    available,
                });
            }
        }

        let desc = TextureDesc {
            label: source_id.to_string(),
            width: image.width,
            height: image.height,
            format: TextureFormat::Rgba8Unorm,
            render_target: false,
            anisotropy: self.anisotropy,
        };
        let texture = gpu.create_texture(&desc, &image.pixels)?;
        self.used_bytes += requested;
        self.entries.insert(
            source_id.to_string(),
            CachedTexture {
                texture,
                bytes: requested,
            },
        );
        log::debug!(
            "TextureCache: uploaded '{source_id}' {}x{} ({} bytes in use)",
            image.width,
            image.height,
            self.used_bytes
        );
        Ok(texture)
    }

    pub fn get(&self, source_id: &str) -> Option<TextureId> {
        self.entries.get(source_id).map(|c| c.texture)
    }

    /// Deletes the texture for `source_id`. Returns false when nothing was cached.
    pub fn unload<B: GpuBackend + ?Sized>(&mut self, gpu: &mut B, source_id: &str) -> bool {
        match self.entries.remove(source_id) {
            Some(cached) => {
                gpu.delete_texture(cached.texture);
                self.used_bytes -= cached.bytes;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn release<B: GpuBackend + ?Sized>(&mut self, gpu: &mut B) {
        for (_, cached) in self.entries.drain() {
            gpu.delete_texture(cached.texture);
        }
        self.used_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCommand, HeadlessBackend};

    fn uploads(gpu: &HeadlessBackend) -> usize {
        gpu.commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::CreateTexture { .. }))
            .count()
    }

    // ── images ────────────────────────────────────────────────────────────

    #[test]
    fn solid_fills_every_texel() {
        let img = TextureImage::solid(2, 3, ColorRgba::new(1.0, 0.0, 2.0, 0.5));
        assert_eq!(img.pixels.len(), 24);
        assert_eq!(&img.pixels[..4], &[255, 0, 255, 128]);
        assert_eq!(&img.pixels[20..], &[255, 0, 255, 128]);
    }

    #[test]
    fn checker_alternates() {
        let img = TextureImage::checker(2, 2, 1, [0; 4], [255; 4]);
        assert_eq!(&img.pixels[..4], &[0; 4]);
        assert_eq!(&img.pixels[4..8], &[255; 4]);
        assert_eq!(&img.pixels[8..12], &[255; 4]);
    }

    // ── cache ─────────────────────────────────────────────────────────────

    #[test]
    fn each_source_uploads_once() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(None, 1);
        let img = TextureImage::solid(4, 4, ColorRgba::white());

        let a = cache.load(&mut gpu, "crate.png", &img).unwrap();
        let b = cache.load(&mut gpu, "crate.png", &img).unwrap();
        assert_eq!(a, b);
        assert_eq!(uploads(&gpu), 1);
        assert_eq!(cache.used_bytes(), 64);
        assert_eq!(gpu.texture_data(a).unwrap(), img.pixels.as_slice());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(None, 1);
        let img = TextureImage::new(2, 2, vec![0; 15]);
        let err = cache.load(&mut gpu, "bad", &img).unwrap_err();
        assert!(matches!(err, RenderError::InvalidTexture { .. }));
        assert_eq!(uploads(&gpu), 0);
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(None, 1);
        let err = cache
            .load(&mut gpu, "empty", &TextureImage::new(0, 4, Vec::new()))
            .unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn budget_is_enforced() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(Some(100), 1);
        cache
            .load(&mut gpu, "a", &TextureImage::solid(4, 4, ColorRgba::white()))
            .unwrap();

        let err = cache
            .load(&mut gpu, "b", &TextureImage::solid(4, 4, ColorRgba::white()))
            .unwrap_err();
        match err {
            RenderError::TextureBudgetExceeded {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 64);
                assert_eq!(available, 36);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unload_returns_budget() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(Some(64), 1);
        let img = TextureImage::solid(4, 4, ColorRgba::white());
        cache.load(&mut gpu, "a", &img).unwrap();
        assert!(cache.unload(&mut gpu, "a"));
        assert!(!cache.unload(&mut gpu, "a"));
        assert_eq!(cache.used_bytes(), 0);
        cache.load(&mut gpu, "b", &img).unwrap();
    }

    #[test]
    fn release_deletes_all() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut cache = TextureCache::new(None, 4);
        let img = TextureImage::solid(1, 1, ColorRgba::white());
        let t = cache.load(&mut gpu, "a", &img).unwrap();
        cache.load(&mut gpu, "b", &img).unwrap();
        assert_eq!(gpu.texture_desc(t).unwrap().anisotropy, 4);

        cache.release(&mut gpu);
        assert!(cache.is_empty());
        assert_eq!(gpu.live_textures(), 0);
    }
}
