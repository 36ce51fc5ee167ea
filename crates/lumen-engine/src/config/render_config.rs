use crate::coords::{ColorRgba, Viewport};
use crate::error::{RenderError, Result};

/// Largest supported blur radius in texels. The blur kernel carries `radius + 1`
/// weights and the shaders reserve room for sixteen.
pub const MAX_BLUR_RADIUS: u32 = 15;

/// World camera defaults.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in radians. Only used when `orthographic` is false.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub orthographic: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_3,
            near: -1.0,
            far: 1.0,
            orthographic: true,
        }
    }
}

/// Bloom settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PostProcessConfig {
    pub bloom_enabled: bool,
    /// Luminance above which a pixel contributes to bloom.
    pub threshold: f32,
    /// Scale applied to the blurred bright pass during composition.
    pub intensity: f32,
    /// Gaussian radius in texels of the extraction target.
    pub blur_radius: u32,
    /// Run extraction and blur at half the viewport resolution.
    pub half_resolution: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            bloom_enabled: false,
            threshold: 1.0,
            intensity: 0.8,
            blur_radius: 6,
            half_resolution: true,
        }
    }
}

/// Quality flags. These are requests; the preprocessor clamps them to what the
/// device supports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QualityConfig {
    pub msaa_samples: u32,
    pub anisotropy: u16,
    pub vsync: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 1,
            anisotropy: 1,
            vsync: true,
        }
    }
}

/// Initial GPU buffer sizes and the texture memory budget.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Initial vertex buffer capacity, in canonical vertices.
    pub vertex_capacity: usize,
    /// Initial index buffer capacity, in `u32` indices.
    pub index_capacity: usize,
    /// Upper bound on cached texture bytes. `None` means unbounded.
    pub texture_budget_bytes: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            vertex_capacity: 1024,
            index_capacity: 4096,
            texture_budget_bytes: None,
        }
    }
}

/// Immutable description of how the pipeline renders.
///
/// Built once through [`RenderConfigurationBuilder`]. A resize produces a new
/// value through [`RenderConfiguration::with_viewport`]; nothing mutates an
/// existing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfiguration {
    viewport: Viewport,
    clear_color: ColorRgba,
    camera: CameraConfig,
    post: PostProcessConfig,
    quality: QualityConfig,
    limits: ResourceLimits,
}

impl RenderConfiguration {
    pub fn builder() -> RenderConfigurationBuilder {
        RenderConfigurationBuilder::default()
    }

    /// Returns a builder seeded with this configuration's values.
    pub fn to_builder(&self) -> RenderConfigurationBuilder {
        RenderConfigurationBuilder {
            width: self.viewport.width as i64,
            height: self.viewport.height as i64,
            clear_color: self.clear_color,
            camera: self.camera,
            post: self.post,
            quality: self.quality,
            vertex_capacity: self.limits.vertex_capacity as i64,
            index_capacity: self.limits.index_capacity as i64,
            texture_budget_bytes: self
                .limits
                .texture_budget_bytes
                .map(|b| i64::try_from(b).unwrap_or(i64::MAX)),
        }
    }

    /// Same configuration with a different viewport.
    pub fn with_viewport(&self, width: i64, height: i64) -> Result<Self> {
        let viewport = Viewport::try_new(width, height)?;
        Ok(Self {
            viewport,
            ..self.clone()
        })
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn clear_color(&self) -> ColorRgba {
        self.clear_color
    }

    #[inline]
    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    #[inline]
    pub fn post(&self) -> &PostProcessConfig {
        &self.post
    }

    #[inline]
    pub fn quality(&self) -> &QualityConfig {
        &self.quality
    }

    #[inline]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            clear_color: ColorRgba::black(),
            camera: CameraConfig::default(),
            post: PostProcessConfig::default(),
            quality: QualityConfig::default(),
            limits: ResourceLimits::default(),
        }
    }
}

/// Validating builder for [`RenderConfiguration`].
///
/// Setters take signed values where callers commonly compute sizes with signed
/// arithmetic; `build` rejects anything out of range.
#[derive(Debug, Clone)]
pub struct RenderConfigurationBuilder {
    width: i64,
    height: i64,
    clear_color: ColorRgba,
    camera: CameraConfig,
    post: PostProcessConfig,
    quality: QualityConfig,
    vertex_capacity: i64,
    index_capacity: i64,
    texture_budget_bytes: Option<i64>,
}

impl Default for RenderConfigurationBuilder {
    fn default() -> Self {
        RenderConfiguration::default().to_builder()
    }
}

impl RenderConfigurationBuilder {
    pub fn viewport(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: ColorRgba) -> Self {
        self.clear_color = color;
        self
    }

    pub fn camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn post(mut self, post: PostProcessConfig) -> Self {
        self.post = post;
        self
    }

    pub fn bloom(mut self, enabled: bool) -> Self {
        self.post.bloom_enabled = enabled;
        self
    }

    pub fn bloom_threshold(mut self, threshold: f32) -> Self {
        self.post.threshold = threshold;
        self
    }

    pub fn bloom_intensity(mut self, intensity: f32) -> Self {
        self.post.intensity = intensity;
        self
    }

    pub fn blur_radius(mut self, radius: u32) -> Self {
        self.post.blur_radius = radius;
        self
    }

    pub fn half_resolution_bloom(mut self, half: bool) -> Self {
        self.post.half_resolution = half;
        self
    }

    pub fn quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    pub fn msaa_samples(mut self, samples: u32) -> Self {
        self.quality.msaa_samples = samples;
        self
    }

    pub fn anisotropy(mut self, anisotropy: u16) -> Self {
        self.quality.anisotropy = anisotropy;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.quality.vsync = vsync;
        self
    }

    pub fn vertex_capacity(mut self, vertices: i64) -> Self {
        self.vertex_capacity = vertices;
        self
    }

    pub fn index_capacity(mut self, indices: i64) -> Self {
        self.index_capacity = indices;
        self
    }

    /// Texture cache budget in bytes. Negative values are rejected by `build`.
    pub fn texture_budget_bytes(mut self, bytes: i64) -> Self {
        self.texture_budget_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> Result<RenderConfiguration> {
        let viewport = Viewport::try_new(self.width, self.height)?;

        if !self.clear_color.is_finite() {
            return Err(invalid("clear color must be finite"));
        }

        validate_camera(&self.camera)?;
        validate_post(&self.post)?;
        validate_quality(&self.quality)?;

        if self.vertex_capacity <= 0 {
            return Err(invalid(format!(
                "vertex capacity must be positive, got {}",
                self.vertex_capacity
            )));
        }
        if self.index_capacity <= 0 {
            return Err(invalid(format!(
                "index capacity must be positive, got {}",
                self.index_capacity
            )));
        }
        let texture_budget_bytes = match self.texture_budget_bytes {
            Some(b) if b < 0 => {
                return Err(invalid(format!("texture budget must not be negative, got {b}")));
            }
            Some(b) => Some(b as u64),
            None => None,
        };

        Ok(RenderConfiguration {
            viewport,
            clear_color: self.clear_color,
            camera: self.camera,
            post: self.post,
            quality: self.quality,
            limits: ResourceLimits {
                vertex_capacity: self.vertex_capacity as usize,
                index_capacity: self.index_capacity as usize,
                texture_budget_bytes,
            },
        })
    }
}

fn invalid(msg: impl Into<String>) -> RenderError {
    RenderError::InvalidConfig(msg.into())
}

fn validate_camera(c: &CameraConfig) -> Result<()> {
    if !(c.near.is_finite() && c.far.is_finite()) || c.near >= c.far {
        return Err(invalid(format!(
            "camera near plane ({}) must be below far plane ({})",
            c.near, c.far
        )));
    }
    if !c.orthographic {
        if c.near <= 0.0 {
            return Err(invalid("perspective camera needs a positive near plane"));
        }
        if !(c.fov_y > 0.0 && c.fov_y < std::f32::consts::PI) {
            return Err(invalid(format!(
                "field of view must be in (0, pi) radians, got {}",
                c.fov_y
            )));
        }
    }
    Ok(())
}

fn validate_post(p: &PostProcessConfig) -> Result<()> {
    if !p.threshold.is_finite() || p.threshold < 0.0 {
        return Err(invalid(format!(
            "bloom threshold must be a non-negative number, got {}",
            p.threshold
        )));
    }
    if !p.intensity.is_finite() || p.intensity < 0.0 {
        return Err(invalid(format!(
            "bloom intensity must be a non-negative number, got {}",
            p.intensity
        )));
    }
    if p.blur_radius == 0 || p.blur_radius > MAX_BLUR_RADIUS {
        return Err(invalid(format!(
            "blur radius must be in 1..={MAX_BLUR_RADIUS}, got {}",
            p.blur_radius
        )));
    }
    Ok(())
}

fn validate_quality(q: &QualityConfig) -> Result<()> {
    if q.msaa_samples == 0 || q.msaa_samples > 16 || !q.msaa_samples.is_power_of_two() {
        return Err(invalid(format!(
            "msaa samples must be a power of two in 1..=16, got {}",
            q.msaa_samples
        )));
    }
    if q.anisotropy == 0 || q.anisotropy > 16 {
        return Err(invalid(format!(
            "anisotropy must be in 1..=16, got {}",
            q.anisotropy
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── viewport ──────────────────────────────────────────────────────────

    #[test]
    fn build_with_defaults_succeeds() {
        let cfg = RenderConfiguration::builder().viewport(800, 600).build().unwrap();
        assert_eq!(cfg.viewport(), Viewport { width: 800, height: 600 });
        assert!(!cfg.post().bloom_enabled);
    }

    #[test]
    fn non_positive_viewport_is_a_range_error() {
        for (w, h) in [(0, 600), (800, 0), (-800, 600), (800, -1)] {
            let err = RenderConfiguration::builder().viewport(w, h).build().unwrap_err();
            assert!(matches!(err, RenderError::InvalidViewport { .. }), "{w}x{h}");
        }
    }

    #[test]
    fn with_viewport_replaces_only_the_viewport() {
        let cfg = RenderConfiguration::builder()
            .viewport(800, 600)
            .bloom(true)
            .build()
            .unwrap();
        let resized = cfg.with_viewport(1024, 768).unwrap();
        assert_eq!(resized.viewport(), Viewport { width: 1024, height: 768 });
        assert_eq!(resized.post(), cfg.post());
        assert_eq!(cfg.viewport(), Viewport { width: 800, height: 600 });
        assert!(cfg.with_viewport(0, 768).is_err());
    }

    // ── field validation ──────────────────────────────────────────────────

    #[test]
    fn negative_texture_budget_is_rejected() {
        let err = RenderConfiguration::builder()
            .texture_budget_bytes(-1)
            .build()
            .unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn blur_radius_bounds() {
        assert!(RenderConfiguration::builder().blur_radius(0).build().is_err());
        assert!(RenderConfiguration::builder().blur_radius(MAX_BLUR_RADIUS + 1).build().is_err());
        assert!(RenderConfiguration::builder().blur_radius(MAX_BLUR_RADIUS).build().is_ok());
    }

    #[test]
    fn msaa_must_be_power_of_two() {
        assert!(RenderConfiguration::builder().msaa_samples(3).build().is_err());
        assert!(RenderConfiguration::builder().msaa_samples(4).build().is_ok());
    }

    #[test]
    fn perspective_camera_needs_positive_near() {
        let camera = CameraConfig {
            orthographic: false,
            ..CameraConfig::default()
        };
        assert!(RenderConfiguration::builder().camera(camera).build().is_err());

        let camera = CameraConfig {
            orthographic: false,
            near: 0.1,
            far: 100.0,
            ..CameraConfig::default()
        };
        assert!(RenderConfiguration::builder().camera(camera).build().is_ok());
    }

    #[test]
    fn negative_bloom_values_are_rejected() {
        assert!(RenderConfiguration::builder().bloom_threshold(-0.1).build().is_err());
        assert!(RenderConfiguration::builder().bloom_intensity(f32::NAN).build().is_err());
    }

    #[test]
    fn to_builder_round_trips() {
        let cfg = RenderConfiguration::builder()
            .viewport(640, 480)
            .bloom(true)
            .texture_budget_bytes(1 << 20)
            .build()
            .unwrap();
        assert_eq!(cfg.to_builder().build().unwrap(), cfg);
    }

    #[test]
    fn huge_texture_budget_survives_to_builder() {
        let base = RenderConfiguration::default();
        let cfg = RenderConfiguration {
            limits: ResourceLimits {
                texture_budget_bytes: Some(u64::MAX),
                ..base.limits
            },
            ..base
        };
        let rebuilt = cfg.to_builder().build().unwrap();
        assert_eq!(rebuilt.limits().texture_budget_bytes, Some(i64::MAX as u64));
    }
}
