use std::fmt;

use crate::gpu::BlendMode;

/// Draw-time shader variant.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderMode {
    /// Flat or textured color. Always available after preprocessing.
    #[default]
    Baseline,
    /// Radial alpha falloff.
    SoftGlow,
    /// Additive, premultiplied, HDR-friendly.
    Bloom,
    /// Visualizes texture coordinates.
    DebugUv,
}

impl ShaderMode {
    /// Every mode, in compilation order.
    pub const ALL: [ShaderMode; 4] = [
        ShaderMode::Baseline,
        ShaderMode::SoftGlow,
        ShaderMode::Bloom,
        ShaderMode::DebugUv,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ShaderMode::Baseline => "baseline",
            ShaderMode::SoftGlow => "soft_glow",
            ShaderMode::Bloom => "bloom",
            ShaderMode::DebugUv => "debug_uv",
        }
    }

    pub const fn blend(self) -> BlendMode {
        match self {
            ShaderMode::Baseline | ShaderMode::DebugUv => BlendMode::Disabled,
            ShaderMode::SoftGlow => BlendMode::Alpha,
            ShaderMode::Bloom => BlendMode::Additive,
        }
    }

    #[inline]
    pub const fn is_baseline(self) -> bool {
        matches!(self, ShaderMode::Baseline)
    }

    /// `<mode>.vert.wgsl`
    pub fn vertex_file(self) -> String {
        format!("{}.vert.wgsl", self.name())
    }

    /// `<mode>.frag.wgsl`
    pub fn fragment_file(self) -> String {
        format!("{}.frag.wgsl", self.name())
    }
}

impl fmt::Display for ShaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fullscreen pass of the bloom compositor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PostPass {
    /// Bright-pass extraction.
    Extract,
    /// One direction of the separable blur.
    Blur,
    /// Scene plus scaled blur into the default framebuffer.
    Composite,
}

impl PostPass {
    pub const ALL: [PostPass; 3] = [PostPass::Extract, PostPass::Blur, PostPass::Composite];

    pub const fn name(self) -> &'static str {
        match self {
            PostPass::Extract => "extract",
            PostPass::Blur => "blur",
            PostPass::Composite => "composite",
        }
    }

    /// `bloom_<pass>.vert.wgsl`
    pub fn vertex_file(self) -> String {
        format!("bloom_{}.vert.wgsl", self.name())
    }

    /// `bloom_<pass>.frag.wgsl`
    pub fn fragment_file(self) -> String {
        format!("bloom_{}.frag.wgsl", self.name())
    }
}
