//! The shared uniform block.
//!
//! Every program sees the same block at `@group(0) @binding(0)` and the same
//! texture bindings at group 1. [`UNIFORM_PRELUDE`] declares them and is
//! prepended to each shader stage before compilation, so shader files only
//! contain their entry points.

/// Size of one uniform block upload in bytes.
pub const UNIFORM_BLOCK_SIZE: u64 = 256;

/// WGSL declarations shared by every stage.
pub const UNIFORM_PRELUDE: &str = r#"
struct Uniforms {
    u_matrix: mat4x4<f32>,
    u_color: vec4<f32>,
    u_aspect: f32,
    u_use_texture: f32,
    u_threshold: f32,
    u_intensity: f32,
    u_texel: vec2<f32>,
    u_direction: vec2<f32>,
    u_weights0: vec4<f32>,
    u_weights1: vec4<f32>,
    u_weights2: vec4<f32>,
    u_weights3: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var t_main: texture_2d<f32>;
@group(1) @binding(1) var s_main: sampler;
@group(1) @binding(2) var t_aux: texture_2d<f32>;
"#;

// Offsets follow WGSL uniform layout rules for the struct above.
const FIELDS: &[(&str, u32)] = &[
    ("u_matrix", 0),
    ("u_color", 64),
    ("u_aspect", 80),
    ("u_use_texture", 84),
    ("u_threshold", 88),
    ("u_intensity", 92),
    ("u_texel", 96),
    ("u_direction", 104),
    ("u_weights0", 112),
    ("u_weights1", 128),
    ("u_weights2", 144),
    ("u_weights3", 160),
];

/// Byte offset of a named uniform inside the block.
pub(crate) fn uniform_offset(name: &str) -> Option<u32> {
    FIELDS.iter().find(|(n, _)| *n == name).map(|(_, o)| *o)
}

/// A uniform value as written by the pipeline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    /// Column-major.
    Mat4([f32; 16]),
}

impl UniformValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::cast_slice(v),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v),
            UniformValue::Mat4(v) => bytemuck::cast_slice(v),
        }
    }
}

/// CPU staging copy of the uniform block.
#[derive(Debug, Clone)]
pub(crate) struct UniformBlock {
    bytes: [u8; UNIFORM_BLOCK_SIZE as usize],
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self {
            bytes: [0; UNIFORM_BLOCK_SIZE as usize],
        }
    }
}

impl UniformBlock {
    /// Writes `value` at `offset`. Writes past the end of the block are dropped.
    pub(crate) fn write(&mut self, offset: u32, value: &UniformValue) -> bool {
        let src = value.as_bytes();
        let start = offset as usize;
        let Some(dst) = self.bytes.get_mut(start..start + src.len()) else {
            return false;
        };
        dst.copy_from_slice(src);
        true
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
