use thiserror::Error;

/// Failure reported by a [`super::GpuBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("shader program '{label}' failed to compile: {message}")]
    ShaderCompile { label: String, message: String },

    #[error("failed to allocate '{label}': {message}")]
    Allocation { label: String, message: String },

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("draw issued without a program in use")]
    NoProgram,

    #[error("surface error: {0}")]
    Surface(String),

    #[error("device error: {0}")]
    Device(String),
}
