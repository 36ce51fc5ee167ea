//! Error taxonomy for the rendering pipeline.
//!
//! Construction and capability errors are returned to the caller. Degradable
//! conditions (an optional shader mode or the bloom path failing) never show up
//! here; they are absorbed by the preprocessor and logged.

use thiserror::Error;

use crate::gpu::GpuError;

/// Errors surfaced by the pipeline API.
#[derive(Debug, Error)]
pub enum RenderError {
    // ── construction ──────────────────────────────────────────────────────
    /// Width or height was zero or negative.
    #[error("viewport dimensions must be positive, got {width}x{height}")]
    InvalidViewport { width: i64, height: i64 },

    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),

    #[error("invalid vertex data: {0}")]
    InvalidVertexData(String),

    #[error("index {index} is out of range for {vertex_count} uploaded vertices")]
    InvalidIndices { index: u32, vertex_count: usize },

    #[error("invalid texture '{source_id}': {reason}")]
    InvalidTexture { source_id: String, reason: String },

    #[error("texture '{source_id}' needs {requested} bytes but only {available} of the texture budget remain")]
    TextureBudgetExceeded {
        source_id: String,
        requested: u64,
        available: u64,
    },

    // ── capability ────────────────────────────────────────────────────────
    #[error("GPU reported a pending error before preprocessing: {0}")]
    GpuErrorState(String),

    #[error("required GPU capability missing: {0}")]
    MissingCapability(String),

    #[error("baseline shader could not be compiled: {0}")]
    BaselineShader(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    // ── sequencing ────────────────────────────────────────────────────────
    #[error("preprocess has already run on this instance")]
    AlreadyPreprocessed,

    #[error("render processor requires a successfully preprocessed pipeline")]
    NotPreprocessed,

    #[error("begin_frame called while a frame is already started")]
    FrameAlreadyStarted,

    #[error("finalize_frame called without a matching begin_frame")]
    FrameNotStarted,
}

impl RenderError {
    /// Returns true for errors raised by invalid caller-provided values.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            RenderError::InvalidViewport { .. }
                | RenderError::InvalidConfig(_)
                | RenderError::InvalidLayout(_)
                | RenderError::InvalidVertexData(_)
                | RenderError::InvalidIndices { .. }
                | RenderError::InvalidTexture { .. }
                | RenderError::TextureBudgetExceeded { .. }
        )
    }

    /// Returns true for frame or lifecycle ordering mistakes.
    pub fn is_sequencing_error(&self) -> bool {
        matches!(
            self,
            RenderError::AlreadyPreprocessed
                | RenderError::NotPreprocessed
                | RenderError::FrameAlreadyStarted
                | RenderError::FrameNotStarted
        )
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
