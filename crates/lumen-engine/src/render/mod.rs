//! Preprocessing and per-frame draw submission.
//!
//! `RenderPreprocessor` compiles and allocates once; `RenderProcessor` takes
//! the result over and submits draws against the owned `RenderContext`.
//!
//! Conventions:
//! - Every upload is normalized to the canonical 32-byte `Vertex`.
//! - Uniforms are written immediately before each draw.

mod buffers;
mod context;
mod preprocessor;
mod processor;
mod textures;

pub use buffers::GeometryBuffers;
pub use context::RenderContext;
pub use preprocessor::{
    BloomStatus, EffectiveQuality, ModeOutcome, PreprocessReport, RenderPreprocessor,
};
pub use processor::RenderProcessor;
pub use textures::{TextureCache, TextureImage};
