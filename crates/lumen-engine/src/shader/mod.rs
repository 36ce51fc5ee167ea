//! Shader modes, their WGSL sources and the compiled program registry.

mod library;
mod mode;
mod registry;

pub use library::{
    BuiltinShaderLoader, DirectoryShaderLoader, MemoryShaderLoader, ShaderLibrary, ShaderLoader,
    ShaderSource,
};
pub use mode::{PostPass, ShaderMode};
pub use registry::{ProgramEntry, ProgramOrigin, ShaderRegistry, UniformCache};
