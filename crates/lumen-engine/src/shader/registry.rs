use std::collections::BTreeMap;

use super::{ShaderMode, ShaderSource};
use crate::gpu::{GpuBackend, GpuError, ProgramId, UniformLocation};

/// Uniform locations of one program, resolved once after linking.
///
/// A `None` entry means the program does not read that uniform; writes to it
/// are skipped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UniformCache {
    pub matrix: Option<UniformLocation>,
    pub color: Option<UniformLocation>,
    pub aspect: Option<UniformLocation>,
    pub use_texture: Option<UniformLocation>,
    pub threshold: Option<UniformLocation>,
    pub intensity: Option<UniformLocation>,
    pub texel: Option<UniformLocation>,
    pub direction: Option<UniformLocation>,
    pub weights: [Option<UniformLocation>; 4],
}

impl UniformCache {
    pub fn resolve<B: GpuBackend + ?Sized>(backend: &B, program: ProgramId) -> Self {
        let loc = |name: &str| backend.uniform_location(program, name);
        Self {
            matrix: loc("u_matrix"),
            color: loc("u_color"),
            aspect: loc("u_aspect"),
            use_texture: loc("u_use_texture"),
            threshold: loc("u_threshold"),
            intensity: loc("u_intensity"),
            texel: loc("u_texel"),
            direction: loc("u_direction"),
            weights: [
                loc("u_weights0"),
                loc("u_weights1"),
                loc("u_weights2"),
                loc("u_weights3"),
            ],
        }
    }
}

/// Where a registered program came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgramOrigin {
    Primary,
    Fallback,
}

/// A linked program with its uniform cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProgramEntry {
    pub program: ProgramId,
    pub uniforms: UniformCache,
    pub origin: ProgramOrigin,
}

impl ProgramEntry {
    /// Compiles and links `source`, then resolves its uniform locations.
    pub fn compile<B: GpuBackend + ?Sized>(
        gpu: &mut B,
        label: &str,
        source: &ShaderSource,
        origin: ProgramOrigin,
    ) -> Result<Self, GpuError> {
        let program = gpu.compile_program(label, &source.vertex, &source.fragment)?;
        Ok(Self {
            program,
            uniforms: UniformCache::resolve(&*gpu, program),
            origin,
        })
    }
}

/// Compiled program per shader mode.
///
/// Baseline is present once preprocessing succeeded; other modes may be
/// missing.
#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    entries: BTreeMap<ShaderMode, ProgramEntry>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mode: ShaderMode, entry: ProgramEntry) -> Option<ProgramEntry> {
        self.entries.insert(mode, entry)
    }

    pub fn get(&self, mode: ShaderMode) -> Option<&ProgramEntry> {
        self.entries.get(&mode)
    }

    pub fn contains(&self, mode: ShaderMode) -> bool {
        self.entries.contains_key(&mode)
    }

    pub fn modes(&self) -> impl Iterator<Item = ShaderMode> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every program and empties the registry.
    pub fn release<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        for (mode, entry) in std::mem::take(&mut self.entries) {
            log::debug!("ShaderRegistry: releasing {mode} program");
            backend.delete_program(entry.program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;
    use crate::shader::ShaderLibrary;

    fn compile(gpu: &mut HeadlessBackend, mode: ShaderMode) -> ProgramEntry {
        let src = ShaderLibrary::builtin().source(mode).unwrap();
        ProgramEntry::compile(gpu, mode.name(), &src, ProgramOrigin::Primary).unwrap()
    }

    #[test]
    fn baseline_resolves_draw_uniforms() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let entry = compile(&mut gpu, ShaderMode::Baseline);
        assert!(entry.uniforms.matrix.is_some());
        assert!(entry.uniforms.color.is_some());
        assert!(entry.uniforms.use_texture.is_some());
        assert!(entry.uniforms.threshold.is_none());
    }

    #[test]
    fn release_deletes_programs() {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut registry = ShaderRegistry::new();
        registry.insert(ShaderMode::Baseline, compile(&mut gpu, ShaderMode::Baseline));
        registry.insert(ShaderMode::Bloom, compile(&mut gpu, ShaderMode::Bloom));
        assert_eq!(gpu.live_handles(), 2);

        registry.release(&mut gpu);
        assert!(registry.is_empty());
        assert_eq!(gpu.live_handles(), 0);
    }
}
