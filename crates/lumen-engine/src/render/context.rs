use super::preprocessor::{EffectiveQuality, Prepared, PreprocessReport};
use super::{GeometryBuffers, TextureCache};
use crate::config::RenderConfiguration;
use crate::gpu::{GpuBackend, GpuCapabilities};
use crate::post::BloomResources;
use crate::shader::ShaderRegistry;

/// Owned table of every GPU resource the pipeline uses.
///
/// Built from a successful preprocess and passed by reference to the
/// processor and the post processor. Nothing here is global.
#[derive(Debug)]
pub struct RenderContext<B: GpuBackend> {
    pub(crate) backend: B,
    pub(crate) config: RenderConfiguration,
    pub(crate) caps: GpuCapabilities,
    pub(crate) report: PreprocessReport,
    pub(crate) registry: ShaderRegistry,
    pub(crate) buffers: GeometryBuffers,
    pub(crate) textures: TextureCache,
    pub(crate) bloom: Option<BloomResources>,
}

impl<B: GpuBackend> RenderContext<B> {
    pub(crate) fn from_prepared(backend: B, prepared: Prepared) -> Self {
        let textures = TextureCache::new(
            prepared.config.limits().texture_budget_bytes,
            prepared.report.quality.anisotropy,
        );
        Self {
            backend,
            config: prepared.config,
            caps: prepared.caps,
            report: prepared.report,
            registry: prepared.registry,
            buffers: prepared.buffers,
            textures,
            bloom: prepared.bloom,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &RenderConfiguration {
        &self.config
    }

    #[inline]
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.caps
    }

    #[inline]
    pub fn report(&self) -> &PreprocessReport {
        &self.report
    }

    #[inline]
    pub fn quality(&self) -> &EffectiveQuality {
        &self.report.quality
    }

    #[inline]
    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    #[inline]
    pub fn geometry(&self) -> &GeometryBuffers {
        &self.buffers
    }

    #[inline]
    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    #[inline]
    pub fn bloom(&self) -> Option<&BloomResources> {
        self.bloom.as_ref()
    }

    #[inline]
    pub fn bloom_active(&self) -> bool {
        self.bloom.is_some()
    }

    /// Deletes every handle the context owns.
    pub(crate) fn release(&mut self) {
        self.registry.release(&mut self.backend);
        self.buffers.release(&mut self.backend);
        self.textures.release(&mut self.backend);
        if let Some(bloom) = self.bloom.take() {
            bloom.release(&mut self.backend);
        }
        log::debug!("RenderContext: released all GPU resources");
    }
}
