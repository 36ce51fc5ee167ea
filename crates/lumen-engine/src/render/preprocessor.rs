use std::fmt;

use super::GeometryBuffers;
use crate::config::RenderConfiguration;
use crate::error::{RenderError, Result};
use crate::gpu::{GpuBackend, GpuCapabilities, TextureFormat};
use crate::post::BloomResources;
use crate::shader::{ProgramEntry, ProgramOrigin, ShaderLibrary, ShaderMode, ShaderRegistry};
use crate::vertex::canonical_layout;

/// What preprocessing did with one shader mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModeOutcome {
    Compiled,
    Fallback,
    Omitted,
}

impl fmt::Display for ModeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeOutcome::Compiled => "compiled",
            ModeOutcome::Fallback => "fallback",
            ModeOutcome::Omitted => "omitted",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BloomStatus {
    /// Bloom was not requested.
    Disabled,
    Active,
    /// Bloom was requested but could not be set up.
    Degraded(String),
}

/// Quality settings after clamping to device support.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EffectiveQuality {
    pub msaa_samples: u32,
    pub anisotropy: u16,
    pub vsync: bool,
    /// Storage format of the bloom capture chain.
    pub capture_format: TextureFormat,
}

impl EffectiveQuality {
    fn resolve(config: &RenderConfiguration, caps: &GpuCapabilities) -> Self {
        let requested = config.quality();

        let msaa_samples = caps
            .msaa_sample_counts
            .iter()
            .copied()
            .filter(|n| *n <= requested.msaa_samples)
            .max()
            .unwrap_or(1);
        if msaa_samples != requested.msaa_samples {
            log::warn!(
                "RenderPreprocessor: {}x MSAA unsupported, using {msaa_samples}x",
                requested.msaa_samples
            );
        }

        let anisotropy = requested.anisotropy.min(caps.max_anisotropy).max(1);
        if anisotropy != requested.anisotropy {
            log::warn!(
                "RenderPreprocessor: anisotropy {} clamped to {anisotropy}",
                requested.anisotropy
            );
        }

        let capture_format = if caps.float_render_targets {
            TextureFormat::Rgba16Float
        } else {
            if config.post().bloom_enabled {
                log::warn!(
                    "RenderPreprocessor: no float render targets, bloom capture falls back to 8-bit"
                );
            }
            TextureFormat::Rgba8Unorm
        };

        Self {
            msaa_samples,
            anisotropy,
            vsync: requested.vsync,
            capture_format,
        }
    }
}

/// Outcome of [`RenderPreprocessor::preprocess`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessReport {
    pub modes: Vec<(ShaderMode, ModeOutcome)>,
    pub bloom: BloomStatus,
    pub quality: EffectiveQuality,
}

impl PreprocessReport {
    pub fn outcome(&self, mode: ShaderMode) -> Option<ModeOutcome> {
        self.modes.iter().find(|(m, _)| *m == mode).map(|(_, o)| *o)
    }

    #[inline]
    pub fn bloom_active(&self) -> bool {
        self.bloom == BloomStatus::Active
    }
}

/// Resources produced by a successful preprocess, handed to the processor.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub config: RenderConfiguration,
    pub caps: GpuCapabilities,
    pub registry: ShaderRegistry,
    pub buffers: GeometryBuffers,
    pub bloom: Option<BloomResources>,
    pub report: PreprocessReport,
}

impl Prepared {
    fn release<B: GpuBackend + ?Sized>(&mut self, gpu: &mut B) {
        self.registry.release(gpu);
        self.buffers.release(gpu);
        if let Some(bloom) = self.bloom.take() {
            bloom.release(gpu);
        }
    }
}

#[derive(Debug)]
enum State {
    Pending,
    Ready(Box<Prepared>),
    Failed,
}

/// One-time compilation and allocation phase.
///
/// `preprocess` runs once; afterwards the instance is handed to
/// [`RenderProcessor::new`](super::RenderProcessor::new).
#[derive(Debug)]
pub struct RenderPreprocessor<B: GpuBackend> {
    backend: B,
    library: ShaderLibrary,
    state: State,
}

impl<B: GpuBackend> RenderPreprocessor<B> {
    pub fn new(backend: B, library: ShaderLibrary) -> Self {
        Self {
            backend,
            library,
            state: State::Pending,
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
    pub fn is_preprocessed(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn report(&self) -> Option<&PreprocessReport> {
        match &self.state {
            State::Ready(prepared) => Some(&prepared.report),
            _ => None,
        }
    }

    /// Validates the device, compiles every shader mode and allocates the
    /// geometry buffers and, when enabled, the bloom resources.
    ///
    /// Only the first call does work; every later call fails with
    /// [`RenderError::AlreadyPreprocessed`].
    pub fn preprocess(&mut self, config: &RenderConfiguration) -> Result<PreprocessReport> {
        if !matches!(self.state, State::Pending) {
            return Err(RenderError::AlreadyPreprocessed);
        }
        match self.run(config) {
            Ok(prepared) => {
                let report = prepared.report.clone();
                self.state = State::Ready(Box::new(prepared));
                Ok(report)
            }
            Err(err) => {
                log::error!("RenderPreprocessor: {err}");
                self.state = State::Failed;
                Err(err)
            }
        }
    }

    /// Releases anything preprocessing allocated and returns the backend.
    pub fn into_backend(self) -> B {
        let Self {
            mut backend, state, ..
        } = self;
        if let State::Ready(mut prepared) = state {
            prepared.release(&mut backend);
        }
        backend
    }

    pub(crate) fn into_prepared(self) -> Result<(B, Prepared)> {
        match self.state {
            State::Ready(prepared) => Ok((self.backend, *prepared)),
            _ => Err(RenderError::NotPreprocessed),
        }
    }

    // ── steps ─────────────────────────────────────────────────────────────

    fn run(&mut self, config: &RenderConfiguration) -> Result<Prepared> {
        if let Some(err) = self.backend.take_error() {
            return Err(RenderError::GpuErrorState(err.to_string()));
        }

        let caps = self.backend.capabilities();
        check_baseline_capabilities(config, &caps)?;
        let quality = EffectiveQuality::resolve(config, &caps);

        let mut registry = ShaderRegistry::new();
        let modes = match self.compile_modes(&mut registry) {
            Ok(modes) => modes,
            Err(err) => {
                registry.release(&mut self.backend);
                return Err(err);
            }
        };

        let buffers = match GeometryBuffers::allocate(&mut self.backend, config.limits()) {
            Ok(buffers) => buffers,
            Err(err) => {
                registry.release(&mut self.backend);
                return Err(err.into());
            }
        };

        let (bloom, bloom_status) = if config.post().bloom_enabled {
            match BloomResources::prepare(
                &mut self.backend,
                &self.library,
                config,
                quality.capture_format,
            ) {
                Ok(bloom) => (Some(bloom), BloomStatus::Active),
                Err(reason) => {
                    log::warn!("RenderPreprocessor: bloom disabled: {reason}");
                    (None, BloomStatus::Degraded(reason))
                }
            }
        } else {
            (None, BloomStatus::Disabled)
        };

        for (mode, outcome) in &modes {
            log::info!("RenderPreprocessor: {mode} {outcome}");
        }
        log::info!(
            "RenderPreprocessor: bloom {bloom_status:?}, msaa {}x, anisotropy {}",
            quality.msaa_samples,
            quality.anisotropy
        );

        Ok(Prepared {
            config: config.clone(),
            caps,
            registry,
            buffers,
            bloom,
            report: PreprocessReport {
                modes,
                bloom: bloom_status,
                quality,
            },
        })
    }

    fn compile_modes(
        &mut self,
        registry: &mut ShaderRegistry,
    ) -> Result<Vec<(ShaderMode, ModeOutcome)>> {
        let mut outcomes = Vec::with_capacity(ShaderMode::ALL.len());
        for mode in ShaderMode::ALL {
            let primary = match self.library.source(mode) {
                Some(src) => {
                    ProgramEntry::compile(&mut self.backend, mode.name(), &src, ProgramOrigin::Primary)
                        .map_err(|e| e.to_string())
                }
                None => Err(format!(
                    "missing source {} / {}",
                    mode.vertex_file(),
                    mode.fragment_file()
                )),
            };

            let outcome = match primary {
                Ok(entry) => {
                    registry.insert(mode, entry);
                    ModeOutcome::Compiled
                }
                Err(reason) if mode.is_baseline() => {
                    return Err(RenderError::BaselineShader(reason));
                }
                Err(reason) => {
                    log::warn!("RenderPreprocessor: {mode} unavailable: {reason}");
                    self.compile_fallback(mode, registry)
                }
            };
            outcomes.push((mode, outcome));
        }
        Ok(outcomes)
    }

    fn compile_fallback(&mut self, mode: ShaderMode, registry: &mut ShaderRegistry) -> ModeOutcome {
        let Some(src) = self.library.fallback(mode) else {
            log::warn!("RenderPreprocessor: {mode} has no fallback, omitted");
            return ModeOutcome::Omitted;
        };
        let label = format!("{} fallback", mode.name());
        match ProgramEntry::compile(&mut self.backend, &label, src, ProgramOrigin::Fallback) {
            Ok(entry) => {
                registry.insert(mode, entry);
                ModeOutcome::Fallback
            }
            Err(err) => {
                log::warn!("RenderPreprocessor: {mode} fallback failed, omitted: {err}");
                ModeOutcome::Omitted
            }
        }
    }
}

fn check_baseline_capabilities(config: &RenderConfiguration, caps: &GpuCapabilities) -> Result<()> {
    let viewport = config.viewport();
    if viewport.width > caps.max_texture_dimension || viewport.height > caps.max_texture_dimension
    {
        return Err(RenderError::MissingCapability(format!(
            "viewport {}x{} exceeds max texture dimension {}",
            viewport.width, viewport.height, caps.max_texture_dimension
        )));
    }
    let needed = canonical_layout().attributes().len() as u32;
    if caps.max_vertex_attributes < needed {
        return Err(RenderError::MissingCapability(format!(
            "{} vertex attributes available, {needed} required",
            caps.max_vertex_attributes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PostProcessConfig, QualityConfig};
    use crate::gpu::{GpuError, HeadlessBackend};
    use crate::shader::MemoryShaderLoader;

    fn config(bloom: bool) -> RenderConfiguration {
        RenderConfiguration::builder()
            .viewport(320, 240)
            .post(PostProcessConfig {
                bloom_enabled: bloom,
                ..PostProcessConfig::default()
            })
            .build()
            .unwrap()
    }

    fn preprocessor(gpu: HeadlessBackend) -> RenderPreprocessor<HeadlessBackend> {
        RenderPreprocessor::new(gpu, ShaderLibrary::builtin())
    }

    // ── sequencing ────────────────────────────────────────────────────────

    #[test]
    fn second_call_fails_after_success() {
        let mut pre = preprocessor(HeadlessBackend::new(320, 240));
        pre.preprocess(&config(false)).unwrap();
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::AlreadyPreprocessed)
        ));
        assert!(pre.is_preprocessed());
    }

    #[test]
    fn second_call_fails_after_failure() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.inject_error(GpuError::Device("lost".into()));
        let mut pre = preprocessor(gpu);
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::GpuErrorState(_))
        ));
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::AlreadyPreprocessed)
        ));
        assert!(!pre.is_preprocessed());
    }

    // ── modes ─────────────────────────────────────────────────────────────

    #[test]
    fn builtin_compiles_everything() {
        let mut pre = preprocessor(HeadlessBackend::new(320, 240));
        let report = pre.preprocess(&config(true)).unwrap();
        for mode in ShaderMode::ALL {
            assert_eq!(report.outcome(mode), Some(ModeOutcome::Compiled), "{mode}");
        }
        assert!(report.bloom_active());
    }

    #[test]
    fn failing_mode_uses_fallback() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.fail_label("soft_glow");
        let mut loader = MemoryShaderLoader::builtin();
        loader.remove("debug_uv.frag.wgsl");
        let mut pre = RenderPreprocessor::new(gpu, ShaderLibrary::from_loader(loader));

        let report = pre.preprocess(&config(false)).unwrap();
        // "soft_glow fallback" matches the failing label too.
        assert_eq!(report.outcome(ShaderMode::SoftGlow), Some(ModeOutcome::Omitted));
        assert_eq!(report.outcome(ShaderMode::DebugUv), Some(ModeOutcome::Fallback));
        assert_eq!(report.outcome(ShaderMode::Bloom), Some(ModeOutcome::Compiled));
    }

    #[test]
    fn mode_without_fallback_is_omitted() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.fail_label("bloom");
        let mut pre = preprocessor(gpu);
        let report = pre.preprocess(&config(false)).unwrap();
        assert_eq!(report.outcome(ShaderMode::Bloom), Some(ModeOutcome::Omitted));
    }

    // ── fatal paths ───────────────────────────────────────────────────────

    #[test]
    fn baseline_failure_is_fatal_and_clean() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.fail_label("baseline");
        let mut pre = preprocessor(gpu);
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::BaselineShader(_))
        ));
        assert_eq!(pre.backend().live_handles(), 0);
    }

    #[test]
    fn buffer_failure_releases_programs() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.fail_label("geometry");
        let mut pre = preprocessor(gpu);
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::Gpu(_))
        ));
        assert_eq!(pre.backend().live_handles(), 0);
    }

    #[test]
    fn oversized_viewport_is_missing_capability() {
        let gpu = HeadlessBackend::new(320, 240).with_capabilities(GpuCapabilities {
            max_texture_dimension: 256,
            ..GpuCapabilities::default()
        });
        let mut pre = preprocessor(gpu);
        assert!(matches!(
            pre.preprocess(&config(false)),
            Err(RenderError::MissingCapability(_))
        ));
    }

    // ── degradation ───────────────────────────────────────────────────────

    #[test]
    fn bloom_failure_degrades() {
        let mut gpu = HeadlessBackend::new(320, 240);
        gpu.fail_label("bloom pong");
        let mut pre = preprocessor(gpu);
        let report = pre.preprocess(&config(true)).unwrap();
        assert!(matches!(report.bloom, BloomStatus::Degraded(_)));

        // Mode programs and geometry buffers only.
        assert_eq!(pre.backend().live_handles(), ShaderMode::ALL.len() + 2);
    }

    #[test]
    fn quality_is_clamped() {
        let gpu = HeadlessBackend::new(320, 240).with_capabilities(GpuCapabilities {
            float_render_targets: false,
            max_anisotropy: 4,
            msaa_sample_counts: vec![1, 4],
            ..GpuCapabilities::default()
        });
        let cfg = RenderConfiguration::builder()
            .viewport(320, 240)
            .quality(QualityConfig {
                msaa_samples: 8,
                anisotropy: 16,
                vsync: false,
            })
            .build()
            .unwrap();
        let mut pre = preprocessor(gpu);
        let q = pre.preprocess(&cfg).unwrap().quality;
        assert_eq!(q.msaa_samples, 4);
        assert_eq!(q.anisotropy, 4);
        assert!(!q.vsync);
        assert_eq!(q.capture_format, TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn into_backend_releases_everything() {
        let mut pre = preprocessor(HeadlessBackend::new(320, 240));
        pre.preprocess(&config(true)).unwrap();
        let gpu = pre.into_backend();
        assert_eq!(gpu.live_handles(), 0);
    }
}
