use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{PostPass, ShaderMode};

const SPRITE_VERT: &str = include_str!("wgsl/sprite.vert.wgsl");
const FULLSCREEN_VERT: &str = include_str!("wgsl/fullscreen.vert.wgsl");

const BUILTIN: &[(&str, &str)] = &[
    ("baseline.vert.wgsl", SPRITE_VERT),
    ("baseline.frag.wgsl", include_str!("wgsl/baseline.frag.wgsl")),
    ("soft_glow.vert.wgsl", SPRITE_VERT),
    ("soft_glow.frag.wgsl", include_str!("wgsl/soft_glow.frag.wgsl")),
    ("bloom.vert.wgsl", SPRITE_VERT),
    ("bloom.frag.wgsl", include_str!("wgsl/bloom.frag.wgsl")),
    ("debug_uv.vert.wgsl", SPRITE_VERT),
    ("debug_uv.frag.wgsl", include_str!("wgsl/debug_uv.frag.wgsl")),
    ("bloom_extract.vert.wgsl", FULLSCREEN_VERT),
    ("bloom_extract.frag.wgsl", include_str!("wgsl/bloom_extract.frag.wgsl")),
    ("bloom_blur.vert.wgsl", FULLSCREEN_VERT),
    ("bloom_blur.frag.wgsl", include_str!("wgsl/bloom_blur.frag.wgsl")),
    ("bloom_composite.vert.wgsl", FULLSCREEN_VERT),
    ("bloom_composite.frag.wgsl", include_str!("wgsl/bloom_composite.frag.wgsl")),
];

/// Vertex and fragment stage of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Resolves shader stage files by name.
pub trait ShaderLoader {
    fn load(&self, name: &str) -> Option<String>;
}

/// The WGSL set compiled into the crate.
#[derive(Debug, Copy, Clone, Default)]
pub struct BuiltinShaderLoader;

impl ShaderLoader for BuiltinShaderLoader {
    fn load(&self, name: &str) -> Option<String> {
        BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, src)| (*src).to_string())
    }
}

/// Reads `<root>/<name>` from disk.
#[derive(Debug, Clone)]
pub struct DirectoryShaderLoader {
    root: PathBuf,
}

impl DirectoryShaderLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderLoader for DirectoryShaderLoader {
    fn load(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(src) => Some(src),
            Err(err) => {
                log::debug!("DirectoryShaderLoader: {} unavailable: {err}", path.display());
                None
            }
        }
    }
}

/// In-memory stage files, seeded from the built-in set or empty.
#[derive(Debug, Clone, Default)]
pub struct MemoryShaderLoader {
    files: HashMap<String, String>,
}

impl MemoryShaderLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a copy of the built-in set.
    pub fn builtin() -> Self {
        Self {
            files: BUILTIN
                .iter()
                .map(|(n, s)| ((*n).to_string(), (*s).to_string()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.files.insert(name.into(), source.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.files.remove(name);
        self
    }
}

impl ShaderLoader for MemoryShaderLoader {
    fn load(&self, name: &str) -> Option<String> {
        self.files.get(name).cloned()
    }
}

/// Shader sources for every mode and post pass, plus per-mode fallbacks.
///
/// A fallback is a simpler program used when a mode's primary source fails
/// to load or compile. The baseline mode never has one.
pub struct ShaderLibrary {
    loader: Box<dyn ShaderLoader>,
    fallbacks: HashMap<ShaderMode, ShaderSource>,
}

impl fmt::Debug for ShaderLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderLibrary")
            .field("fallbacks", &self.fallbacks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShaderLibrary {
    /// Built-in sources and the default fallbacks.
    pub fn builtin() -> Self {
        Self::from_loader(BuiltinShaderLoader)
    }

    /// Sources from `loader`, default fallbacks.
    pub fn from_loader(loader: impl ShaderLoader + 'static) -> Self {
        let mut library = Self {
            loader: Box::new(loader),
            fallbacks: HashMap::new(),
        };
        library.register_fallback(
            ShaderMode::SoftGlow,
            ShaderSource::new(
                SPRITE_VERT,
                include_str!("wgsl/soft_glow_fallback.frag.wgsl"),
            ),
        );
        library.register_fallback(
            ShaderMode::DebugUv,
            ShaderSource::new(
                SPRITE_VERT,
                include_str!("wgsl/debug_uv_fallback.frag.wgsl"),
            ),
        );
        library
    }

    /// Registers or replaces the fallback for `mode`. Ignored for baseline.
    pub fn register_fallback(&mut self, mode: ShaderMode, source: ShaderSource) {
        if mode.is_baseline() {
            log::warn!("ShaderLibrary: baseline cannot have a fallback; ignored");
            return;
        }
        self.fallbacks.insert(mode, source);
    }

    pub fn remove_fallback(&mut self, mode: ShaderMode) -> Option<ShaderSource> {
        self.fallbacks.remove(&mode)
    }

    pub fn fallback(&self, mode: ShaderMode) -> Option<&ShaderSource> {
        self.fallbacks.get(&mode)
    }

    /// Primary source of a draw mode; `None` if either stage is missing.
    pub fn source(&self, mode: ShaderMode) -> Option<ShaderSource> {
        self.load_pair(&mode.vertex_file(), &mode.fragment_file())
    }

    /// Source of a bloom pass; `None` if either stage is missing.
    pub fn post_source(&self, pass: PostPass) -> Option<ShaderSource> {
        self.load_pair(&pass.vertex_file(), &pass.fragment_file())
    }

    fn load_pair(&self, vertex: &str, fragment: &str) -> Option<ShaderSource> {
        let v = self.loader.load(vertex);
        let f = self.loader.load(fragment);
        match (v, f) {
            (Some(v), Some(f)) => Some(ShaderSource::new(v, f)),
            (v, _) => {
                let missing = if v.is_none() { vertex } else { fragment };
                log::debug!("ShaderLibrary: missing stage {missing}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_mode_and_pass() {
        let lib = ShaderLibrary::builtin();
        for mode in ShaderMode::ALL {
            let src = lib.source(mode).unwrap();
            assert!(src.vertex.contains("fn vs_main"), "{mode}");
            assert!(src.fragment.contains("fn fs_main"), "{mode}");
        }
        for pass in PostPass::ALL {
            assert!(lib.post_source(pass).is_some(), "{pass:?}");
        }
    }

    #[test]
    fn default_fallbacks() {
        let lib = ShaderLibrary::builtin();
        assert!(lib.fallback(ShaderMode::Baseline).is_none());
        assert!(lib.fallback(ShaderMode::SoftGlow).is_some());
        assert!(lib.fallback(ShaderMode::Bloom).is_none());
        assert!(lib.fallback(ShaderMode::DebugUv).is_some());
    }

    #[test]
    fn baseline_fallback_is_rejected() {
        let mut lib = ShaderLibrary::builtin();
        lib.register_fallback(ShaderMode::Baseline, ShaderSource::new("a", "b"));
        assert!(lib.fallback(ShaderMode::Baseline).is_none());
    }

    #[test]
    fn missing_stage_yields_none() {
        let mut loader = MemoryShaderLoader::builtin();
        loader.remove("soft_glow.frag.wgsl");
        let lib = ShaderLibrary::from_loader(loader);
        assert!(lib.source(ShaderMode::SoftGlow).is_none());
        assert!(lib.source(ShaderMode::Baseline).is_some());
    }

    #[test]
    fn directory_loader_reads_files() {
        let dir = std::env::temp_dir().join(format!("lumen-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("x.wgsl"), "fn vs_main() {}").unwrap();

        let loader = DirectoryShaderLoader::new(&dir);
        assert_eq!(loader.load("x.wgsl").as_deref(), Some("fn vs_main() {}"));
        assert_eq!(loader.load("missing.wgsl"), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
