//! The four effect programs and their uniform contract.

use std::path::Path;

use recon_core::ShaderPaths;

use crate::backend::RenderBackend;
use crate::EngineError;

/// Uniform names the compositor sets. Programs may omit any of them.
pub mod uniforms {
    /// sampler2D, unit 0 (screen + glitch).
    pub const SCREEN_TEXTURE: &str = "screenTexture";
    /// sampler2D, unit 1 (screen + glitch).
    pub const BLOOM_BLUR: &str = "bloomBlur";
    /// bool (screen + glitch).
    pub const BLOOM: &str = "bloom";
    /// float (screen + glitch).
    pub const EXPOSURE: &str = "exposure";
    /// float seconds (glitch only).
    pub const TIME: &str = "time";
    /// bool (blur).
    pub const HORIZONTAL: &str = "horizontal";
    /// sampler2D, unit 0 (blur).
    pub const IMAGE: &str = "image";
    /// sampler2D, unit 0 (extract).
    pub const SCENE: &str = "scene";
    /// float luminance (extract).
    pub const THRESHOLD: &str = "threshold";
}

pub const SCREEN_VERT: &str = include_str!("../shaders/screen.vs");
pub const SCREEN_FRAG: &str = include_str!("../shaders/screen.fs");
pub const GLITCH_FRAG: &str = include_str!("../shaders/glitch.fs");
pub const BLUR_FRAG: &str = include_str!("../shaders/blur.fs");
pub const EXTRACT_FRAG: &str = include_str!("../shaders/extract_bright.fs");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Screen,
    Glitch,
    Blur,
    Extract,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Screen,
        EffectKind::Glitch,
        EffectKind::Blur,
        EffectKind::Extract,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Screen => "screen",
            EffectKind::Glitch => "glitch",
            EffectKind::Blur => "blur",
            EffectKind::Extract => "extract",
        }
    }

    fn index(self) -> usize {
        match self {
            EffectKind::Screen => 0,
            EffectKind::Glitch => 1,
            EffectKind::Blur => 2,
            EffectKind::Extract => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub vert: String,
    pub frag: String,
    /// Optional human-friendly origin (path/label) for logs.
    pub origin: Option<String>,
}

impl ShaderSource {
    fn builtin(frag: &str, label: &str) -> Self {
        Self {
            vert: SCREEN_VERT.to_string(),
            frag: frag.to_string(),
            origin: Some(format!("builtin:{label}")),
        }
    }

    pub fn from_files(vert: &Path, frag: &Path) -> Result<Self, EngineError> {
        let read = |p: &Path| {
            std::fs::read_to_string(p).map_err(|source| EngineError::Io {
                path: p.to_path_buf(),
                source,
            })
        };
        Ok(Self {
            vert: read(vert)?,
            frag: read(frag)?,
            origin: Some(format!("{} + {}", vert.display(), frag.display())),
        })
    }
}

/// Sources for all four programs, in `EffectKind` order.
#[derive(Debug, Clone)]
pub struct ProgramSources {
    sources: [ShaderSource; 4],
}

impl ProgramSources {
    /// The sources embedded in the crate (`shaders/`).
    pub fn builtin() -> Self {
        Self {
            sources: [
                ShaderSource::builtin(SCREEN_FRAG, "screen"),
                ShaderSource::builtin(GLITCH_FRAG, "glitch"),
                ShaderSource::builtin(BLUR_FRAG, "blur"),
                ShaderSource::builtin(EXTRACT_FRAG, "extract"),
            ],
        }
    }

    pub fn from_paths(paths: &ShaderPaths) -> Result<Self, EngineError> {
        Ok(Self {
            sources: [
                ShaderSource::from_files(&paths.vertex, &paths.screen)?,
                ShaderSource::from_files(&paths.vertex, &paths.glitch)?,
                ShaderSource::from_files(&paths.vertex, &paths.blur)?,
                ShaderSource::from_files(&paths.vertex, &paths.extract)?,
            ],
        })
    }

    pub fn get(&self, kind: EffectKind) -> &ShaderSource {
        &self.sources[kind.index()]
    }

    pub fn set(&mut self, kind: EffectKind, source: ShaderSource) {
        self.sources[kind.index()] = source;
    }
}

/// The compiled program set. Compiled once; never recompiled.
pub struct EffectPrograms<B: RenderBackend> {
    programs: Option<[B::Program; 4]>,
}

impl<B: RenderBackend> std::fmt::Debug for EffectPrograms<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectPrograms")
            .field("programs", &self.programs)
            .finish()
    }
}

impl<B: RenderBackend> EffectPrograms<B> {
    pub fn compile(gl: &B, sources: &ProgramSources) -> Result<Self, EngineError> {
        let mut built: Vec<B::Program> = Vec::with_capacity(4);
        for kind in EffectKind::ALL {
            let src = sources.get(kind);
            match gl.compile_program(&src.vert, &src.frag) {
                Ok(p) => built.push(p),
                Err(e) => {
                    tracing::error!(
                        program = kind.name(),
                        origin = src.origin.as_deref().unwrap_or("<unknown>"),
                        "effect program failed to build: {e}"
                    );
                    for p in built {
                        gl.delete_program(p);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            programs: Some([built[0], built[1], built[2], built[3]]),
        })
    }

    pub fn get(&self, kind: EffectKind) -> Result<B::Program, EngineError> {
        self.programs
            .map(|p| p[kind.index()])
            .ok_or_else(|| EngineError::other("effect programs already destroyed"))
    }

    pub fn destroy(&mut self, gl: &B) {
        if let Some(programs) = self.programs.take() {
            for p in programs {
                gl.delete_program(p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn builtin_sources_declare_the_uniform_contract() {
        let s = ProgramSources::builtin();
        for kind in [EffectKind::Screen, EffectKind::Glitch] {
            let frag = &s.get(kind).frag;
            for u in [
                uniforms::SCREEN_TEXTURE,
                uniforms::BLOOM_BLUR,
                uniforms::BLOOM,
                uniforms::EXPOSURE,
            ] {
                assert!(frag.contains(u), "{} is missing {u}", kind.name());
            }
        }
        assert!(s.get(EffectKind::Glitch).frag.contains("uniform float time"));
        assert!(!s.get(EffectKind::Screen).frag.contains("uniform float time"));
        assert!(s.get(EffectKind::Blur).frag.contains("uniform bool horizontal"));
        assert!(s.get(EffectKind::Extract).frag.contains("uniform sampler2D scene"));
    }

    #[test]
    fn compile_builds_four_distinct_programs() {
        let gl = RecordingBackend::new();
        let mut progs = EffectPrograms::compile(&gl, &ProgramSources::builtin()).unwrap();

        let ids: Vec<_> = EffectKind::ALL
            .iter()
            .map(|k| progs.get(*k).unwrap())
            .collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }

        progs.destroy(&gl);
        progs.destroy(&gl);
        assert_eq!(gl.live_objects(), 0);
        assert!(progs.get(EffectKind::Screen).is_err());
    }

    #[test]
    fn compile_failure_releases_already_built_programs() {
        let gl = RecordingBackend::new();
        let mut sources = ProgramSources::builtin();
        sources.set(
            EffectKind::Blur,
            ShaderSource {
                vert: SCREEN_VERT.to_string(),
                frag: "#error broken".to_string(),
                origin: None,
            },
        );
        gl.fail_compile_containing("#error", "0:1: broken");

        let err = EffectPrograms::compile(&gl, &sources).expect_err("blur fails");
        assert!(matches!(err, EngineError::FragmentCompile(_)));
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn missing_shader_file_reports_its_path() {
        let paths = ShaderPaths::in_dir("/no/such/shader/dir");
        let err = ProgramSources::from_paths(&paths).unwrap_err();
        match err {
            EngineError::Io { path, .. } => assert_eq!(path, paths.vertex),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn sources_load_from_a_directory() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("recon_shaders_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = ShaderPaths::in_dir(&dir);
        std::fs::write(&paths.vertex, SCREEN_VERT).unwrap();
        std::fs::write(&paths.screen, SCREEN_FRAG).unwrap();
        std::fs::write(&paths.glitch, GLITCH_FRAG).unwrap();
        std::fs::write(&paths.blur, BLUR_FRAG).unwrap();
        std::fs::write(&paths.extract, EXTRACT_FRAG).unwrap();

        let s = ProgramSources::from_paths(&paths).unwrap();
        assert_eq!(s.get(EffectKind::Blur).frag, BLUR_FRAG);
        assert!(s.get(EffectKind::Blur).origin.as_deref().unwrap().contains("blur.fs"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
