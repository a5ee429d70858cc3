//! JSON configuration for the host, compositor, camera and minigame.
//!
//! Every field has a default, so an empty object (or no file at all) is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub window: WindowConfig,
    pub compositor: CompositorConfig,
    pub camera: CameraConfig,
    pub game: GameConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cyberpunk Recon".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Vertex/fragment path pairs for the four effect programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderPaths {
    /// Vertex stage shared by all four programs.
    pub vertex: PathBuf,
    pub screen: PathBuf,
    pub glitch: PathBuf,
    pub blur: PathBuf,
    pub extract: PathBuf,
}

impl ShaderPaths {
    /// Conventional layout under a shader directory (`screen.vs`, `screen.fs`, ...).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vertex: dir.join("screen.vs"),
            screen: dir.join("screen.fs"),
            glitch: dir.join("glitch.fs"),
            blur: dir.join("blur.fs"),
            extract: dir.join("extract_bright.fs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositorConfig {
    pub use_glitch: bool,
    pub use_bloom: bool,
    pub exposure: f32,
    /// Luminance above which the bright pass keeps a pixel.
    pub bloom_threshold: f32,
    /// Separable blur passes per frame. Even counts finish in ping-pong slot 0, odd in slot 1.
    pub blur_iterations: u32,
    /// Load effect programs from disk instead of the embedded sources.
    pub shaders: Option<ShaderPaths>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            use_glitch: false,
            use_bloom: false,
            exposure: 1.0,
            bloom_threshold: 0.8,
            blur_iterations: 10,
            shaders: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub speed: f32,
    pub sensitivity: f32,
    /// Resting field of view in degrees.
    pub zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 10.0],
            speed: 10.0,
            sensitivity: 0.1,
            zoom: 45.0,
        }
    }
}

/// Axis-aligned box (min inclusive, max exclusive) that targets spawn inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for SpawnBounds {
    fn default() -> Self {
        Self {
            min: [-60.0, -4.0, -70.0],
            max: [60.0, 20.0, 30.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Round length in seconds.
    pub duration: f32,
    pub spawn_interval: f32,
    pub max_targets: usize,
    pub hit_radius: f32,
    /// Targets further than this need the camera zoomed in.
    pub far_distance: f32,
    /// FOV (degrees) the camera must be at or below for far shots.
    pub required_zoom: f32,
    pub spawn_bounds: SpawnBounds,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration: 90.0,
            spawn_interval: 3.0,
            max_targets: 10,
            hit_radius: 0.8,
            far_distance: 15.0,
            required_zoom: 20.0,
            spawn_bounds: SpawnBounds::default(),
        }
    }
}

impl ReconConfig {
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ReconConfig =
            serde_json::from_str(&text).map_err(|source| EngineError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate().map_err(|e| match e {
            EngineError::InvalidConfig { msg, .. } => EngineError::InvalidConfig {
                path: path.to_path_buf(),
                msg,
            },
            other => other,
        })?;
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        let cfg: ReconConfig =
            serde_json::from_str(text).map_err(|source| EngineError::Json {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(EngineError::invalid_config("window width/height must be > 0"));
        }
        let c = &self.compositor;
        if c.blur_iterations == 0 {
            return Err(EngineError::invalid_config("compositor.blur_iterations must be >= 1"));
        }
        if !(c.exposure.is_finite() && c.exposure > 0.0) {
            return Err(EngineError::invalid_config("compositor.exposure must be > 0"));
        }
        if !c.bloom_threshold.is_finite() || c.bloom_threshold < 0.0 {
            return Err(EngineError::invalid_config(
                "compositor.bloom_threshold must be >= 0",
            ));
        }
        let cam = &self.camera;
        if !(1.0..=90.0).contains(&cam.zoom) {
            return Err(EngineError::invalid_config("camera.zoom must be within 1..=90"));
        }
        let g = &self.game;
        if g.duration <= 0.0 || g.spawn_interval <= 0.0 {
            return Err(EngineError::invalid_config(
                "game.duration and game.spawn_interval must be > 0",
            ));
        }
        if g.hit_radius <= 0.0 {
            return Err(EngineError::invalid_config("game.hit_radius must be > 0"));
        }
        let b = &g.spawn_bounds;
        if (0..3).any(|i| b.max[i] <= b.min[i]) {
            return Err(EngineError::invalid_config(
                "game.spawn_bounds max must exceed min on every axis",
            ));
        }
        Ok(())
    }
}
