#![forbid(unsafe_code)]

//! Shared vocabulary for the recon crates: errors, configuration, and the frame clock.
//!
//! Nothing in here touches GL. Backends and the host re-export what they need.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod clock;
pub mod config;
pub mod error;

pub use clock::FrameClock;
pub use config::{
    CameraConfig, CompositorConfig, GameConfig, ReconConfig, ShaderPaths, SpawnBounds,
    WindowConfig,
};
pub use error::EngineError;
