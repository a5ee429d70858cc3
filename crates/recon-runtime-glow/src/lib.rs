//! recon runtime (glow/OpenGL backend)
//
// This crate contains the post-processing half of the renderer:
// - offscreen render targets (color texture + depth/stencil renderbuffer, optional MSAA)
// - the four effect programs (screen, glitch, blur, bright-pass extract)
// - the compositor that turns one multisampled scene frame into the final image
//
// It does NOT contain windowing, input, scene geometry or game rules.
//
// Threading: every type here holds raw GL handles and must stay on the thread that owns the
// current GL context. GL objects are released explicitly through `destroy(gl)`; dropping an
// allocated object only logs a warning.
#![deny(missing_debug_implementations)]

pub mod backend;
pub mod compositor;
pub mod pingpong;
pub mod programs;
pub mod quad;
#[cfg(any(test, feature = "recording"))]
pub mod recording;
pub mod target;

pub use backend::{RenderBackend, Samples, VertexAttrib};
pub use compositor::{Compositor, FrameStats, TargetPool};
pub use pingpong::{final_blur_slot, BlurCursor, PingPong, Slot};
pub use programs::{uniforms, EffectKind, EffectPrograms, ProgramSources, ShaderSource};
pub use quad::FullscreenQuad;
pub use recon_core::EngineError;
pub use target::{RenderTarget, MSAA_SAMPLES};

/// GL constants callers need alongside the backend (clear masks, status codes).
pub use glow;
