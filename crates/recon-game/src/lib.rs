#![forbid(unsafe_code)]

//! Game-side state for recon: the fly camera and the target-scan session.
//!
//! No GL in here. The host feeds input and frame deltas in and reads matrices,
//! targets and scores out.
#![deny(missing_debug_implementations)]

pub mod camera;
pub mod session;

pub use camera::{Camera, Movement};
pub use session::{GameError, GameSession, SessionEvent, ShotOutcome, Target};
