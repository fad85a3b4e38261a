//! Pose blending for Shadowplay.
//!
//! IK runs slower than the commit rate. [`PoseBlender`] keeps the last two
//! IK results per chain, interpolates between them with a cubic Hermite
//! curve at a one-interval display delay, and blends the result with the
//! current FK sample using per-joint override weights shaped by an
//! [`Easing`] curve. Each commit produces a [`PoseFrame`].

pub mod blender;
pub mod config;
pub mod cue;
pub mod easing;
pub mod frame;
pub mod hermite;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use blender::{OverrideWeights, PoseBlender, blend};
pub use config::BlendConfig;
pub use cue::{ChainTarget, Cue, CueTrack};
pub use easing::Easing;
pub use frame::PoseFrame;
pub use hermite::{hermite_scalar, hermite_slerp};
