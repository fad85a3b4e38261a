//! Inverse kinematics for Shadowplay rig chains.
//!
//! Three solvers share the [`ChainSolver`] interface:
//!
//! - [`FabrikSolver`]: damped forward/backward reaching, with a
//!   [`DivergenceGuard`] that aborts on a rising error.
//! - [`CcdSolver`]: cyclic coordinate descent with a per-joint step clamp.
//!   Also the fallback when FABRIK fails.
//! - [`TwoBoneSolver`]: closed-form law-of-cosines solve for three-joint
//!   chains.
//!
//! [`IkSolverSet`] dispatches by chain kind and applies the fallback and
//! identity-hold policy.

pub mod ccd;
pub mod chain;
pub mod config;
pub mod fabrik;
pub mod solver;
pub mod two_bone;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use ccd::CcdSolver;
pub use chain::ChainPose;
pub use config::SolverConfig;
pub use fabrik::{DivergenceGuard, FabrikSolver};
pub use solver::{ChainSolver, IkOutcome, IkSolverSet, SolveReport, SolveStatus};
pub use two_bone::TwoBoneSolver;
