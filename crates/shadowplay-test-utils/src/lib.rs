//! Shared test fixtures and utilities for Shadowplay crates.
//!
//! Provides rig documents, controllable clocks for budget tests, a
//! scripted IK solver, and deterministic RNG setup.

pub mod fixtures;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{arm_rig, cyclic_document, puppet_rig};
pub use mocks::{ManualClock, ScriptedSolver, SteppingClock};
pub use rng::{random_targets, seeded_rng};
