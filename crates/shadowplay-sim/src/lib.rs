//! The Shadowplay tick engine.
//!
//! [`TickScheduler`] runs one deterministic tick at a time: IK solving at
//! the IK cadence, pose blending and commit at the commit rate, then shadow
//! parameter evaluation. [`SafeModeController`] watches the conditions each
//! tick raises and lowers shadow fidelity when they persist. [`Engine`]
//! ties both together with running [`Diagnostics`], and [`EngineBuilder`]
//! assembles an engine from configuration and rig documents.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use shadowplay_sim::{EngineBuilder, TickInput};
//!
//! let mut engine = EngineBuilder::new()
//!     .with_rig_file("puppet.rig.json")?
//!     .build()?;
//! let output = engine.tick(&TickInput::new(Duration::from_millis(16)));
//! assert_eq!(output.frames.len(), 1);
//! # Ok::<(), shadowplay_sim::EngineError>(())
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod safe_mode;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
mod integration;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use builder::EngineBuilder;
pub use config::{EngineConfig, SafeModeConfig};
pub use engine::Engine;
pub use error::EngineError;
pub use safe_mode::{SafeModeController, SafeModeState, SignalWindow};
pub use scheduler::{
    ChainReport, PuppetInput, TickInput, TickOutput, TickPhase, TickScheduler, TickState,
};
pub use stats::Diagnostics;
