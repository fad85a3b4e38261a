//! Engine builder.
//!
//! [`EngineBuilder`] provides a fluent API for composing a session:
//! configuration, rigs, an optional custom clock and solver set.
//!
//! # Example
//!
//! ```no_run
//! use shadowplay_sim::EngineBuilder;
//!
//! let mut engine = EngineBuilder::new()
//!     .with_config_file("shadowplay.toml")?
//!     .with_rig_file("puppet.rig.json")?
//!     .build()?;
//! # Ok::<(), shadowplay_sim::EngineError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use shadowplay_core::time::{MonotonicClock, SystemClock};
use shadowplay_ik::IkSolverSet;
use shadowplay_lighting::LightingModel;
use shadowplay_rig::{RigGraph, parse_file, parse_str};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::safe_mode::SafeModeController;
use crate::scheduler::TickScheduler;

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for an [`Engine`].
///
/// Rigs are registered in the order they were added, so the first rig is
/// `PuppetId(0)`.
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Option<Arc<dyn MonotonicClock>>,
    solvers: Option<IkSolverSet>,
    rigs: Vec<RigGraph>,
}

impl EngineBuilder {
    /// Create a builder with default configuration and no rigs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the file cannot be read, parsed
    /// or validated.
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let config = EngineConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Use a custom clock for CPU budget measurement.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom solver set instead of one built from `[solver]`.
    #[must_use]
    pub fn with_solvers(mut self, solvers: IkSolverSet) -> Self {
        self.solvers = Some(solvers);
        self
    }

    #[must_use]
    pub fn with_rig(mut self, rig: RigGraph) -> Self {
        self.rigs.push(rig);
        self
    }

    /// Add a rig from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rig`] if the document is invalid.
    pub fn with_rig_str(self, json: &str) -> Result<Self, EngineError> {
        let rig = parse_str(json)?;
        Ok(self.with_rig(rig))
    }

    /// Add a rig from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rig`] if the file cannot be read or the
    /// document is invalid.
    pub fn with_rig_file(self, path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let rig = parse_file(path)?;
        Ok(self.with_rig(rig))
    }

    /// Validate the configuration and assemble the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if any section is invalid.
    pub fn build(self) -> Result<Engine, EngineError> {
        let config = self.config;
        config.validate()?;

        let solvers = self
            .solvers
            .unwrap_or_else(|| IkSolverSet::new(config.solver.clone()));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let mut scheduler = TickScheduler::new(
            config.tick.clone(),
            solvers,
            LightingModel::new(config.lighting.clone()),
            config.blend.clone(),
            clock,
        );
        for rig in self.rigs {
            scheduler.add_puppet(rig);
        }
        tracing::info!(
            puppets = scheduler.puppet_count(),
            commit_hz = config.tick.commit_hz,
            ik_hz = config.tick.ik_hz,
            parallel = config.tick.parallel_solve,
            "engine built"
        );
        Ok(Engine::new(SafeModeController::new(scheduler, config.safe_mode)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
