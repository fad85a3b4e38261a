use serde::{Deserialize, Serialize};

use shadowplay_core::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_tolerance() -> f32 {
    1e-3
}
const fn default_divergence_window() -> u32 {
    3
}
const fn default_fallback_to_ccd() -> bool {
    true
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// Solver settings shared by every chain.
///
/// Per-chain tuning (damping, iteration cap, CCD clamp) lives in the rig
/// document instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// End-effector distance at which a chain counts as converged, in rig
    /// units (default: 1e-3).
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Consecutive rising-error iterations after which FABRIK aborts
    /// (default: 3).
    #[serde(default = "default_divergence_window")]
    pub divergence_window: u32,

    /// Retry failed FABRIK solves with CCD in the same tick (default: true).
    #[serde(default = "default_fallback_to_ccd")]
    pub fallback_to_ccd: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            divergence_window: default_divergence_window(),
            fallback_to_ccd: default_fallback_to_ccd(),
        }
    }
}

impl SolverConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("solver.tolerance", f64::from(self.tolerance), 1e-6, 1.0)?;
        if self.divergence_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "solver.divergence_window",
                message: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
