use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::Cadence;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_commit_hz() -> f64 {
    60.0
}
const fn default_ik_hz() -> f64 {
    30.0
}
const fn default_cpu_budget_ms() -> f64 {
    6.0
}

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Tick rates and the per-tick CPU budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickConfig {
    /// Pose commit rate in Hz (default: 60).
    #[serde(default = "default_commit_hz")]
    pub commit_hz: f64,

    /// IK evaluation rate in Hz (default: 30). Must be <= `commit_hz`.
    #[serde(default = "default_ik_hz")]
    pub ik_hz: f64,

    /// CPU budget per tick in milliseconds (default: 6). The GPU budget is
    /// owned by the renderer and not tracked here.
    #[serde(default = "default_cpu_budget_ms")]
    pub cpu_budget_ms: f64,

    /// Fan chain solves out across worker threads.
    #[serde(default)]
    pub parallel_solve: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            commit_hz: default_commit_hz(),
            ik_hz: default_ik_hz(),
            cpu_budget_ms: default_cpu_budget_ms(),
            parallel_solve: false,
        }
    }
}

impl TickConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.commit_hz.is_finite() && self.commit_hz > 0.0) {
            return Err(ConfigError::InvalidRate {
                field: "commit_hz",
                value: self.commit_hz,
            });
        }
        if !(self.ik_hz.is_finite() && self.ik_hz > 0.0) {
            return Err(ConfigError::InvalidRate {
                field: "ik_hz",
                value: self.ik_hz,
            });
        }
        if self.ik_hz > self.commit_hz {
            return Err(ConfigError::InvalidValue {
                field: "ik_hz",
                message: format!("{} Hz exceeds commit_hz {} Hz", self.ik_hz, self.commit_hz),
            });
        }
        ConfigError::check_range("cpu_budget_ms", self.cpu_budget_ms, 0.1, 1000.0)
    }

    /// How often IK runs relative to commits.
    pub fn ik_cadence(&self) -> Cadence {
        Cadence::from_rates(self.commit_hz, self.ik_hz)
    }

    /// Per-tick CPU budget.
    pub fn cpu_budget(&self) -> Duration {
        Duration::from_secs_f64(self.cpu_budget_ms / 1000.0)
    }

    /// Nominal commit interval.
    pub fn commit_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.commit_hz)
    }
}

// ---------------------------------------------------------------------------
// TOML loading
// ---------------------------------------------------------------------------

/// Read and deserialize a TOML file.
pub fn read_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
