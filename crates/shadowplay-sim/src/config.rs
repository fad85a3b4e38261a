//! Engine configuration.
//!
//! [`EngineConfig`] aggregates every section of the TOML file. Each section
//! is optional and falls back to its defaults.
//!
//! ```toml
//! [tick]
//! cpu_budget_ms = 6.0
//! parallel_solve = true
//!
//! [solver]
//! tolerance = 0.001
//!
//! [safe_mode]
//! window = 120
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use shadowplay_core::config::{TickConfig, read_toml};
use shadowplay_core::error::ConfigError;
use shadowplay_ik::SolverConfig;
use shadowplay_lighting::LightingConfig;
use shadowplay_pose::BlendConfig;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_window() -> u32 {
    120
}
const fn default_divergent_ik_threshold() -> u32 {
    30
}
const fn default_budget_threshold() -> u32 {
    12
}
const fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// SafeModeConfig
// ---------------------------------------------------------------------------

/// Degradation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafeModeConfig {
    /// Switch the controller off entirely (the session stays `Normal`).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Rolling window length in ticks (default: 120). Also the minimum
    /// time between two transitions.
    #[serde(default = "default_window")]
    pub window: u32,

    /// `DivergentIK` conditions within the window that trigger
    /// degradation (default: 30).
    #[serde(default = "default_divergent_ik_threshold")]
    pub divergent_ik_threshold: u32,

    /// `FrameBudgetExceeded` conditions within the window that trigger
    /// degradation (default: 12).
    #[serde(default = "default_budget_threshold")]
    pub budget_threshold: u32,
}

impl Default for SafeModeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window: default_window(),
            divergent_ik_threshold: default_divergent_ik_threshold(),
            budget_threshold: default_budget_threshold(),
        }
    }
}

impl SafeModeConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("safe_mode.window", f64::from(self.window), 1.0, 100_000.0)?;
        for (field, threshold) in [
            ("safe_mode.divergent_ik_threshold", self.divergent_ik_threshold),
            ("safe_mode.budget_threshold", self.budget_threshold),
        ] {
            if threshold == 0 || threshold > self.window {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: format!("{threshold} must be in 1..={}", self.window),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub blend: BlendConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub safe_mode: SafeModeConfig,
}

impl EngineConfig {
    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tick.validate()?;
        self.solver.validate()?;
        self.blend.validate()?;
        self.lighting.validate()?;
        self.safe_mode.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use shadowplay_pose::Easing;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.safe_mode.window, 120);
        assert_eq!(config.safe_mode.divergent_ik_threshold, 30);
        assert_eq!(config.safe_mode.budget_threshold, 12);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn parses_every_section() {
        let config = EngineConfig::from_toml_str(
            r#"
            [tick]
            cpu_budget_ms = 4.0
            parallel_solve = true

            [solver]
            tolerance = 0.002
            fallback_to_ccd = false

            [blend]
            easing = "linear"

            [lighting]
            max_lights = 32
            interference = true

            [safe_mode]
            window = 60
            budget_threshold = 6
            "#,
        )
        .unwrap();
        assert!(config.tick.parallel_solve);
        assert!(!config.solver.fallback_to_ccd);
        assert_eq!(config.blend.easing, Easing::Linear);
        assert_eq!(config.lighting.max_lights, 32);
        assert_eq!(config.safe_mode.window, 60);
        assert_eq!(config.safe_mode.divergent_ik_threshold, 30);
    }

    #[test]
    fn invalid_section_is_reported() {
        let err = EngineConfig::from_toml_str("[lighting]\nmax_lights = 8").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "lighting.max_lights",
                ..
            }
        ));
    }

    #[test]
    fn threshold_above_window_is_rejected() {
        let config = SafeModeConfig {
            window: 10,
            budget_threshold: 11,
            ..SafeModeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "safe_mode.budget_threshold",
                ..
            })
        ));
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[physics]\ngravity = 9.8"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/engine.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
