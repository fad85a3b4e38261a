use serde::{Deserialize, Serialize};

use shadowplay_core::error::ConfigError;

use crate::easing::Easing;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_hermite_tension() -> f32 {
    0.5
}

// ---------------------------------------------------------------------------
// BlendConfig
// ---------------------------------------------------------------------------

/// FK/IK blending settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlendConfig {
    /// Curve applied to override weights (default: `ease_in_out_cubic`).
    #[serde(default)]
    pub easing: Easing,

    /// Cardinal tension for IK history interpolation, `[0, 1]`
    /// (default: 0.5). 0 is linear, 1 is smoothstep.
    #[serde(default = "default_hermite_tension")]
    pub hermite_tension: f32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            easing: Easing::default(),
            hermite_tension: default_hermite_tension(),
        }
    }
}

impl BlendConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range(
            "blend.hermite_tension",
            f64::from(self.hermite_tension),
            0.0,
            1.0,
        )?;
        if !self.easing.is_valid() {
            return Err(ConfigError::InvalidValue {
                field: "blend.easing",
                message: format!("{:?} has control x outside [0, 1]", self.easing),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
