use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use shadowplay_core::error::ConfigError;
use shadowplay_core::math::{DEGENERATE_LENGTH, vec3_from_array};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_lights() -> u32 {
    64
}
const fn default_float_textures() -> bool {
    true
}
const fn default_sigma() -> f32 {
    1.5
}
const fn default_bloom() -> bool {
    true
}
const fn default_bloom_intensity() -> f32 {
    0.35
}
const fn default_interference_amplitude() -> f32 {
    0.05
}
const fn default_interference_phase() -> f32 {
    std::f32::consts::FRAC_PI_3
}
const fn default_plane_normal() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

/// `max_lights` used on constrained hardware.
pub const CONSTRAINED_MAX_LIGHTS: u32 = 32;

// ---------------------------------------------------------------------------
// ShadowFilter
// ---------------------------------------------------------------------------

/// Shadow-map filtering requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowFilter {
    /// Plain PCF. Only reached as a fallback.
    Pcf,
    #[default]
    PcfSoft,
    /// Variance shadow maps; needs float render targets.
    Vsm,
}

// ---------------------------------------------------------------------------
// ShadowPlane
// ---------------------------------------------------------------------------

/// The screen the shadows fall on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShadowPlane {
    #[serde(default)]
    pub point: [f32; 3],
    #[serde(default = "default_plane_normal")]
    pub normal: [f32; 3],
}

impl Default for ShadowPlane {
    fn default() -> Self {
        Self {
            point: [0.0; 3],
            normal: default_plane_normal(),
        }
    }
}

impl ShadowPlane {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if vec3_from_array(self.point).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "lighting.shadow_plane.point",
                message: "must be finite".into(),
            });
        }
        match vec3_from_array(self.normal) {
            Some(n) if n.norm() > DEGENERATE_LENGTH => Ok(()),
            _ => Err(ConfigError::InvalidValue {
                field: "lighting.shadow_plane.normal",
                message: "must be finite and non-zero".into(),
            }),
        }
    }

    /// Unsigned distance from `p` to the plane.
    pub fn distance_to(&self, p: &Point3<f32>) -> f32 {
        let normal = Unit::new_normalize(Vector3::from(self.normal));
        (p - Point3::from(self.point)).dot(&normal).abs()
    }
}

// ---------------------------------------------------------------------------
// LightingConfig
// ---------------------------------------------------------------------------

/// Lighting and shadow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightingConfig {
    /// Requested filter (default: `pcf_soft`).
    #[serde(default)]
    pub filter: ShadowFilter,

    /// Whether the renderer supports float textures. Without them VSM
    /// falls back to PCF.
    #[serde(default = "default_float_textures")]
    pub float_textures: bool,

    /// Lights considered per tick, 32..=128 (default: 64).
    #[serde(default = "default_max_lights")]
    pub max_lights: u32,

    /// Low-tier device: `max_lights` is clamped to 32.
    #[serde(default)]
    pub constrained_hardware: bool,

    #[serde(default)]
    pub shadow_plane: ShadowPlane,

    /// Absorption coefficient for puppets that don't supply one (default: 1.5).
    #[serde(default = "default_sigma")]
    pub default_sigma: f32,

    #[serde(default = "default_bloom")]
    pub bloom: bool,

    /// Bloom intensity, `[0, 1.2]` (default: 0.35).
    #[serde(default = "default_bloom_intensity")]
    pub bloom_intensity: f32,

    /// Interference mode master toggle (default: off).
    #[serde(default)]
    pub interference: bool,

    /// Modulator amplitude, `[0, 0.5]` (default: 0.05).
    #[serde(default = "default_interference_amplitude")]
    pub interference_amplitude: f32,

    /// Phase offset of the second modulator in radians (default: pi/3).
    #[serde(default = "default_interference_phase")]
    pub interference_phase: f32,

    /// Evaluate light/puppet pairs on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            filter: ShadowFilter::default(),
            float_textures: default_float_textures(),
            max_lights: default_max_lights(),
            constrained_hardware: false,
            shadow_plane: ShadowPlane::default(),
            default_sigma: default_sigma(),
            bloom: default_bloom(),
            bloom_intensity: default_bloom_intensity(),
            interference: false,
            interference_amplitude: default_interference_amplitude(),
            interference_phase: default_interference_phase(),
            parallel: false,
        }
    }
}

impl LightingConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("lighting.max_lights", f64::from(self.max_lights), 32.0, 128.0)?;
        ConfigError::check_range(
            "lighting.default_sigma",
            f64::from(self.default_sigma),
            0.0,
            1e6,
        )?;
        ConfigError::check_range(
            "lighting.bloom_intensity",
            f64::from(self.bloom_intensity),
            0.0,
            1.2,
        )?;
        ConfigError::check_range(
            "lighting.interference_amplitude",
            f64::from(self.interference_amplitude),
            0.0,
            0.5,
        )?;
        if !self.interference_phase.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "lighting.interference_phase",
                message: "must be finite".into(),
            });
        }
        self.shadow_plane.validate()
    }

    /// `max_lights` after the constrained-hardware clamp.
    pub const fn effective_max_lights(&self) -> u32 {
        if self.constrained_hardware && self.max_lights > CONSTRAINED_MAX_LIGHTS {
            CONSTRAINED_MAX_LIGHTS
        } else {
            self.max_lights
        }
    }

    /// The filter after the float-texture fallback.
    pub const fn effective_filter(&self) -> ShadowFilter {
        match self.filter {
            ShadowFilter::Vsm if !self.float_textures => ShadowFilter::Pcf,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        let config = LightingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_max_lights(), 64);
        assert_eq!(config.effective_filter(), ShadowFilter::PcfSoft);
        assert!(!config.interference);
    }

    #[test]
    fn max_lights_bounds() {
        for (value, ok) in [(31, false), (32, true), (128, true), (129, false)] {
            let config = LightingConfig {
                max_lights: value,
                ..LightingConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "max_lights = {value}");
        }
    }

    #[test]
    fn constrained_hardware_clamps_to_32() {
        let config = LightingConfig {
            max_lights: 128,
            constrained_hardware: true,
            ..LightingConfig::default()
        };
        assert_eq!(config.effective_max_lights(), 32);
    }

    #[test]
    fn vsm_falls_back_without_float_textures() {
        let mut config = LightingConfig {
            filter: ShadowFilter::Vsm,
            ..LightingConfig::default()
        };
        assert_eq!(config.effective_filter(), ShadowFilter::Vsm);
        config.float_textures = false;
        assert_eq!(config.effective_filter(), ShadowFilter::Pcf);
    }

    #[test]
    fn rejects_zero_plane_normal() {
        let config = LightingConfig {
            shadow_plane: ShadowPlane {
                point: [0.0; 3],
                normal: [0.0; 3],
            },
            ..LightingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "lighting.shadow_plane.normal",
                ..
            })
        ));
    }

    #[test]
    fn plane_distance_uses_unit_normal() {
        let plane = ShadowPlane {
            point: [0.0, 0.0, -1.0],
            normal: [0.0, 0.0, 4.0],
        };
        assert_relative_eq!(plane.distance_to(&Point3::new(3.0, 2.0, 1.0)), 2.0);
    }

    #[test]
    fn parses_toml_section() {
        let config: LightingConfig = toml::from_str(
            r#"
            filter = "vsm"
            max_lights = 96
            interference = true
            [shadow_plane]
            point = [0.0, 0.0, -2.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.filter, ShadowFilter::Vsm);
        assert_eq!(config.max_lights, 96);
        assert_eq!(config.shadow_plane.normal, [0.0, 0.0, 1.0]);
        assert!(config.validate().is_ok());
    }
}
