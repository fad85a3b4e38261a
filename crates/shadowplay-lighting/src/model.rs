//! The per-tick lighting update and the uniforms it publishes.

use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use shadowplay_core::time::SimTime;
use shadowplay_core::types::{LightId, PuppetId};

use crate::config::{LightingConfig, ShadowFilter};
use crate::optics::{
    MAX_KERNEL, cap_kernel, hardening, interference_factor, kernel_size, penumbra_radius,
    transmission,
};

/// Kernel cap applied when a tick runs out of budget.
pub const TRUNCATED_KERNEL_CAP: u32 = 7;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A lantern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub id: LightId,
    pub position: Point3<f32>,
    /// Lantern radius `r_l`.
    pub radius: f32,
    pub intensity: f32,
    /// Take part in interference mode when it is enabled globally.
    pub interference: bool,
}

impl LightSource {
    pub const fn new(id: LightId, position: Point3<f32>, radius: f32) -> Self {
        Self {
            id,
            position,
            radius,
            intensity: 1.0,
            interference: false,
        }
    }

    #[must_use]
    pub const fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    #[must_use]
    pub const fn with_interference(mut self, enabled: bool) -> Self {
        self.interference = enabled;
        self
    }

    fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.radius.is_finite()
            && self.intensity.is_finite()
    }
}

/// What the lighting stage needs to know about one puppet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PuppetShadowInput {
    pub puppet: PuppetId,
    /// Centroid of the puppet's joint world positions.
    pub anchor: Point3<f32>,
    /// Occluder thickness from the translucency channel.
    pub thickness: f32,
    /// Absorption coefficient; the configured default when `None`.
    pub sigma: Option<f32>,
}

// ---------------------------------------------------------------------------
// Tier / refinement
// ---------------------------------------------------------------------------

/// Shadow quality tier published to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowTier {
    #[default]
    Full,
    Reduced,
    Silhouette,
}

impl ShadowTier {
    /// Largest contact-hardening kernel allowed at this tier.
    pub const fn kernel_cap(self) -> u32 {
        match self {
            Self::Full => MAX_KERNEL,
            Self::Reduced => 5,
            Self::Silhouette => 1,
        }
    }
}

/// Optional refinements enabled for one tick.
///
/// Penumbra and transmission are not listed here: they are always
/// computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingRefinement {
    pub tier: ShadowTier,
    pub interference: bool,
    pub bloom: bool,
    pub kernel_cap: u32,
}

impl Default for LightingRefinement {
    fn default() -> Self {
        Self {
            tier: ShadowTier::Full,
            interference: false,
            bloom: false,
            kernel_cap: MAX_KERNEL,
        }
    }
}

impl LightingRefinement {
    /// Refinements for `tier` under `config`. Anything below the full tier
    /// turns interference and bloom off.
    pub const fn for_tier(tier: ShadowTier, config: &LightingConfig) -> Self {
        let full = matches!(tier, ShadowTier::Full);
        Self {
            tier,
            interference: full && config.interference,
            bloom: full && config.bloom,
            kernel_cap: tier.kernel_cap(),
        }
    }

    /// Drop interference and the largest kernel for a tick that overran
    /// its budget.
    #[must_use]
    pub const fn truncated(self) -> Self {
        Self {
            interference: false,
            kernel_cap: if self.kernel_cap < TRUNCATED_KERNEL_CAP {
                self.kernel_cap
            } else {
                TRUNCATED_KERNEL_CAP
            },
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Shadow parameters for one (light, puppet) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowParams {
    pub light: LightId,
    pub puppet: PuppetId,
    pub penumbra_radius: f32,
    pub transmission: f32,
    /// Odd edge length of the contact-hardening kernel.
    pub kernel_size: u32,
    pub intensity: f32,
}

/// Shader-facing values for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowUniforms {
    pub filter: ShadowFilter,
    pub tier: ShadowTier,
    /// Bloom intensity; 0 when bloom is off.
    pub bloom: f32,
    pub interference: bool,
    pub params: Vec<ShadowParams>,
}

// ---------------------------------------------------------------------------
// LightingModel
// ---------------------------------------------------------------------------

/// Stateless evaluator of [`ShadowParams`].
#[derive(Debug, Clone, Default)]
pub struct LightingModel {
    config: LightingConfig,
}

impl LightingModel {
    pub const fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Shadow parameters for every pair, light-major.
    ///
    /// Only the first `max_lights` lights are used. Lights with non-finite
    /// fields are skipped.
    pub fn update(
        &self,
        lights: &[LightSource],
        puppets: &[PuppetShadowInput],
        time: SimTime,
        refinement: &LightingRefinement,
    ) -> Vec<ShadowParams> {
        let max_lights = self.config.effective_max_lights() as usize;
        if lights.len() > max_lights {
            tracing::debug!(
                lights = lights.len(),
                max_lights,
                "ignoring lights beyond max_lights"
            );
        }
        let considered: Vec<&LightSource> = lights
            .iter()
            .take(max_lights)
            .filter(|light| {
                let ok = light.is_finite();
                if !ok {
                    tracing::warn!(light = %light.id, "skipping light with non-finite fields");
                }
                ok
            })
            .collect();

        let pairs: Vec<(&LightSource, &PuppetShadowInput)> = considered
            .iter()
            .flat_map(|light| puppets.iter().map(move |puppet| (*light, puppet)))
            .collect();

        let secs = time.secs_f64();
        let eval = |(light, puppet): &(&LightSource, &PuppetShadowInput)| {
            self.evaluate(light, puppet, secs, refinement)
        };
        if self.config.parallel {
            pairs.par_iter().map(eval).collect()
        } else {
            pairs.iter().map(eval).collect()
        }
    }

    /// Package `params` with the tick's filter, tier and toggles.
    pub fn publish(
        &self,
        refinement: &LightingRefinement,
        params: Vec<ShadowParams>,
    ) -> ShadowUniforms {
        ShadowUniforms {
            filter: self.config.effective_filter(),
            tier: refinement.tier,
            bloom: if refinement.bloom {
                self.config.bloom_intensity
            } else {
                0.0
            },
            interference: refinement.interference,
            params,
        }
    }

    fn evaluate(
        &self,
        light: &LightSource,
        puppet: &PuppetShadowInput,
        secs: f64,
        refinement: &LightingRefinement,
    ) -> ShadowParams {
        let d_o = (puppet.anchor - light.position).norm();
        let d_s = self.config.shadow_plane.distance_to(&light.position);
        let sigma = puppet.sigma.unwrap_or(self.config.default_sigma);

        let h = hardening(puppet.thickness, light.radius);
        let kernel = cap_kernel(kernel_size(h), refinement.kernel_cap);

        let modulation = if refinement.interference && light.interference {
            interference_factor(
                secs,
                self.config.interference_amplitude,
                self.config.interference_phase,
            )
        } else {
            1.0
        };

        ShadowParams {
            light: light.id,
            puppet: puppet.puppet,
            penumbra_radius: penumbra_radius(d_o, d_s, light.radius),
            transmission: transmission(sigma, puppet.thickness),
            kernel_size: kernel,
            intensity: light.intensity * modulation,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
