//! Analytic soft-shadow parameters for Shadowplay.
//!
//! [`LightingModel::update`] is a pure function of the current light and
//! puppet positions: for every (light, puppet) pair it computes penumbra
//! radius, Beer-Lambert transmission, a contact-hardening kernel size and
//! a (possibly interference-modulated) intensity. Nothing carries over
//! between ticks.

pub mod config;
pub mod model;
pub mod optics;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use config::{LightingConfig, ShadowFilter, ShadowPlane};
pub use model::{
    LightSource, LightingModel, LightingRefinement, PuppetShadowInput, ShadowParams, ShadowTier,
    ShadowUniforms,
};
