use thiserror::Error;

use crate::types::{ChainId, JointId, PuppetId};

/// Top-level error type for shadowplay-core.
#[derive(Debug, Error)]
pub enum ShadowplayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Configuration errors, raised once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid rate for {field}: {value} Hz (must be > 0)")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl ConfigError {
    /// Check that `value` lies in `[min, max]`.
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }
}

/// Per-tick input problems.
///
/// Never propagated past the tick: the scheduler logs them and ignores the
/// offending entry. Copy + static messages for cheap handling in the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Unknown puppet {0}")]
    UnknownPuppet(PuppetId),

    #[error("Unknown chain {chain} on {puppet}")]
    UnknownChain { puppet: PuppetId, chain: ChainId },

    #[error("Unknown joint {joint} on {puppet}")]
    UnknownJoint { puppet: PuppetId, joint: JointId },

    #[error("Non-finite target for {chain} on {puppet}")]
    NonFiniteTarget { puppet: PuppetId, chain: ChainId },

    #[error("Non-finite thickness on {0}")]
    NonFiniteThickness(PuppetId),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
