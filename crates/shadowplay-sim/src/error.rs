//! Engine construction errors.

use shadowplay_core::error::ConfigError;
use shadowplay_rig::{InvalidRigSchema, RigError};

/// Errors raised while building an [`Engine`](crate::Engine).
///
/// Ticking never fails; everything that can go wrong at runtime is a
/// [`TickCondition`](shadowplay_core::condition::TickCondition).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvalidRigSchema> for EngineError {
    fn from(err: InvalidRigSchema) -> Self {
        Self::Rig(RigError::Schema(err))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_wraps_as_rig() {
        let err: EngineError = InvalidRigSchema::NoRoot.into();
        assert!(matches!(err, EngineError::Rig(RigError::Schema(InvalidRigSchema::NoRoot))));
        assert_eq!(err.to_string(), "Rig error: no root joint found");
    }

    #[test]
    fn config_error_display() {
        let err: EngineError = ConfigError::InvalidRate {
            field: "ik_hz",
            value: 0.0,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid rate for ik_hz: 0 Hz (must be > 0)"
        );
    }

    #[test]
    fn engine_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
