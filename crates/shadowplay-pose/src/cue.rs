//! Cue timelines: authored target motion for IK chains.
//!
//! A cue moves one chain's target from `from` to `to` over `duration`
//! seconds starting at `start`, shaped by an easing curve. After it ends
//! the target rests at `to` until a later cue on the same chain takes over.

use std::collections::BTreeMap;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use shadowplay_core::error::ConfigError;
use shadowplay_core::time::SimTime;
use shadowplay_core::types::ChainId;

use crate::easing::Easing;

/// Target position for one chain at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainTarget {
    pub chain: ChainId,
    pub position: Point3<f32>,
}

impl ChainTarget {
    pub const fn new(chain: ChainId, position: Point3<f32>) -> Self {
        Self { chain, position }
    }
}

// ---------------------------------------------------------------------------
// Cue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cue {
    pub chain: ChainId,
    pub from: [f32; 3],
    pub to: [f32; 3],
    /// Start time in seconds.
    pub start: f64,
    /// Length in seconds. Zero jumps straight to `to`.
    pub duration: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl Cue {
    /// Target position at `time`, or `None` before the cue starts.
    #[allow(clippy::cast_possible_truncation)]
    pub fn position_at(&self, time: SimTime) -> Option<Point3<f32>> {
        let t = time.secs_f64();
        if t < self.start {
            return None;
        }
        let progress = if self.duration > 0.0 {
            ((t - self.start) / self.duration).min(1.0) as f32
        } else {
            1.0
        };
        let s = self.easing.apply(progress);
        let from = Point3::from(self.from);
        let to = Point3::from(self.to);
        Some(from + (to - from) * s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.from.iter().chain(&self.to).all(|c| c.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "cue.position",
                message: format!("non-finite endpoint on {}", self.chain),
            });
        }
        ConfigError::check_range("cue.start", self.start, 0.0, f64::MAX)?;
        ConfigError::check_range("cue.duration", self.duration, 0.0, f64::MAX)?;
        if !self.easing.is_valid() {
            return Err(ConfigError::InvalidValue {
                field: "cue.easing",
                message: format!("invalid curve on {}", self.chain),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CueTrack
// ---------------------------------------------------------------------------

/// An ordered list of cues for one puppet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CueTrack {
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl CueTrack {
    pub const fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn push(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cues.iter().try_for_each(Cue::validate)
    }

    /// Targets for every chain with a started cue, in chain order.
    ///
    /// Per chain, the cue with the latest start wins; ties go to the cue
    /// listed last.
    pub fn targets_at(&self, time: SimTime) -> Vec<ChainTarget> {
        let mut winners: BTreeMap<ChainId, &Cue> = BTreeMap::new();
        for cue in &self.cues {
            if cue.start > time.secs_f64() {
                continue;
            }
            let replace = winners
                .get(&cue.chain)
                .is_none_or(|current| cue.start >= current.start);
            if replace {
                winners.insert(cue.chain, cue);
            }
        }
        winners
            .into_values()
            .filter_map(|cue| {
                cue.position_at(time)
                    .map(|position| ChainTarget::new(cue.chain, position))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
