//! FK/IK blending and the per-chain IK history.

use std::collections::BTreeMap;

use nalgebra::UnitQuaternion;

use shadowplay_core::math::slerp;
use shadowplay_core::types::{ChainId, JointId};
use shadowplay_rig::{Chain, Pose, RigGraph};

use crate::config::BlendConfig;
use crate::easing::Easing;
use crate::hermite::hermite_slerp;

// ---------------------------------------------------------------------------
// OverrideWeights
// ---------------------------------------------------------------------------

/// Per-joint IK contribution supplied by the session layer.
///
/// Reads are clamped to `[0, 1]`. A joint with no entry (or a NaN entry)
/// reads as 0, so FK wins by default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideWeights {
    weights: BTreeMap<JointId, f32>,
}

impl OverrideWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same weight for every listed joint.
    pub fn uniform(joints: impl IntoIterator<Item = JointId>, weight: f32) -> Self {
        joints.into_iter().map(|j| (j, weight)).collect()
    }

    pub fn set(&mut self, joint: JointId, weight: f32) {
        self.weights.insert(joint, weight);
    }

    pub fn get(&self, joint: JointId) -> f32 {
        match self.weights.get(&joint) {
            Some(w) if !w.is_nan() => w.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl FromIterator<(JointId, f32)> for OverrideWeights {
    fn from_iter<I: IntoIterator<Item = (JointId, f32)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// blend
// ---------------------------------------------------------------------------

/// Blend one chain's IK rotations over an FK sample.
///
/// For every chain joint, `slerp(fk, ik, easing(weight))`. A weight of 0
/// leaves the FK rotation untouched and a weight of 1 yields the IK
/// rotation exactly. Joints outside the chain keep their FK rotation. An IK
/// slice whose length does not match the chain is ignored.
pub fn blend(
    chain: &Chain,
    fk_sample: &Pose,
    ik: &[UnitQuaternion<f32>],
    weights: &OverrideWeights,
    easing: Easing,
) -> Pose {
    let mut pose = fk_sample.clone();
    blend_into(&mut pose, chain, ik, weights, easing);
    pose
}

fn blend_into(
    pose: &mut Pose,
    chain: &Chain,
    ik: &[UnitQuaternion<f32>],
    weights: &OverrideWeights,
    easing: Easing,
) {
    if ik.len() != chain.len() {
        return;
    }
    for (&joint, ik_rotation) in chain.joints.iter().zip(ik) {
        let Some(fk_rotation) = pose.get(joint).copied() else {
            continue;
        };
        let w = easing.apply(weights.get(joint));
        pose.set(joint, slerp(&fk_rotation, ik_rotation, w));
    }
}

// ---------------------------------------------------------------------------
// PoseBlender
// ---------------------------------------------------------------------------

/// The last two IK results of one chain.
#[derive(Debug, Clone, PartialEq)]
struct IkHistory {
    previous: Option<Vec<UnitQuaternion<f32>>>,
    latest: Vec<UnitQuaternion<f32>>,
}

/// Merges FK samples with interpolated IK output.
///
/// This is the only state that survives between ticks apart from the rig
/// itself. Histories are stored densely by chain id.
#[derive(Debug, Clone, Default)]
pub struct PoseBlender {
    config: BlendConfig,
    histories: Vec<Option<IkHistory>>,
}

impl PoseBlender {
    pub fn new(config: BlendConfig) -> Self {
        Self {
            config,
            histories: Vec::new(),
        }
    }

    pub const fn config(&self) -> &BlendConfig {
        &self.config
    }

    /// Push a fresh IK result for `chain`, dropping the oldest entry.
    pub fn record_ik(&mut self, chain: ChainId, rotations: Vec<UnitQuaternion<f32>>) {
        let index = chain.index();
        if index >= self.histories.len() {
            self.histories.resize(index + 1, None);
        }
        let slot = &mut self.histories[index];
        *slot = Some(match slot.take() {
            Some(history) if history.latest.len() == rotations.len() => IkHistory {
                previous: Some(history.latest),
                latest: rotations,
            },
            Some(history) => {
                tracing::debug!(
                    %chain,
                    was = history.latest.len(),
                    now = rotations.len(),
                    "chain length changed, restarting IK history"
                );
                IkHistory {
                    previous: None,
                    latest: rotations,
                }
            }
            None => IkHistory {
                previous: None,
                latest: rotations,
            },
        });
    }

    /// Number of IK results held for `chain` (0, 1 or 2).
    pub fn history_len(&self, chain: ChainId) -> usize {
        match self.histories.get(chain.index()) {
            Some(Some(h)) if h.previous.is_some() => 2,
            Some(Some(_)) => 1,
            _ => 0,
        }
    }

    /// Forget every chain's history.
    pub fn clear(&mut self) {
        self.histories.clear();
    }

    /// IK rotations to display `phase` ticks after the latest IK update,
    /// with IK running every `stride` ticks.
    ///
    /// Display runs one IK interval behind: at phase 0 the previous result
    /// is shown, and the curve reaches the latest result just as the next
    /// update arrives. With a single result it is shown as is.
    pub fn interpolated_ik(
        &self,
        chain: ChainId,
        phase: u32,
        stride: u32,
    ) -> Option<Vec<UnitQuaternion<f32>>> {
        let history = self.histories.get(chain.index())?.as_ref()?;
        let Some(previous) = &history.previous else {
            return Some(history.latest.clone());
        };
        #[allow(clippy::cast_precision_loss)]
        let u = phase as f32 / stride.max(1) as f32;
        let tension = self.config.hermite_tension;
        Some(
            previous
                .iter()
                .zip(&history.latest)
                .map(|(a, b)| hermite_slerp(a, b, u, tension))
                .collect(),
        )
    }

    /// Build the committed pose for one puppet.
    ///
    /// Starts from the FK sample and blends every chain that has IK
    /// history. Chains without history keep FK.
    pub fn compose(
        &self,
        rig: &RigGraph,
        fk_sample: &Pose,
        weights: &OverrideWeights,
        phase: u32,
        stride: u32,
    ) -> Pose {
        let mut pose = fk_sample.clone();
        for chain in rig.chains() {
            if let Some(ik) = self.interpolated_ik(chain.id, phase, stride) {
                blend_into(&mut pose, chain, &ik, weights, self.config.easing);
            }
        }
        pose
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
