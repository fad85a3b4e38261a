//! Solver-side snapshot of one rig chain.
//!
//! A [`ChainPose`] copies what the solvers need out of a [`RigGraph`]: the
//! world frame the chain hangs from, each joint's local offset, rest
//! rotation and cone limit, and the working local rotations. Solvers mutate
//! only the snapshot; the rig itself changes only when a blended pose is
//! committed.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use shadowplay_core::math::{DEGENERATE_LENGTH, rotation_between};
use shadowplay_core::types::ChainId;
use shadowplay_rig::{Chain, ConeLimit, RigGraph};

/// Working state of one chain during a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainPose {
    chain: ChainId,
    /// World frame of the chain root's parent.
    base: Isometry3<f32>,
    offsets: Vec<Vector3<f32>>,
    rest: Vec<UnitQuaternion<f32>>,
    limits: Vec<Option<ConeLimit>>,
    rotations: Vec<UnitQuaternion<f32>>,
    /// Bend-plane hint for two-bone chains, rig space.
    pole: Option<Vector3<f32>>,
}

impl ChainPose {
    /// Snapshot `chain` from `rig`, starting from `prior` local rotations
    /// (chain order). Falls back to the rig's current rotations when `prior`
    /// has the wrong length.
    pub fn capture(rig: &RigGraph, chain: &Chain, prior: &[UnitQuaternion<f32>]) -> Self {
        let base = rig
            .parent_world_transform(chain.root())
            .unwrap_or_else(Isometry3::identity);
        let mut offsets = Vec::with_capacity(chain.len());
        let mut rest = Vec::with_capacity(chain.len());
        let mut limits = Vec::with_capacity(chain.len());
        let mut current = Vec::with_capacity(chain.len());
        for &id in &chain.joints {
            if let Some(joint) = rig.joint(id) {
                offsets.push(joint.translation);
                rest.push(joint.rest_rotation);
                limits.push(joint.constraint);
                current.push(
                    rig.current_pose()
                        .get(id)
                        .copied()
                        .unwrap_or(joint.rest_rotation),
                );
            }
        }
        let rotations = if prior.len() == current.len() {
            prior.to_vec()
        } else {
            current
        };
        Self {
            chain: chain.id,
            base,
            offsets,
            rest,
            limits,
            rotations,
            pole: chain.pole,
        }
    }

    /// Build a snapshot directly from parts. All vectors must share a length.
    pub fn from_parts(
        chain: ChainId,
        base: Isometry3<f32>,
        offsets: Vec<Vector3<f32>>,
        limits: Vec<Option<ConeLimit>>,
        rotations: Vec<UnitQuaternion<f32>>,
    ) -> Self {
        debug_assert!(offsets.len() == limits.len() && offsets.len() == rotations.len());
        Self {
            chain,
            base,
            rest: rotations.clone(),
            offsets,
            limits,
            rotations,
            pole: None,
        }
    }

    #[must_use]
    pub const fn with_pole(mut self, pole: Option<Vector3<f32>>) -> Self {
        self.pole = pole;
        self
    }

    pub const fn pole(&self) -> Option<Vector3<f32>> {
        self.pole
    }

    pub const fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    pub fn rotations(&self) -> &[UnitQuaternion<f32>] {
        &self.rotations
    }

    pub fn into_rotations(self) -> Vec<UnitQuaternion<f32>> {
        self.rotations
    }

    pub fn set_rotations(&mut self, rotations: &[UnitQuaternion<f32>]) {
        self.rotations.copy_from_slice(rotations);
    }

    /// Length of each bone, `len() - 1` entries.
    pub fn bone_lengths(&self) -> Vec<f32> {
        self.offsets.iter().skip(1).map(|o| o.norm()).collect()
    }

    /// World frame of every chain joint under the working rotations.
    pub fn world_frames(&self) -> Vec<Isometry3<f32>> {
        let mut frames = Vec::with_capacity(self.len());
        let mut current = self.base;
        for (offset, rotation) in self.offsets.iter().zip(&self.rotations) {
            current *= Isometry3::from_parts(Translation3::from(*offset), *rotation);
            frames.push(current);
        }
        frames
    }

    /// World position of every chain joint.
    pub fn positions(&self) -> Vec<Point3<f32>> {
        self.world_frames()
            .iter()
            .map(|f| Point3::from(f.translation.vector))
            .collect()
    }

    /// World position of the last joint.
    pub fn end_effector(&self) -> Point3<f32> {
        self.positions()
            .last()
            .copied()
            .unwrap_or_else(|| Point3::from(self.base.translation.vector))
    }

    pub fn distance_to(&self, target: &Point3<f32>) -> f32 {
        (self.end_effector() - target).norm()
    }

    /// World rotation of joint `i`'s parent frame.
    pub fn parent_rotation(&self, frames: &[Isometry3<f32>], i: usize) -> UnitQuaternion<f32> {
        if i == 0 {
            self.base.rotation
        } else {
            frames[i - 1].rotation
        }
    }

    /// Pre-multiply joint `i`'s local rotation by a world-space rotation
    /// `delta`, then apply its cone limit.
    pub fn rotate_joint_world(
        &mut self,
        frames: &[Isometry3<f32>],
        i: usize,
        delta: &UnitQuaternion<f32>,
    ) {
        let parent = self.parent_rotation(frames, i);
        let local_delta = parent.inverse() * delta * parent;
        self.rotations[i] = local_delta * self.rotations[i];
        self.constrain(i);
    }

    /// Re-derive local rotations so each bone points at the matching
    /// position in `positions`, root to tip. Cone limits are applied as each
    /// joint is set, so later joints see the limited parents.
    pub fn aim_at_positions(&mut self, positions: &[Point3<f32>]) {
        let n = self.len().min(positions.len());
        let mut parent = self.base;
        for i in 0..n.saturating_sub(1) {
            let local =
                Isometry3::from_parts(Translation3::from(self.offsets[i]), self.rotations[i]);
            let frame = parent * local;
            let joint_pos = Point3::from(frame.translation.vector);
            let current_dir = frame.rotation * self.offsets[i + 1];
            let desired_dir = positions[i + 1] - joint_pos;
            if desired_dir.norm() > DEGENERATE_LENGTH {
                let delta = rotation_between(&current_dir, &desired_dir);
                let local_delta = parent.rotation.inverse() * delta * parent.rotation;
                self.rotations[i] = local_delta * self.rotations[i];
                self.constrain(i);
            }
            parent *= Isometry3::from_parts(Translation3::from(self.offsets[i]), self.rotations[i]);
        }
    }

    /// Apply every joint's cone limit.
    pub fn constrain_all(&mut self) {
        for i in 0..self.len() {
            self.constrain(i);
        }
    }

    fn constrain(&mut self, i: usize) {
        if let Some(limit) = self.limits[i] {
            self.rotations[i] = limit.apply(&self.rest[i], &self.rotations[i]);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
