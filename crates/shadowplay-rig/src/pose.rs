//! Resolved joint rotations for one rig.

use nalgebra::UnitQuaternion;
use shadowplay_core::types::JointId;

/// Mapping from joint to resolved local rotation, dense over a rig's joints.
///
/// Built by the blending stage each tick. Once wrapped in a committed frame
/// it is never mutated; the next tick produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    rotations: Vec<UnitQuaternion<f32>>,
}

impl Pose {
    pub const fn new(rotations: Vec<UnitQuaternion<f32>>) -> Self {
        Self { rotations }
    }

    /// A pose of `len` identity rotations.
    pub fn identity(len: usize) -> Self {
        Self {
            rotations: vec![UnitQuaternion::identity(); len],
        }
    }

    pub const fn len(&self) -> usize {
        self.rotations.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    pub fn get(&self, joint: JointId) -> Option<&UnitQuaternion<f32>> {
        self.rotations.get(joint.index())
    }

    /// Overwrite one joint's rotation. Out-of-range ids are ignored.
    pub fn set(&mut self, joint: JointId, rotation: UnitQuaternion<f32>) {
        if let Some(slot) = self.rotations.get_mut(joint.index()) {
            *slot = rotation;
        }
    }

    pub fn as_slice(&self) -> &[UnitQuaternion<f32>] {
        &self.rotations
    }

    /// Iterate `(joint, rotation)` in joint order.
    pub fn iter(&self) -> impl Iterator<Item = (JointId, &UnitQuaternion<f32>)> {
        self.rotations
            .iter()
            .enumerate()
            .map(|(i, q)| (JointId::from_index(i), q))
    }

    /// Little-endian `[x, y, z, w]` bytes of every rotation, in joint order.
    ///
    /// Two poses with equal bytes are bit-identical.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.rotations.len() * 16);
        for q in &self.rotations {
            for c in q.coords.iter() {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn identity_pose() {
        let pose = Pose::identity(3);
        assert_eq!(pose.len(), 3);
        assert!(pose.iter().all(|(_, q)| *q == UnitQuaternion::identity()));
    }

    #[test]
    fn set_and_get() {
        let mut pose = Pose::identity(2);
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5);
        pose.set(JointId(1), q);
        assert_eq!(pose.get(JointId(1)), Some(&q));
        pose.set(JointId(9), q);
        assert!(pose.get(JointId(9)).is_none());
    }

    #[test]
    fn bytes_distinguish_poses() {
        let a = Pose::identity(2);
        let mut b = Pose::identity(2);
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.to_bytes().len(), 32);
        b.set(JointId(0), UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1e-3));
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
