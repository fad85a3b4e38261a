use shadowplay_core::time::SimTime;
use shadowplay_core::types::PuppetId;
use shadowplay_rig::Pose;

/// A committed pose for one puppet at one tick.
///
/// Created by the blending stage, read by the renderer, superseded by the
/// next tick's frame. There are no mutating accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    puppet: PuppetId,
    tick: u64,
    time: SimTime,
    pose: Pose,
}

impl PoseFrame {
    pub const fn new(puppet: PuppetId, tick: u64, time: SimTime, pose: Pose) -> Self {
        Self {
            puppet,
            tick,
            time,
            pose,
        }
    }

    pub const fn puppet(&self) -> PuppetId {
        self.puppet
    }

    pub const fn tick(&self) -> u64 {
        self.tick
    }

    pub const fn time(&self) -> SimTime {
        self.time
    }

    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Canonical byte encoding: puppet, tick, time nanos, then the pose.
    ///
    /// Equal bytes mean bit-identical frames, which is what replay
    /// comparisons check.
    pub fn to_bytes(&self) -> Vec<u8> {
        let pose = self.pose.to_bytes();
        let mut bytes = Vec::with_capacity(20 + pose.len());
        bytes.extend_from_slice(&self.puppet.0.to_le_bytes());
        bytes.extend_from_slice(&self.tick.to_le_bytes());
        bytes.extend_from_slice(&self.time.nanos().to_le_bytes());
        bytes.extend_from_slice(&pose);
        bytes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn accessors() {
        let frame = PoseFrame::new(PuppetId(1), 7, SimTime::from_nanos(99), Pose::identity(2));
        assert_eq!(frame.puppet(), PuppetId(1));
        assert_eq!(frame.tick(), 7);
        assert_eq!(frame.time().nanos(), 99);
        assert_eq!(frame.pose().len(), 2);
    }

    #[test]
    fn bytes_cover_header_and_pose() {
        let frame = PoseFrame::new(PuppetId(0), 1, SimTime::ZERO, Pose::identity(3));
        assert_eq!(frame.to_bytes().len(), 20 + 3 * 16);
    }

    #[test]
    fn bytes_differ_when_rotation_differs() {
        let a = PoseFrame::new(PuppetId(0), 1, SimTime::ZERO, Pose::identity(2));
        let mut pose = Pose::identity(2);
        pose.set(
            shadowplay_core::types::JointId(1),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1e-4),
        );
        let b = PoseFrame::new(PuppetId(0), 1, SimTime::ZERO, pose);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
