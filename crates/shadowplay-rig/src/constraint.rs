//! Angular limit cones on joint rotations.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// Limit on how far a joint may rotate away from its rest orientation.
///
/// Within `soft_deg` the rotation is untouched. Between the soft and hard
/// limits the excess is compressed with `tanh`, so resistance grows smoothly
/// and the hard limit is approached but never crossed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConeLimit {
    pub soft_deg: f32,
    pub hard_deg: f32,
}

impl ConeLimit {
    /// Whether `0 <= soft <= hard <= 180`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.soft_deg.is_finite()
            && self.hard_deg.is_finite()
            && self.soft_deg >= 0.0
            && self.soft_deg <= self.hard_deg
            && self.hard_deg <= 180.0
    }

    /// Constrain `local` relative to `rest`.
    #[must_use]
    pub fn apply(
        &self,
        rest: &UnitQuaternion<f32>,
        local: &UnitQuaternion<f32>,
    ) -> UnitQuaternion<f32> {
        let soft = self.soft_deg.to_radians();
        let hard = self.hard_deg.to_radians();
        let deviation = rest.inverse() * local;
        let angle = deviation.angle();
        if angle <= soft {
            return *local;
        }

        let span = hard - soft;
        let limited = if span <= f32::EPSILON {
            hard
        } else {
            soft + span * ((angle - soft) / span).tanh()
        };

        match deviation.axis() {
            Some(axis) => rest * UnitQuaternion::from_axis_angle(&axis, limited),
            None => *local,
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
    use nalgebra::Vector3;

    fn yaw_deg(deg: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), deg.to_radians())
    }

    const LIMIT: ConeLimit = ConeLimit {
        soft_deg: 30.0,
        hard_deg: 60.0,
    };

    #[test]
    fn inside_soft_limit_is_untouched() {
        let q = yaw_deg(20.0);
        assert_eq!(LIMIT.apply(&UnitQuaternion::identity(), &q), q);
    }

    #[test]
    fn never_exceeds_hard_limit() {
        for deg in [35.0, 60.0, 90.0, 179.0] {
            let out = LIMIT.apply(&UnitQuaternion::identity(), &yaw_deg(deg));
            let angle = out.angle().to_degrees();
            assert!(angle < 60.0 + 1e-3, "{deg} -> {angle}");
            assert!(out.angle().to_degrees() >= 30.0 - 1e-3);
        }
    }

    #[test]
    fn soft_zone_is_monotonic() {
        let a = LIMIT.apply(&UnitQuaternion::identity(), &yaw_deg(40.0)).angle();
        let b = LIMIT.apply(&UnitQuaternion::identity(), &yaw_deg(50.0)).angle();
        assert!(a < b);
    }

    #[test]
    fn limit_is_relative_to_rest() {
        let rest = yaw_deg(90.0);
        let out = LIMIT.apply(&rest, &yaw_deg(180.0));
        let deviation = (rest.inverse() * out).angle().to_degrees();
        assert!(deviation < 60.0 + 1e-3);
        assert_relative_eq!(out.axis().unwrap().z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_cone_locks_joint() {
        let locked = ConeLimit {
            soft_deg: 0.0,
            hard_deg: 0.0,
        };
        let out = locked.apply(&UnitQuaternion::identity(), &yaw_deg(45.0));
        assert_relative_eq!(out.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn validity() {
        assert!(LIMIT.is_valid());
        assert!(!ConeLimit { soft_deg: 50.0, hard_deg: 40.0 }.is_valid());
        assert!(!ConeLimit { soft_deg: 0.0, hard_deg: 181.0 }.is_valid());
        assert!(!ConeLimit { soft_deg: -1.0, hard_deg: 10.0 }.is_valid());
        assert!(!ConeLimit { soft_deg: f32::NAN, hard_deg: 10.0 }.is_valid());
    }
}
