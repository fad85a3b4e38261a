//! Cubic Hermite interpolation between consecutive IK results.
//!
//! With only two samples, both cardinal tangents are `(1 - tension)` times
//! the chord. The curve therefore runs from 0 to 1 and its shape is set by
//! tension alone: 0 gives a straight line, 1 gives smoothstep.

use nalgebra::UnitQuaternion;

use shadowplay_core::math::slerp;

/// Hermite progress along the chord at parameter `u` in `[0, 1]`.
pub fn hermite_scalar(u: f32, tension: f32) -> f32 {
    if u <= 0.0 {
        return 0.0;
    }
    if u >= 1.0 {
        return 1.0;
    }
    let m = 1.0 - tension.clamp(0.0, 1.0);
    let u2 = u * u;
    let u3 = u2 * u;
    let h10 = u3 - 2.0 * u2 + u;
    let h01 = -2.0 * u3 + 3.0 * u2;
    let h11 = u3 - u2;
    h10 * m + h01 + h11 * m
}

/// Interpolate from `from` to `to` along the Hermite profile.
pub fn hermite_slerp(
    from: &UnitQuaternion<f32>,
    to: &UnitQuaternion<f32>,
    u: f32,
    tension: f32,
) -> UnitQuaternion<f32> {
    slerp(from, to, hermite_scalar(u, tension))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn endpoints_are_exact() {
        for tension in [0.0, 0.5, 1.0] {
            assert_eq!(hermite_scalar(0.0, tension), 0.0);
            assert_eq!(hermite_scalar(1.0, tension), 1.0);
        }
    }

    #[test]
    fn zero_tension_is_linear() {
        for u in [0.1, 0.25, 0.5, 0.8] {
            assert_relative_eq!(hermite_scalar(u, 0.0), u, epsilon = 1e-6);
        }
    }

    #[test]
    fn full_tension_is_smoothstep() {
        for u in [0.1, 0.25, 0.5, 0.8] {
            assert_relative_eq!(hermite_scalar(u, 1.0), u * u * (3.0 - 2.0 * u), epsilon = 1e-6);
        }
    }

    #[test]
    fn profile_is_monotonic() {
        let mut last = 0.0;
        for step in 1..=20 {
            let s = hermite_scalar(step as f32 / 20.0, 0.5);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn slerp_midpoint() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        let mid = hermite_slerp(&a, &b, 0.5, 0.5);
        assert_relative_eq!(mid.angle(), 0.5, epsilon = 1e-5);
        assert_eq!(hermite_slerp(&a, &b, 0.0, 0.5), a);
        assert_eq!(hermite_slerp(&a, &b, 1.0, 0.5), b);
    }
}
