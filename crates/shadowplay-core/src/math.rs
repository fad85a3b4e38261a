//! Rotation helpers shared by the solvers, the blender and the rig loader.
//!
//! nalgebra's `slerp` and `rotation_between` have undefined cases (nearly
//! identical or antipodal inputs). The wrappers here resolve those cases
//! deterministically so the tick pipeline never panics on degenerate poses.

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// Below this magnitude a vector is treated as zero.
pub const DEGENERATE_LENGTH: f32 = 1e-6;

/// Spherical interpolation from `a` to `b`.
///
/// `t == 0` returns `a` and `t == 1` returns `b` bit-for-bit. Inputs where
/// slerp is numerically undefined fall back to normalized lerp.
#[must_use]
pub fn slerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    a.try_slerp(b, t, 1e-6).unwrap_or_else(|| a.nlerp(b, t))
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Zero-length inputs yield the identity. Antipodal inputs rotate by pi about
/// an arbitrary axis perpendicular to `from`.
#[must_use]
pub fn rotation_between(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    if from.norm() < DEGENERATE_LENGTH || to.norm() < DEGENERATE_LENGTH {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        let axis = Unit::new_normalize(any_perpendicular(from));
        UnitQuaternion::from_axis_angle(&axis, std::f32::consts::PI)
    })
}

/// A vector perpendicular to `v` (not normalized). Deterministic for a given input.
#[must_use]
pub fn any_perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    let candidate = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&candidate)
}

/// Limit the rotation angle of `q` to `max_angle` radians, keeping its axis.
#[must_use]
pub fn clamp_rotation(q: &UnitQuaternion<f32>, max_angle: f32) -> UnitQuaternion<f32> {
    let angle = q.angle();
    if angle <= max_angle {
        return *q;
    }
    match q.axis() {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, max_angle),
        None => *q,
    }
}

/// Build a unit quaternion from `[x, y, z, w]`.
///
/// Returns `None` for non-finite or near-zero input.
#[must_use]
pub fn quat_from_xyzw(xyzw: [f32; 4]) -> Option<UnitQuaternion<f32>> {
    let [x, y, z, w] = xyzw;
    let q = Quaternion::new(w, x, y, z);
    if !xyzw.iter().all(|c| c.is_finite()) || q.norm() < DEGENERATE_LENGTH {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q))
}

/// Convert `[x, y, z]` to a vector, rejecting non-finite components.
#[must_use]
pub fn vec3_from_array(xyz: [f32; 3]) -> Option<Vector3<f32>> {
    xyz.iter()
        .all(|c| c.is_finite())
        .then(|| Vector3::new(xyz[0], xyz[1], xyz[2]))
}

/// True when every component of `v` is finite.
#[must_use]
pub fn is_finite(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
