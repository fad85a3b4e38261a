//! Cyclic Coordinate Descent.
//!
//! Sweeps from the joint before the end-effector back to the chain root,
//! turning each joint so the end-effector swings toward the target. Each
//! turn is clamped to the chain's `angular_clamp_deg` and cone-limited.

use nalgebra::{Point3, Vector3};

use shadowplay_core::math::{DEGENERATE_LENGTH, clamp_rotation, rotation_between};
use shadowplay_rig::{SolverKind, SolverParams};

use crate::chain::ChainPose;
use crate::solver::{ChainSolver, SolveReport, SolveStatus};

/// CCD with a per-joint, per-iteration angular clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdSolver {
    tolerance: f32,
}

impl CcdSolver {
    pub const fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }
}

impl ChainSolver for CcdSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Ccd
    }

    fn solve(
        &self,
        chain: &mut ChainPose,
        target: &Point3<f32>,
        params: &SolverParams,
    ) -> SolveReport {
        let mut distance = chain.distance_to(target);
        if distance <= self.tolerance {
            return SolveReport::new(SolveStatus::Converged, 0, distance);
        }
        let n = chain.len();
        if n < 2 {
            return SolveReport::new(SolveStatus::Exhausted, 0, distance);
        }
        let max_step = params.angular_clamp_deg.to_radians();

        for iteration in 1..=params.max_iterations {
            for i in (0..n - 1).rev() {
                let frames = chain.world_frames();
                let joint = frames[i].translation.vector;
                let effector = frames[n - 1].translation.vector;
                let to_effector: Vector3<f32> = effector - joint;
                let to_target: Vector3<f32> = target.coords - joint;
                if to_effector.norm() < DEGENERATE_LENGTH || to_target.norm() < DEGENERATE_LENGTH {
                    continue;
                }
                let turn = clamp_rotation(&rotation_between(&to_effector, &to_target), max_step);
                chain.rotate_joint_world(&frames, i, &turn);
            }

            distance = chain.distance_to(target);
            if distance <= self.tolerance {
                return SolveReport::new(SolveStatus::Converged, iteration, distance);
            }
        }
        SolveReport::new(SolveStatus::Exhausted, params.max_iterations, distance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, UnitQuaternion};
    use shadowplay_core::types::ChainId;
    use shadowplay_rig::ConeLimit;

    /// Three short finger segments along +x.
    fn finger(limits: Option<ConeLimit>) -> ChainPose {
        ChainPose::from_parts(
            ChainId(1),
            Isometry3::identity(),
            vec![
                Vector3::zeros(),
                Vector3::x() * 0.4,
                Vector3::x() * 0.3,
                Vector3::x() * 0.2,
            ],
            vec![limits; 4],
            vec![UnitQuaternion::identity(); 4],
        )
    }

    fn solver() -> CcdSolver {
        CcdSolver::new(1e-3)
    }

    #[test]
    fn curls_toward_nearby_target() {
        let mut chain = finger(None);
        let target = Point3::new(0.7, 0.3, 0.0);
        let params = SolverParams {
            max_iterations: 40,
            ..SolverParams::CCD
        };
        let report = solver().solve(&mut chain, &target, &params);
        assert_eq!(report.status, SolveStatus::Converged, "{report:?}");
        assert!(chain.distance_to(&target) <= 1e-3);
    }

    #[test]
    fn each_joint_turn_is_clamped() {
        let mut chain = finger(None);
        // Directly behind the root: every joint wants a half turn.
        let target = Point3::new(-0.5, 0.01, 0.0);
        let params = SolverParams {
            max_iterations: 1,
            ..SolverParams::CCD
        };
        let _ = solver().solve(&mut chain, &target, &params);
        for q in chain.rotations() {
            assert!(q.angle().to_degrees() <= 15.0 + 1e-3, "{}", q.angle().to_degrees());
        }
    }

    #[test]
    fn end_effector_joint_is_never_rotated() {
        let mut chain = finger(None);
        let _ = solver().solve(&mut chain, &Point3::new(0.2, 0.5, 0.1), &SolverParams::CCD);
        assert_eq!(chain.rotations()[3], UnitQuaternion::identity());
    }

    #[test]
    fn cone_limits_hold_during_solve() {
        let limit = ConeLimit {
            soft_deg: 20.0,
            hard_deg: 35.0,
        };
        let mut chain = finger(Some(limit));
        let _ = solver().solve(&mut chain, &Point3::new(-0.3, 0.3, 0.0), &SolverParams::CCD);
        for q in chain.rotations() {
            assert!(q.angle().to_degrees() < 35.0 + 1e-3);
        }
    }

    #[test]
    fn unreachable_target_exhausts() {
        let mut chain = finger(None);
        let report = solver().solve(&mut chain, &Point3::new(5.0, 0.0, 0.0), &SolverParams::CCD);
        assert_eq!(report.status, SolveStatus::Exhausted);
        assert_eq!(report.iterations, 12);
        assert_relative_eq!(report.distance, 4.1, epsilon = 1e-4);
    }
}
