//! FABRIK (Forward And Backward Reaching Inverse Kinematics).
//!
//! Each iteration moves the end-effector goal part of the way toward the
//! target (the damping withholds the rest), runs one backward pass from the
//! goal and one forward pass from the fixed root, then converts the joint
//! positions back to cone-limited local rotations.

use nalgebra::{Point3, Vector3};

use shadowplay_core::math::DEGENERATE_LENGTH;
use shadowplay_rig::{SolverKind, SolverParams};

use crate::chain::ChainPose;
use crate::solver::{ChainSolver, SolveReport, SolveStatus};

// ---------------------------------------------------------------------------
// DivergenceGuard
// ---------------------------------------------------------------------------

/// Detects an end-effector error that keeps growing.
///
/// Trips once the distance has increased on `window` consecutive
/// observations. Any non-increasing observation resets the run; changes
/// below [`DEGENERATE_LENGTH`] count as non-increasing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceGuard {
    window: u32,
    last: f32,
    rising: u32,
}

impl DivergenceGuard {
    pub const fn new(window: u32, initial_distance: f32) -> Self {
        Self {
            window,
            last: initial_distance,
            rising: 0,
        }
    }

    /// Record a new distance. Returns true when the guard trips.
    pub fn observe(&mut self, distance: f32) -> bool {
        if distance > self.last + DEGENERATE_LENGTH {
            self.rising += 1;
        } else {
            self.rising = 0;
        }
        self.last = distance;
        self.rising >= self.window
    }

    pub const fn rising(&self) -> u32 {
        self.rising
    }
}

// ---------------------------------------------------------------------------
// FabrikSolver
// ---------------------------------------------------------------------------

/// Damped FABRIK with divergence detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FabrikSolver {
    tolerance: f32,
    divergence_window: u32,
}

impl FabrikSolver {
    pub const fn new(tolerance: f32, divergence_window: u32) -> Self {
        Self {
            tolerance,
            divergence_window,
        }
    }
}

impl ChainSolver for FabrikSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Fabrik
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

        let lengths = chain.bone_lengths();
        let gain = 1.0 - params.damping;
        let mut guard = DivergenceGuard::new(self.divergence_window, distance);

        for iteration in 1..=params.max_iterations {
            let mut positions = chain.positions();
            let Some(&effector) = positions.last() else {
                return SolveReport::new(SolveStatus::Exhausted, 0, distance);
            };
            let goal = effector + (target - effector) * gain;
            reach(&mut positions, &lengths, goal);
            chain.aim_at_positions(&positions);

            distance = chain.distance_to(target);
            if distance <= self.tolerance {
                return SolveReport::new(SolveStatus::Converged, iteration, distance);
            }
            if guard.observe(distance) {
                tracing::debug!(
                    chain = %chain.chain(),
                    iteration,
                    distance,
                    "FABRIK diverging"
                );
                return SolveReport::new(SolveStatus::Diverged, iteration, distance);
            }
        }
        SolveReport::new(SolveStatus::Exhausted, params.max_iterations, distance)
    }
}

/// One backward pass from `goal` and one forward pass from the original
/// root position.
fn reach(positions: &mut [Point3<f32>], lengths: &[f32], goal: Point3<f32>) {
    let n = positions.len();
    if n < 2 {
        return;
    }
    let root = positions[0];
    let original = positions.to_vec();

    positions[n - 1] = goal;
    for i in (0..n - 1).rev() {
        let fallback = original[i] - original[i + 1];
        positions[i] = step(positions[i + 1], positions[i], lengths[i], fallback);
    }

    positions[0] = root;
    for i in 0..n - 1 {
        let fallback = original[i + 1] - original[i];
        positions[i + 1] = step(positions[i], positions[i + 1], lengths[i], fallback);
    }
}

/// Point at `length` from `anchor` toward `toward`. Uses `fallback` as the
/// direction when the two points coincide.
fn step(
    anchor: Point3<f32>,
    toward: Point3<f32>,
    length: f32,
    fallback: Vector3<f32>,
) -> Point3<f32> {
    let dir = toward - anchor;
    let dir = if dir.norm() > DEGENERATE_LENGTH {
        dir
    } else if fallback.norm() > DEGENERATE_LENGTH {
        fallback
    } else {
        return anchor;
    };
    anchor + dir.normalize() * length
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

    /// Four joints along +x with unit bones, rooted at the origin.
    fn arm() -> ChainPose {
        ChainPose::from_parts(
            ChainId(0),
            Isometry3::identity(),
            vec![Vector3::zeros(), Vector3::x(), Vector3::x(), Vector3::x()],
            vec![None; 4],
            vec![UnitQuaternion::identity(); 4],
        )
    }

    fn solver() -> FabrikSolver {
        FabrikSolver::new(1e-3, 3)
    }

    // -- DivergenceGuard --

    #[test]
    fn guard_trips_after_three_rising_steps() {
        let mut guard = DivergenceGuard::new(3, 1.0);
        assert!(!guard.observe(1.1));
        assert!(!guard.observe(1.2));
        assert!(guard.observe(1.3));
    }

    #[test]
    fn guard_resets_on_improvement() {
        let mut guard = DivergenceGuard::new(3, 1.0);
        assert!(!guard.observe(1.1));
        assert!(!guard.observe(1.2));
        assert!(!guard.observe(1.15));
        assert_eq!(guard.rising(), 0);
        assert!(!guard.observe(1.2));
        assert!(!guard.observe(1.3));
        assert!(guard.observe(1.4));
    }

    #[test]
    fn guard_ignores_float_noise() {
        let mut guard = DivergenceGuard::new(3, 7.0);
        for _ in 0..5 {
            assert!(!guard.observe(7.000_000_5));
        }
    }

    #[test]
    fn guard_ignores_plateau() {
        let mut guard = DivergenceGuard::new(3, 0.5);
        for _ in 0..10 {
            assert!(!guard.observe(0.5));
        }
    }

    // -- FabrikSolver --

    #[test]
    fn already_at_target_takes_no_iterations() {
        let mut chain = arm();
        let report = solver().solve(&mut chain, &Point3::new(3.0, 0.0, 0.0), &SolverParams::FABRIK);
        assert_eq!(report.status, SolveStatus::Converged);
        assert_eq!(report.iterations, 0);
    }

    /// Four unit bones, each joint bent 30 degrees about z.
    fn bent_arm() -> ChainPose {
        let bend = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 30f32.to_radians());
        ChainPose::from_parts(
            ChainId(0),
            Isometry3::identity(),
            vec![Vector3::zeros(), Vector3::x(), Vector3::x(), Vector3::x(), Vector3::x()],
            vec![None; 5],
            vec![bend, bend, bend, bend, UnitQuaternion::identity()],
        )
    }

    #[test]
    fn four_bone_arm_converges_within_cap() {
        let mut chain = bent_arm();
        let rest_effector = chain.end_effector();
        let target = rest_effector - Vector3::y() * 0.3;
        assert_relative_eq!(chain.distance_to(&target), 0.3, epsilon = 1e-5);

        let report = solver().solve(&mut chain, &target, &SolverParams::FABRIK);
        assert_eq!(report.status, SolveStatus::Converged, "{report:?}");
        assert!(report.iterations <= 12);
        assert!(chain.distance_to(&target) <= 1e-3);
    }

    /// [`bent_arm`] with a 30/60 degree cone on every joint.
    fn limited_bent_arm() -> ChainPose {
        let bend = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 30f32.to_radians());
        let cone = ConeLimit {
            soft_deg: 30.0,
            hard_deg: 60.0,
        };
        ChainPose::from_parts(
            ChainId(0),
            Isometry3::identity(),
            vec![Vector3::zeros(), Vector3::x(), Vector3::x(), Vector3::x(), Vector3::x()],
            vec![Some(cone); 5],
            vec![bend, bend, bend, bend, UnitQuaternion::identity()],
        )
    }

    /// A known diverging target first, then a grid of reachable points.
    #[allow(clippy::cast_precision_loss)]
    fn candidate_targets() -> impl Iterator<Item = Point3<f32>> {
        let grid = (-4i32..=4).flat_map(|i| {
            (-4i32..=4).flat_map(move |j| {
                (-4i32..=4).map(move |k| {
                    Point3::new(i as f32 * 0.7, j as f32 * 0.7, k as f32 * 0.7)
                })
            })
        });
        std::iter::once(Point3::new(2.376_942_2, -1.469_996_8, 2.070_021_2)).chain(
            grid.filter(|p| {
                let d = p.coords.norm();
                d > 0.5 && d < 3.8
            }),
        )
    }

    #[test]
    fn cone_limited_arm_diverges() {
        let diverged = candidate_targets().find_map(|target| {
            let mut chain = limited_bent_arm();
            let report = solver().solve(&mut chain, &target, &SolverParams::FABRIK);
            (report.status == SolveStatus::Diverged).then_some((target, report))
        });
        let (target, report) = diverged.expect("some reachable target diverges");

        // The guard needs three rising steps.
        assert!(report.iterations >= 3, "{report:?}");
        assert!(report.iterations <= SolverParams::FABRIK.max_iterations);
        assert!(report.distance > 1e-3);

        let mut again = limited_bent_arm();
        let repeat = solver().solve(&mut again, &target, &SolverParams::FABRIK);
        assert_eq!(repeat, report);
    }

    #[test]
    fn bone_lengths_are_preserved() {
        let mut chain = arm();
        let _ = solver().solve(&mut chain, &Point3::new(1.5, 1.5, 0.5), &SolverParams::FABRIK);
        let positions = chain.positions();
        for pair in positions.windows(2) {
            assert_relative_eq!((pair[1] - pair[0]).norm(), 1.0, epsilon = 1e-4);
        }
        assert_relative_eq!(positions[0], Point3::origin(), epsilon = 1e-6);
    }

    #[test]
    fn unreachable_target_exhausts_without_diverging() {
        let mut chain = arm();
        let report =
            solver().solve(&mut chain, &Point3::new(0.0, 10.0, 0.0), &SolverParams::FABRIK);
        assert_eq!(report.status, SolveStatus::Exhausted);
        assert_eq!(report.iterations, 12);
        // The chain stretches toward the target.
        assert_relative_eq!(chain.end_effector(), Point3::new(0.0, 3.0, 0.0), epsilon = 1e-2);
    }

    #[test]
    fn locked_joints_cannot_reach() {
        let mut chain = ChainPose::from_parts(
            ChainId(0),
            Isometry3::identity(),
            vec![Vector3::zeros(), Vector3::x(), Vector3::x()],
            vec![
                Some(ConeLimit {
                    soft_deg: 0.0,
                    hard_deg: 0.0,
                });
                3
            ],
            vec![UnitQuaternion::identity(); 3],
        );
        let report = solver().solve(&mut chain, &Point3::new(0.0, 2.0, 0.0), &SolverParams::FABRIK);
        assert_ne!(report.status, SolveStatus::Converged);
        assert_relative_eq!(chain.end_effector(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn damping_slows_convergence() {
        let target = Point3::new(2.0, 1.5, 0.0);
        let mut fast = arm();
        let mut slow = arm();
        let loose = SolverParams {
            damping: 0.0,
            ..SolverParams::FABRIK
        };
        let heavy = SolverParams {
            damping: 0.6,
            ..SolverParams::FABRIK
        };
        let a = solver().solve(&mut fast, &target, &loose);
        let b = solver().solve(&mut slow, &target, &heavy);
        assert_eq!(a.status, SolveStatus::Converged);
        assert!(a.iterations < b.iterations || b.status != SolveStatus::Converged);
    }
}
