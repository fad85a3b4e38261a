//! Analytical two-bone IK.
//!
//! Places the middle joint with the law of cosines. The target distance is
//! clamped to the chain's reach first, so the end-effector can never
//! overshoot and the solve never iterates.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use shadowplay_core::math::{DEGENERATE_LENGTH, any_perpendicular};
use shadowplay_rig::{SolverKind, SolverParams};

use crate::chain::ChainPose;
use crate::solver::{ChainSolver, SolveReport, SolveStatus};

/// Closed-form solver for three-joint chains.
///
/// The bend plane comes from the chain's current bend. A straight chain
/// falls back to its pole vector, then to an arbitrary perpendicular.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoBoneSolver;

impl TwoBoneSolver {
    pub const fn new() -> Self {
        Self
    }
}

fn bend_axis(
    chain: &ChainPose,
    [root, mid, tip]: [Point3<f32>; 3],
    aim: &Vector3<f32>,
) -> Vector3<f32> {
    let current = (mid - root).cross(&(tip - mid));
    if current.norm() > DEGENERATE_LENGTH {
        return current;
    }
    if let Some(pole) = chain.pole() {
        let toward_pole = aim.cross(&(pole - root.coords));
        if toward_pole.norm() > DEGENERATE_LENGTH {
            return -toward_pole;
        }
    }
    any_perpendicular(aim)
}

impl ChainSolver for TwoBoneSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::TwoBone
    }

    fn solve(
        &self,
        chain: &mut ChainPose,
        target: &Point3<f32>,
        _params: &SolverParams,
    ) -> SolveReport {
        let positions = chain.positions();
        let distance = chain.distance_to(target);
        let &[root, mid, tip] = positions.as_slice() else {
            return SolveReport::new(SolveStatus::Exhausted, 0, distance);
        };
        let lengths = chain.bone_lengths();
        let (upper, lower) = (lengths[0], lengths[1]);

        let to_target = target - root;
        let aim = if to_target.norm() > DEGENERATE_LENGTH {
            to_target.normalize()
        } else if (tip - root).norm() > DEGENERATE_LENGTH {
            (tip - root).normalize()
        } else {
            return SolveReport::new(SolveStatus::Converged, 1, distance);
        };

        let min_reach = (upper - lower).abs();
        let max_reach = upper + lower;
        let reach = to_target.norm().clamp(min_reach, max_reach);

        // Angle at the root between the aim line and the upper bone.
        let cos_root = if upper * reach > DEGENERATE_LENGTH {
            ((upper * upper + reach * reach - lower * lower) / (2.0 * upper * reach))
                .clamp(-1.0, 1.0)
        } else {
            1.0
        };
        let root_angle = cos_root.acos();

        let axis = Unit::new_normalize(bend_axis(chain, [root, mid, tip], &aim));
        let upper_dir = UnitQuaternion::from_axis_angle(&axis, -root_angle) * aim;
        let new_mid = root + upper_dir * upper;
        let new_tip = root + aim * reach;

        chain.aim_at_positions(&[root, new_mid, new_tip]);
        SolveReport::new(SolveStatus::Converged, 1, chain.distance_to(target))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
