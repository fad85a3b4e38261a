//! Solver dispatch and the fallback policy.
//!
//! ```text
//! Fabrik ──converged──► done
//!    │ diverged / exhausted
//!    ▼
//!   Ccd ──converged──► done
//!    │ exhausted
//!    ▼
//! identity-hold (prior rotations) + not converged
//! ```

use nalgebra::{Point3, UnitQuaternion};

use shadowplay_core::math::is_finite;
use shadowplay_core::types::ChainId;
use shadowplay_rig::{Chain, SolverKind, SolverParams};

use crate::ccd::CcdSolver;
use crate::chain::ChainPose;
use crate::config::SolverConfig;
use crate::fabrik::FabrikSolver;
use crate::two_bone::TwoBoneSolver;

// ---------------------------------------------------------------------------
// ChainSolver
// ---------------------------------------------------------------------------

/// How a single solver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// End-effector within tolerance.
    Converged,
    /// Iteration cap reached without converging.
    Exhausted,
    /// Error kept rising; aborted early.
    Diverged,
}

/// Result of one solver run on a [`ChainPose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub iterations: u32,
    /// Final end-effector to target distance.
    pub distance: f32,
}

impl SolveReport {
    pub const fn new(status: SolveStatus, iterations: u32, distance: f32) -> Self {
        Self {
            status,
            iterations,
            distance,
        }
    }

    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// An IK algorithm over a chain snapshot.
///
/// Implementations mutate only `chain` and keep no state between calls.
pub trait ChainSolver: Send + Sync {
    fn kind(&self) -> SolverKind;

    fn solve(
        &self,
        chain: &mut ChainPose,
        target: &Point3<f32>,
        params: &SolverParams,
    ) -> SolveReport;
}

// ---------------------------------------------------------------------------
// IkOutcome
// ---------------------------------------------------------------------------

/// Result of solving one chain for one IK tick.
#[derive(Debug, Clone, PartialEq)]
pub struct IkOutcome {
    pub chain: ChainId,
    /// Local rotations in chain order. The prior rotations when not converged.
    pub rotations: Vec<UnitQuaternion<f32>>,
    pub converged: bool,
    /// Iterations across every solver that ran.
    pub iterations_used: u32,
    /// The solver whose result (or failure) is reported.
    pub solver_used: SolverKind,
    pub fell_back_to_ccd: bool,
    pub distance: f32,
}

impl IkOutcome {
    /// An outcome that keeps `prior` without running any solver.
    pub fn held(chain: &Chain, prior: Vec<UnitQuaternion<f32>>) -> Self {
        Self {
            chain: chain.id,
            rotations: prior,
            converged: false,
            iterations_used: 0,
            solver_used: chain.solver,
            fell_back_to_ccd: false,
            distance: f32::INFINITY,
        }
    }
}

// ---------------------------------------------------------------------------
// IkSolverSet
// ---------------------------------------------------------------------------

/// The three solvers plus the policy that picks between them.
pub struct IkSolverSet {
    config: SolverConfig,
    fabrik: Box<dyn ChainSolver>,
    ccd: Box<dyn ChainSolver>,
    two_bone: Box<dyn ChainSolver>,
}

impl std::fmt::Debug for IkSolverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IkSolverSet")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for IkSolverSet {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl IkSolverSet {
    /// The standard FABRIK, CCD and two-bone solvers.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            fabrik: Box::new(FabrikSolver::new(config.tolerance, config.divergence_window)),
            ccd: Box::new(CcdSolver::new(config.tolerance)),
            two_bone: Box::new(TwoBoneSolver::new()),
            config,
        }
    }

    /// Replace individual solvers.
    #[must_use]
    pub fn with_solvers(
        mut self,
        fabrik: Option<Box<dyn ChainSolver>>,
        ccd: Option<Box<dyn ChainSolver>>,
        two_bone: Option<Box<dyn ChainSolver>>,
    ) -> Self {
        if let Some(solver) = fabrik {
            self.fabrik = solver;
        }
        if let Some(solver) = ccd {
            self.ccd = solver;
        }
        if let Some(solver) = two_bone {
            self.two_bone = solver;
        }
        self
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `chain` toward `target`, starting from `start`.
    ///
    /// When no solver converges the outcome carries `start`'s rotations
    /// unchanged.
    pub fn solve(&self, chain: &Chain, start: &ChainPose, target: &Point3<f32>) -> IkOutcome {
        let prior = start.rotations().to_vec();
        if !is_finite(&target.coords) {
            return IkOutcome::held(chain, prior);
        }

        let primary = match chain.solver {
            SolverKind::Fabrik => self.fabrik.as_ref(),
            SolverKind::Ccd => self.ccd.as_ref(),
            SolverKind::TwoBone => self.two_bone.as_ref(),
        };
        let mut working = start.clone();
        let report = primary.solve(&mut working, target, &chain.params);
        if report.converged() {
            return IkOutcome {
                chain: chain.id,
                rotations: working.into_rotations(),
                converged: true,
                iterations_used: report.iterations,
                solver_used: chain.solver,
                fell_back_to_ccd: false,
                distance: report.distance,
            };
        }

        if chain.solver == SolverKind::Fabrik && self.config.fallback_to_ccd {
            tracing::debug!(
                chain = %chain.id,
                status = ?report.status,
                iterations = report.iterations,
                "FABRIK failed, falling back to CCD"
            );
            let params = SolverParams {
                max_iterations: chain.params.max_iterations,
                angular_clamp_deg: chain.params.angular_clamp_deg,
                ..SolverParams::CCD
            };
            let mut retry = start.clone();
            let fallback = self.ccd.solve(&mut retry, target, &params);
            let iterations_used = report.iterations + fallback.iterations;
            return if fallback.converged() {
                IkOutcome {
                    chain: chain.id,
                    rotations: retry.into_rotations(),
                    converged: true,
                    iterations_used,
                    solver_used: SolverKind::Ccd,
                    fell_back_to_ccd: true,
                    distance: fallback.distance,
                }
            } else {
                IkOutcome {
                    chain: chain.id,
                    rotations: prior,
                    converged: false,
                    iterations_used,
                    solver_used: SolverKind::Ccd,
                    fell_back_to_ccd: true,
                    distance: fallback.distance,
                }
            };
        }

        IkOutcome {
            chain: chain.id,
            rotations: prior,
            converged: false,
            iterations_used: report.iterations,
            solver_used: chain.solver,
            fell_back_to_ccd: false,
            distance: report.distance,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
