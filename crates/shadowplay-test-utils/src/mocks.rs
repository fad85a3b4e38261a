//! Mock implementations of engine traits for testing.
//!
//! Clocks that make CPU budget overruns reproducible, and a solver that
//! reports whatever status a test asks for.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use shadowplay_core::time::MonotonicClock;
use shadowplay_ik::{ChainPose, ChainSolver, SolveReport, SolveStatus};
use shadowplay_rig::{SolverKind, SolverParams};

#[allow(clippy::cast_possible_truncation)]
const fn nanos(d: Duration) -> u64 {
    d.as_nanos() as u64
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
///
/// Every reading within a tick is equal, so no tick ever overruns its
/// budget.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.nanos.fetch_add(nanos(delta), Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// SteppingClock
// ---------------------------------------------------------------------------

/// A clock that advances by a fixed step on every reading.
///
/// The scheduler reads the clock at tick start and after each phase, so a
/// step larger than the budget forces an overrun in the first phase. The
/// step can be changed mid-run through a shared handle.
#[derive(Debug)]
pub struct SteppingClock {
    nanos: AtomicU64,
    step: AtomicU64,
    reads: AtomicU32,
}

impl SteppingClock {
    pub const fn new(step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            step: AtomicU64::new(nanos(step)),
            reads: AtomicU32::new(0),
        }
    }

    /// Shared handle, for passing one copy to the engine and keeping one.
    pub fn shared(step: Duration) -> Arc<Self> {
        Arc::new(Self::new(step))
    }

    pub fn set_step(&self, step: Duration) {
        self.step.store(nanos(step), Ordering::SeqCst);
    }

    /// Number of readings taken so far.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl MonotonicClock for SteppingClock {
    fn now(&self) -> Duration {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let step = self.step.load(Ordering::SeqCst);
        Duration::from_nanos(self.nanos.fetch_add(step, Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// ScriptedSolver
// ---------------------------------------------------------------------------

/// A solver that twists every joint a little and reports a fixed status.
///
/// Useful for forcing divergence or exhaustion without constructing a
/// geometric case that triggers it.
#[derive(Debug)]
pub struct ScriptedSolver {
    kind: SolverKind,
    status: SolveStatus,
    iterations: u32,
    calls: Arc<AtomicU32>,
}

impl ScriptedSolver {
    pub fn new(kind: SolverKind, status: SolveStatus, iterations: u32) -> Self {
        Self {
            kind,
            status,
            iterations,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Counter of `solve` calls, shared with the solver.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    /// Box the solver and return its call counter.
    pub fn boxed(self) -> (Box<dyn ChainSolver>, Arc<AtomicU32>) {
        let calls = self.calls();
        (Box::new(self), calls)
    }
}

impl ChainSolver for ScriptedSolver {
    fn kind(&self) -> SolverKind {
        self.kind
    }

    fn solve(
        &self,
        chain: &mut ChainPose,
        target: &Point3<f32>,
        _params: &SolverParams,
    ) -> SolveReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let twist = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1);
        let twisted: Vec<_> = chain.rotations().iter().map(|q| twist * q).collect();
        chain.set_rotations(&twisted);
        SolveReport::new(self.status, self.iterations, chain.distance_to(target))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.now(), Duration::from_millis(16));
    }

    #[test]
    fn stepping_clock_steps_per_read() {
        let clock = SteppingClock::new(Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(2));
        clock.set_step(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(4));
        assert_eq!(clock.now(), Duration::from_millis(14));
        assert_eq!(clock.reads(), 4);
    }

    #[test]
    fn scripted_solver_counts_calls() {
        let solver = ScriptedSolver::new(SolverKind::Fabrik, SolveStatus::Diverged, 4);
        let calls = solver.calls();
        assert_eq!(solver.kind(), SolverKind::Fabrik);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let (_boxed, shared) = solver.boxed();
        assert_eq!(shared.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clocks_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ManualClock>();
        assert_send_sync::<SteppingClock>();
        assert_send_sync::<ScriptedSolver>();
    }
}
