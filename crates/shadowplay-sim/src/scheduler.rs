//! The per-tick pipeline: Solving, Blending, Lighting, Committed.
//!
//! [`TickScheduler::tick`] is the single entry point. Stage order is fixed
//! by the function body, not by registration order. The CPU budget is
//! measured with an injected [`MonotonicClock`]; an overrun never aborts the
//! tick, it only truncates optional work and raises a condition.

use std::sync::Arc;
use std::time::Duration;

use nalgebra::{Point3, UnitQuaternion};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use shadowplay_core::condition::{BudgetPhase, TickCondition};
use shadowplay_core::config::TickConfig;
use shadowplay_core::error::InputError;
use shadowplay_core::math::is_finite;
use shadowplay_core::time::{Cadence, MonotonicClock, SimTime};
use shadowplay_core::types::{ChainId, PuppetId};
use shadowplay_ik::{ChainPose, IkOutcome, IkSolverSet};
use shadowplay_lighting::{
    LightSource, LightingModel, LightingRefinement, PuppetShadowInput, ShadowUniforms,
};
use shadowplay_pose::{BlendConfig, ChainTarget, OverrideWeights, PoseBlender, PoseFrame};
use shadowplay_rig::{Pose, RigGraph, SolverKind};

use crate::safe_mode::SafeModeState;

// ---------------------------------------------------------------------------
// TickPhase
// ---------------------------------------------------------------------------

/// Scheduler state machine: `Idle -> Solving -> Blending -> Lighting ->
/// Committed -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TickPhase {
    #[default]
    Idle,
    Solving,
    Blending,
    Lighting,
    Committed,
}

impl TickPhase {
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Solving,
            Self::Solving => Self::Blending,
            Self::Blending => Self::Lighting,
            Self::Lighting => Self::Committed,
            Self::Committed => Self::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Session-layer input for one puppet.
#[derive(Debug, Clone)]
pub struct PuppetInput {
    pub puppet: PuppetId,
    /// New chain targets. A chain keeps its last target until replaced.
    pub targets: Vec<ChainTarget>,
    /// FK keyframe sample; the rest pose when absent.
    pub fk_sample: Option<Pose>,
    pub override_weights: OverrideWeights,
    /// Occluder thickness for transmission and contact hardening.
    pub thickness: f32,
    /// Absorption coefficient; the configured default when absent.
    pub sigma: Option<f32>,
}

impl PuppetInput {
    pub fn new(puppet: PuppetId) -> Self {
        Self {
            puppet,
            targets: Vec::new(),
            fk_sample: None,
            override_weights: OverrideWeights::new(),
            thickness: 0.0,
            sigma: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, chain: ChainId, position: Point3<f32>) -> Self {
        self.targets.push(ChainTarget::new(chain, position));
        self
    }

    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = ChainTarget>) -> Self {
        self.targets.extend(targets);
        self
    }

    #[must_use]
    pub fn with_fk_sample(mut self, pose: Pose) -> Self {
        self.fk_sample = Some(pose);
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: OverrideWeights) -> Self {
        self.override_weights = weights;
        self
    }

    #[must_use]
    pub const fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }
}

/// Everything the session layer supplies for one tick.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Elapsed time since the previous tick.
    pub delta: Duration,
    pub puppets: Vec<PuppetInput>,
    pub lights: Vec<LightSource>,
}

impl TickInput {
    pub fn new(delta: Duration) -> Self {
        Self {
            delta,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_puppet(mut self, puppet: PuppetInput) -> Self {
        self.puppets.push(puppet);
        self
    }

    #[must_use]
    pub fn with_lights(mut self, lights: impl IntoIterator<Item = LightSource>) -> Self {
        self.lights.extend(lights);
        self
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// How one chain was solved on an IK tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainReport {
    pub puppet: PuppetId,
    pub chain: ChainId,
    pub solver_used: SolverKind,
    pub iterations: u32,
    pub converged: bool,
    pub fell_back_to_ccd: bool,
    /// Not attempted because the budget ran out; prior rotations held.
    pub skipped: bool,
}

/// Everything one tick publishes.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub tick: u64,
    pub time: SimTime,
    /// One committed frame per registered puppet, in puppet order.
    pub frames: Vec<PoseFrame>,
    pub shadows: ShadowUniforms,
    pub signals: Vec<TickCondition>,
    /// Chain solves on IK ticks; empty otherwise.
    pub chains: Vec<ChainReport>,
    /// Safe-mode state the tick ran under.
    pub mode: SafeModeState,
    pub cpu_time: Duration,
}

impl TickOutput {
    pub fn budget_exceeded(&self) -> bool {
        self.signals.iter().any(TickCondition::is_budget_exceeded)
    }

    pub fn divergent_ik_count(&self) -> usize {
        self.signals.iter().filter(|s| s.is_divergent_ik()).count()
    }

    pub fn frame(&self, puppet: PuppetId) -> Option<&PoseFrame> {
        self.frames.iter().find(|f| f.puppet() == puppet)
    }
}

// ---------------------------------------------------------------------------
// TickState
// ---------------------------------------------------------------------------

/// Scratch state for the tick in flight. Discarded when the tick commits.
#[derive(Debug)]
pub struct TickState {
    pub tick: u64,
    pub phase: TickPhase,
    pub chains: Vec<ChainReport>,
    pub signals: Vec<TickCondition>,
    pub budget_exceeded: bool,
}

impl TickState {
    const fn new(tick: u64) -> Self {
        Self {
            tick,
            phase: TickPhase::Idle,
            chains: Vec::new(),
            signals: Vec::new(),
            budget_exceeded: false,
        }
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        tracing::trace!(tick = self.tick, phase = ?self.phase, "phase");
    }

    fn flag_budget(&mut self, phase: BudgetPhase, elapsed: Duration, budget: Duration) {
        if self.budget_exceeded {
            return;
        }
        self.budget_exceeded = true;
        tracing::debug!(tick = self.tick, ?phase, ?elapsed, ?budget, "frame budget exceeded");
        self.signals.push(TickCondition::FrameBudgetExceeded {
            phase,
            elapsed,
            budget,
        });
    }
}

// ---------------------------------------------------------------------------
// TickScheduler
// ---------------------------------------------------------------------------

/// Per-puppet state that persists across ticks.
#[derive(Debug)]
struct PuppetSlot {
    rig: RigGraph,
    blender: PoseBlender,
    /// Last target per chain.
    targets: Vec<Option<Point3<f32>>>,
    /// Last IK rotations per chain, the starting point of the next solve.
    ik_rotations: Vec<Vec<UnitQuaternion<f32>>>,
}

struct SolveJob {
    puppet: usize,
    chain: usize,
    start: ChainPose,
    target: Point3<f32>,
}

/// Drives one tick at a time over every registered puppet.
pub struct TickScheduler {
    config: TickConfig,
    cadence: Cadence,
    solvers: IkSolverSet,
    lighting: LightingModel,
    blend: BlendConfig,
    clock: Arc<dyn MonotonicClock>,
    puppets: Vec<PuppetSlot>,
    tick: u64,
    time: SimTime,
    phase: TickPhase,
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("config", &self.config)
            .field("puppets", &self.puppets.len())
            .field("tick", &self.tick)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl TickScheduler {
    pub fn new(
        config: TickConfig,
        solvers: IkSolverSet,
        lighting: LightingModel,
        blend: BlendConfig,
        clock: Arc<dyn MonotonicClock>,
    ) -> Self {
        Self {
            cadence: config.ik_cadence(),
            config,
            solvers,
            lighting,
            blend,
            clock,
            puppets: Vec::new(),
            tick: 0,
            time: SimTime::ZERO,
            phase: TickPhase::Idle,
        }
    }

    /// Register a rig. Ids are dense, in registration order.
    pub fn add_puppet(&mut self, rig: RigGraph) -> PuppetId {
        let id = PuppetId::from_index(self.puppets.len());
        let chains = rig.chains().len();
        tracing::info!(puppet = %id, rig = rig.name(), chains, "puppet registered");
        self.puppets.push(PuppetSlot {
            rig,
            blender: PoseBlender::new(self.blend.clone()),
            targets: vec![None; chains],
            ik_rotations: vec![Vec::new(); chains],
        });
        id
    }

    pub fn rig(&self, puppet: PuppetId) -> Option<&RigGraph> {
        self.puppets.get(puppet.index()).map(|slot| &slot.rig)
    }

    pub fn puppet_count(&self) -> usize {
        self.puppets.len()
    }

    /// Index of the next tick.
    pub const fn tick_index(&self) -> u64 {
        self.tick
    }

    pub const fn time(&self) -> SimTime {
        self.time
    }

    /// `Idle` between ticks.
    pub const fn phase(&self) -> TickPhase {
        self.phase
    }

    pub const fn config(&self) -> &TickConfig {
        &self.config
    }

    pub const fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub const fn lighting(&self) -> &LightingModel {
        &self.lighting
    }

    /// Run one tick under the given safe-mode state.
    pub fn tick(&mut self, input: &TickInput, mode: SafeModeState) -> TickOutput {
        let budget = self.config.cpu_budget();
        let started = self.clock.now();
        self.time += input.delta;
        let mut state = TickState::new(self.tick);

        let routed = self.route(input);

        // Solving
        self.enter(&mut state);
        self.apply_targets(&routed);
        if self.cadence.fires(state.tick) {
            self.solve(&mut state, started, budget);
        }
        let solve_phase = if self.config.parallel_solve {
            BudgetPhase::SolveJoin
        } else {
            BudgetPhase::Solving
        };
        self.check_budget(&mut state, started, budget, solve_phase);

        // Blending
        self.enter(&mut state);
        let frames = self.blend_and_commit(&routed, state.tick);
        self.check_budget(&mut state, started, budget, BudgetPhase::Blending);

        // Lighting
        self.enter(&mut state);
        let mut refinement = LightingRefinement::for_tier(mode.tier(), self.lighting.config());
        if state.budget_exceeded {
            refinement = refinement.truncated();
        }
        let shadow_inputs = self.shadow_inputs(&routed);
        let params = self
            .lighting
            .update(&input.lights, &shadow_inputs, self.time, &refinement);
        let shadows = self.lighting.publish(&refinement, params);
        let cpu_time = self.check_budget(&mut state, started, budget, BudgetPhase::Lighting);

        // Committed
        self.enter(&mut state);
        tracing::debug!(
            tick = state.tick,
            ?cpu_time,
            signals = state.signals.len(),
            %mode,
            "tick committed"
        );
        let output = TickOutput {
            tick: state.tick,
            time: self.time,
            frames,
            shadows,
            signals: state.signals,
            chains: state.chains,
            mode,
            cpu_time,
        };
        self.tick += 1;
        self.phase = TickPhase::Idle;
        output
    }

    fn enter(&mut self, state: &mut TickState) {
        state.advance();
        self.phase = state.phase;
    }

    fn check_budget(
        &self,
        state: &mut TickState,
        started: Duration,
        budget: Duration,
        phase: BudgetPhase,
    ) -> Duration {
        let elapsed = self.clock.now().saturating_sub(started);
        if elapsed > budget {
            state.flag_budget(phase, elapsed, budget);
        }
        elapsed
    }

    /// Input entry per registered puppet. Unknown puppets are dropped with
    /// a warning; for duplicates the last entry wins.
    fn route<'a>(&self, input: &'a TickInput) -> Vec<Option<&'a PuppetInput>> {
        let mut routed = vec![None; self.puppets.len()];
        for entry in &input.puppets {
            match routed.get_mut(entry.puppet.index()) {
                Some(slot) => *slot = Some(entry),
                None => {
                    let err = InputError::UnknownPuppet(entry.puppet);
                    tracing::warn!(%err, "ignoring puppet input");
                }
            }
        }
        routed
    }

    fn apply_targets(&mut self, routed: &[Option<&PuppetInput>]) {
        for (slot, entry) in self.puppets.iter_mut().zip(routed) {
            let Some(entry) = entry else { continue };
            for target in &entry.targets {
                let err = if target.chain.index() >= slot.targets.len() {
                    Some(InputError::UnknownChain {
                        puppet: entry.puppet,
                        chain: target.chain,
                    })
                } else if !is_finite(&target.position.coords) {
                    Some(InputError::NonFiniteTarget {
                        puppet: entry.puppet,
                        chain: target.chain,
                    })
                } else {
                    None
                };
                match err {
                    Some(err) => tracing::warn!(%err, "ignoring target"),
                    None => slot.targets[target.chain.index()] = Some(target.position),
                }
            }
        }
    }

    fn solve(&mut self, state: &mut TickState, started: Duration, budget: Duration) {
        let jobs = self.collect_jobs();
        let solvers = &self.solvers;
        let puppets = &self.puppets;
        let run = |job: &SolveJob| {
            let chain = &puppets[job.puppet].rig.chains()[job.chain];
            solvers.solve(chain, &job.start, &job.target)
        };

        let outcomes: Vec<Option<IkOutcome>> = if self.config.parallel_solve {
            jobs.par_iter().map(|job| Some(run(job))).collect()
        } else {
            let mut outcomes = Vec::with_capacity(jobs.len());
            for job in &jobs {
                if !state.budget_exceeded {
                    let elapsed = self.clock.now().saturating_sub(started);
                    if elapsed > budget {
                        state.flag_budget(BudgetPhase::Solving, elapsed, budget);
                    }
                }
                outcomes.push((!state.budget_exceeded).then(|| run(job)));
            }
            outcomes
        };

        for (job, outcome) in jobs.into_iter().zip(outcomes) {
            self.record(state, job, outcome);
        }
    }

    fn collect_jobs(&self) -> Vec<SolveJob> {
        let mut jobs = Vec::new();
        for (p, slot) in self.puppets.iter().enumerate() {
            for chain in slot.rig.chains() {
                let c = chain.id.index();
                if let Some(target) = slot.targets[c] {
                    jobs.push(SolveJob {
                        puppet: p,
                        chain: c,
                        start: ChainPose::capture(&slot.rig, chain, &slot.ik_rotations[c]),
                        target,
                    });
                }
            }
        }
        jobs
    }

    fn record(&mut self, state: &mut TickState, job: SolveJob, outcome: Option<IkOutcome>) {
        let puppet = PuppetId::from_index(job.puppet);
        let slot = &mut self.puppets[job.puppet];
        let chain = &slot.rig.chains()[job.chain];
        let report = match outcome {
            Some(outcome) => {
                if !outcome.converged {
                    tracing::warn!(
                        %puppet,
                        chain = %chain.id,
                        iterations = outcome.iterations_used,
                        distance = outcome.distance,
                        "DivergentIK: holding prior rotations"
                    );
                    state.signals.push(TickCondition::DivergentIk {
                        puppet,
                        chain: chain.id,
                        iterations: outcome.iterations_used,
                    });
                }
                let report = ChainReport {
                    puppet,
                    chain: chain.id,
                    solver_used: outcome.solver_used,
                    iterations: outcome.iterations_used,
                    converged: outcome.converged,
                    fell_back_to_ccd: outcome.fell_back_to_ccd,
                    skipped: false,
                };
                slot.ik_rotations[job.chain].clone_from(&outcome.rotations);
                slot.blender.record_ik(chain.id, outcome.rotations);
                report
            }
            None => {
                let held = job.start.into_rotations();
                slot.ik_rotations[job.chain].clone_from(&held);
                slot.blender.record_ik(chain.id, held);
                ChainReport {
                    puppet,
                    chain: chain.id,
                    solver_used: chain.solver,
                    iterations: 0,
                    converged: false,
                    fell_back_to_ccd: false,
                    skipped: true,
                }
            }
        };
        state.chains.push(report);
    }

    fn blend_and_commit(&mut self, routed: &[Option<&PuppetInput>], tick: u64) -> Vec<PoseFrame> {
        let stride = self.cadence.stride();
        let phase = self.cadence.phase(tick);
        let no_weights = OverrideWeights::new();
        let mut frames = Vec::with_capacity(self.puppets.len());
        for (i, (slot, entry)) in self.puppets.iter_mut().zip(routed).enumerate() {
            let puppet = PuppetId::from_index(i);
            let fk = match entry.and_then(|e| e.fk_sample.as_ref()) {
                Some(sample) if sample.len() == slot.rig.joint_count() => sample,
                Some(sample) => {
                    tracing::warn!(
                        %puppet,
                        joints = sample.len(),
                        expected = slot.rig.joint_count(),
                        "FK sample has the wrong length, using rest pose"
                    );
                    slot.rig.rest_pose()
                }
                None => slot.rig.rest_pose(),
            };
            let weights = entry.map_or(&no_weights, |e| &e.override_weights);
            let pose = slot.blender.compose(&slot.rig, fk, weights, phase, stride);
            slot.rig.commit_pose(&pose);
            frames.push(PoseFrame::new(puppet, tick, self.time, pose));
        }
        frames
    }

    fn shadow_inputs(&self, routed: &[Option<&PuppetInput>]) -> Vec<PuppetShadowInput> {
        self.puppets
            .iter()
            .zip(routed)
            .enumerate()
            .map(|(i, (slot, entry))| {
                let puppet = PuppetId::from_index(i);
                let thickness = match entry.map(|e| e.thickness) {
                    Some(t) if t.is_finite() => t,
                    Some(_) => {
                        let err = InputError::NonFiniteThickness(puppet);
                        tracing::warn!(%err, "using zero thickness");
                        0.0
                    }
                    None => 0.0,
                };
                let sigma = entry
                    .and_then(|e| e.sigma)
                    .filter(|s| s.is_finite() && *s >= 0.0);
                PuppetShadowInput {
                    puppet,
                    anchor: slot.rig.world_centroid(),
                    thickness,
                    sigma,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
