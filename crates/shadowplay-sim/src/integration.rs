//! End-to-end tests for the full tick pipeline.
//!
//! These exercise engine construction, IK with fallback, blending and
//! commit, lighting, safe-mode transitions and diagnostics together.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use nalgebra::{Point3, UnitQuaternion, Vector3};
    use shadowplay_core::condition::{DegradationLevel, TickCondition};
    use shadowplay_core::time::SimTime;
    use shadowplay_core::types::{ChainId, JointId, LightId, PuppetId};
    use shadowplay_ik::{IkSolverSet, SolveStatus, SolverConfig};
    use shadowplay_lighting::{LightSource, ShadowTier};
    use shadowplay_pose::{Cue, CueTrack, Easing, OverrideWeights, PoseFrame};
    use shadowplay_rig::{RigGraph, SolverKind};
    use shadowplay_test_utils::{
        ManualClock, ScriptedSolver, SteppingClock, arm_rig, cyclic_document, puppet_rig,
        random_targets,
    };

    use crate::builder::EngineBuilder;
    use crate::config::{EngineConfig, SafeModeConfig};
    use crate::engine::Engine;
    use crate::error::EngineError;
    use crate::safe_mode::SafeModeState;
    use crate::scheduler::{PuppetInput, TickInput, TickOutput};

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn all_joints(rig: &RigGraph, weight: f32) -> OverrideWeights {
        OverrideWeights::uniform((0..rig.joint_count()).map(JointId::from_index), weight)
    }

    fn end_effector(rig: &RigGraph, chain: ChainId) -> Point3<f32> {
        let chain = rig.chain(chain).unwrap();
        rig.world_position(chain.end_effector()).unwrap()
    }

    fn lantern() -> LightSource {
        LightSource::new(LightId(0), Point3::new(0.5, 1.0, 4.0), 0.5)
    }

    fn manual_engine(config: EngineConfig, rigs: Vec<RigGraph>) -> Engine {
        rigs.into_iter()
            .fold(
                EngineBuilder::new()
                    .with_config(config)
                    .with_clock(Arc::new(ManualClock::new())),
                EngineBuilder::with_rig,
            )
            .build()
            .unwrap()
    }

    /// A scripted session over the puppet rig: targets wander around each
    /// chain's rest end-effector.
    fn puppet_session(ticks: usize) -> Vec<TickInput> {
        let rig = puppet_rig();
        let weights = all_joints(&rig, 0.8);
        let per_chain: Vec<Vec<Point3<f32>>> = rig
            .chains()
            .iter()
            .map(|c| random_targets(u64::from(c.id.0) + 11, ticks, end_effector(&rig, c.id), 0.15))
            .collect();
        (0..ticks)
            .map(|t| {
                let mut puppet = PuppetInput::new(PuppetId(0))
                    .with_weights(weights.clone())
                    .with_thickness(0.05);
                if t % 4 == 0 {
                    for (c, targets) in per_chain.iter().enumerate() {
                        puppet = puppet.with_target(ChainId::from_index(c), targets[t]);
                    }
                }
                TickInput::new(FRAME)
                    .with_puppet(puppet)
                    .with_lights([lantern(), lantern().with_interference(true)])
            })
            .collect()
    }

    fn run(engine: &mut Engine, inputs: &[TickInput]) -> Vec<TickOutput> {
        inputs.iter().map(|input| engine.tick(input)).collect()
    }

    fn frame_bytes(outputs: &[TickOutput]) -> Vec<Vec<u8>> {
        outputs
            .iter()
            .flat_map(|o| o.frames.iter().map(PoseFrame::to_bytes))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Determinism
    // -----------------------------------------------------------------------

    #[test]
    fn identical_sessions_commit_identical_bytes() {
        let inputs = puppet_session(48);
        let mut a = manual_engine(EngineConfig::default(), vec![puppet_rig()]);
        let mut b = manual_engine(EngineConfig::default(), vec![puppet_rig()]);
        let out_a = run(&mut a, &inputs);
        let out_b = run(&mut b, &inputs);

        assert_eq!(frame_bytes(&out_a), frame_bytes(&out_b));
        for (x, y) in out_a.iter().zip(&out_b) {
            assert_eq!(x.shadows, y.shadows);
            assert_eq!(x.signals, y.signals);
        }
        assert_eq!(a.diagnostics(), b.diagnostics());
    }

    #[test]
    fn parallel_solve_matches_sequential() {
        let inputs = puppet_session(32);
        let mut parallel_config = EngineConfig::default();
        parallel_config.tick.parallel_solve = true;
        parallel_config.lighting.parallel = true;

        let mut seq = manual_engine(EngineConfig::default(), vec![puppet_rig(), arm_rig()]);
        let mut par = manual_engine(parallel_config, vec![puppet_rig(), arm_rig()]);
        let out_seq = run(&mut seq, &inputs);
        let out_par = run(&mut par, &inputs);

        assert_eq!(frame_bytes(&out_seq), frame_bytes(&out_par));
        for (x, y) in out_seq.iter().zip(&out_par) {
            assert_eq!(x.chains, y.chains);
            assert_eq!(x.shadows, y.shadows);
        }
    }

    #[test]
    fn one_frame_per_puppet_per_tick() {
        let inputs = puppet_session(10);
        let mut engine = manual_engine(EngineConfig::default(), vec![puppet_rig(), arm_rig()]);
        for (t, out) in run(&mut engine, &inputs).iter().enumerate() {
            assert_eq!(out.tick, t as u64);
            assert_eq!(out.frames.len(), 2);
            assert!(out.frames.iter().all(|f| f.tick() == t as u64));
        }
        assert_eq!(engine.diagnostics().ticks, 10);
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    #[test]
    fn arm_reaches_nearby_target_without_fallback() {
        let rig = arm_rig();
        let target = end_effector(&rig, ChainId(0)) + Vector3::new(0.0, -0.3, 0.0);
        let weights = all_joints(&rig, 1.0);
        let mut engine = manual_engine(EngineConfig::default(), vec![rig]);

        let out = engine.tick(
            &TickInput::new(FRAME).with_puppet(
                PuppetInput::new(PuppetId(0))
                    .with_target(ChainId(0), target)
                    .with_weights(weights),
            ),
        );
        let report = out.chains[0];
        assert!(report.converged);
        assert_eq!(report.solver_used, SolverKind::Fabrik);
        assert!(!report.fell_back_to_ccd);
        assert!(report.iterations <= 12, "took {} iterations", report.iterations);

        let tip = end_effector(engine.rig(PuppetId(0)).unwrap(), ChainId(0));
        assert!((tip - target).norm() < 1e-2);
    }

    #[test]
    fn diverging_fabrik_falls_back_to_ccd_in_the_same_tick() {
        let rig = arm_rig();
        let rest = rig.rest_pose().clone();
        let chain_joints = rig.chains()[0].joints.clone();
        let weights = all_joints(&rig, 1.0);
        let (fabrik, fabrik_calls) =
            ScriptedSolver::new(SolverKind::Fabrik, SolveStatus::Diverged, 3).boxed();
        let (ccd, ccd_calls) =
            ScriptedSolver::new(SolverKind::Ccd, SolveStatus::Converged, 5).boxed();
        let solvers =
            IkSolverSet::new(SolverConfig::default()).with_solvers(Some(fabrik), Some(ccd), None);
        let mut engine = EngineBuilder::new()
            .with_clock(Arc::new(ManualClock::new()))
            .with_solvers(solvers)
            .with_rig(rig)
            .build()
            .unwrap();

        let out = engine.tick(
            &TickInput::new(FRAME).with_puppet(
                PuppetInput::new(PuppetId(0))
                    .with_target(ChainId(0), Point3::new(1.0, 2.0, 0.0))
                    .with_weights(weights),
            ),
        );
        assert_eq!(fabrik_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ccd_calls.load(Ordering::SeqCst), 1);
        let report = out.chains[0];
        assert!(report.fell_back_to_ccd);
        assert_eq!(report.solver_used, SolverKind::Ccd);
        assert!(report.converged);
        assert_eq!(report.iterations, 8);
        assert!(out.signals.is_empty());
        assert_eq!(engine.diagnostics().ccd_fallbacks, 1);

        // The committed chain carries the CCD result, which twisted the
        // rest rotations once.
        let twist = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1);
        let pose = out.frames[0].pose();
        for joint in chain_joints {
            let expected = twist * rest.get(joint).unwrap();
            assert!(pose.get(joint).unwrap().angle_to(&expected) < 1e-5);
        }
    }

    #[test]
    fn unsolvable_chain_holds_and_signals() {
        let rig = arm_rig();
        let before = rig.rest_pose().clone();
        let weights = all_joints(&rig, 1.0);
        let (fabrik, _) = ScriptedSolver::new(SolverKind::Fabrik, SolveStatus::Diverged, 3).boxed();
        let (ccd, _) = ScriptedSolver::new(SolverKind::Ccd, SolveStatus::Exhausted, 20).boxed();
        let solvers = IkSolverSet::default().with_solvers(Some(fabrik), Some(ccd), None);
        let mut engine = EngineBuilder::new()
            .with_clock(Arc::new(ManualClock::new()))
            .with_solvers(solvers)
            .with_rig(rig)
            .build()
            .unwrap();

        let out = engine.tick(
            &TickInput::new(FRAME).with_puppet(
                PuppetInput::new(PuppetId(0))
                    .with_target(ChainId(0), Point3::new(50.0, 0.0, 0.0))
                    .with_weights(weights),
            ),
        );
        assert_eq!(
            out.signals,
            vec![TickCondition::DivergentIk {
                puppet: PuppetId(0),
                chain: ChainId(0),
                iterations: 23,
            }]
        );
        assert_eq!(out.frames[0].pose(), &before);
        assert_eq!(engine.diagnostics().divergent_ik_total, 1);
    }

    #[test]
    fn lantern_scenario_penumbra() {
        let rig = arm_rig();
        let centroid = rig.world_centroid();
        // Lantern 4 units above the puppet, shadow plane 2 units below it.
        let mut config = EngineConfig::default();
        config.lighting.shadow_plane.point = [0.0, 0.0, centroid.z + 2.0];
        let light = LightSource::new(LightId(3), centroid + Vector3::new(0.0, 0.0, 4.0), 0.5);
        let mut engine = manual_engine(config, vec![rig]);

        let dark = engine.tick(&TickInput::new(FRAME));
        assert!(dark.shadows.params.is_empty());

        let out = engine.tick(&TickInput::new(FRAME).with_lights([light]));
        let params = out.shadows.params[0];
        assert_eq!(params.light, LightId(3));
        assert_eq!(params.puppet, PuppetId(0));
        assert!((params.penumbra_radius - 1.0).abs() < 1e-4);
        assert!((params.transmission - 1.0).abs() < f32::EPSILON);
        assert_eq!(params.kernel_size, 1);
    }

    #[test]
    fn sustained_overruns_degrade_and_disable_interference() {
        let mut config = EngineConfig::default();
        config.lighting.interference = true;
        let clock = SteppingClock::shared(Duration::ZERO);
        let mut engine = EngineBuilder::new()
            .with_config(config)
            .with_clock(clock.clone())
            .with_rig(arm_rig())
            .build()
            .unwrap();
        let input = TickInput::new(FRAME).with_lights([lantern().with_interference(true)]);

        let calm = engine.tick(&input);
        assert!(calm.shadows.interference);
        assert_eq!(calm.shadows.tier, ShadowTier::Full);

        clock.set_step(Duration::from_millis(10));
        let threshold = SafeModeConfig::default().budget_threshold;
        let mut last = None;
        for _ in 0..threshold {
            let out = engine.tick(&input);
            assert!(out.budget_exceeded());
            assert_eq!(out.mode, SafeModeState::Normal);
            last = Some(out);
        }
        let last = last.unwrap();
        assert!(last.signals.contains(&TickCondition::SustainedDegradation {
            level: DegradationLevel::ReducedShadows
        }));
        assert_eq!(engine.state(), SafeModeState::Degraded(DegradationLevel::ReducedShadows));

        clock.set_step(Duration::ZERO);
        let next = engine.tick(&input);
        assert!(!next.budget_exceeded());
        assert_eq!(next.mode, SafeModeState::Degraded(DegradationLevel::ReducedShadows));
        assert!(!next.shadows.interference);
        assert_eq!(next.shadows.tier, ShadowTier::Reduced);
        assert!(next.shadows.params.iter().all(|p| p.kernel_size <= 5));
        assert_eq!(engine.diagnostics().frame_budget_exceeded_total, u64::from(threshold));
    }

    #[test]
    fn recovers_after_a_clean_window() {
        let config = EngineConfig {
            safe_mode: SafeModeConfig {
                window: 20,
                budget_threshold: 4,
                ..SafeModeConfig::default()
            },
            ..EngineConfig::default()
        };
        let clock = SteppingClock::shared(Duration::from_millis(10));
        let mut engine = EngineBuilder::new()
            .with_config(config)
            .with_clock(clock.clone())
            .with_rig(arm_rig())
            .build()
            .unwrap();
        let input = TickInput::new(FRAME);
        for _ in 0..4 {
            engine.tick(&input);
        }
        assert!(engine.state().is_degraded());

        clock.set_step(Duration::ZERO);
        let mut recovered_at = None;
        for t in 1..=40 {
            engine.tick(&input);
            if engine.state() == SafeModeState::Normal {
                recovered_at = Some(t);
                break;
            }
        }
        assert_eq!(recovered_at, Some(20));
        assert_eq!(engine.controller().transitions(), 2);
        assert_eq!(engine.diagnostics().safe_mode_transitions, 2);
    }

    #[test]
    fn cyclic_rig_is_rejected_before_any_tick() {
        let result = EngineBuilder::new().with_rig_str(cyclic_document());
        assert!(matches!(result, Err(EngineError::Rig(_))));
    }

    // -----------------------------------------------------------------------
    // Cues and time
    // -----------------------------------------------------------------------

    #[test]
    fn cue_track_drives_targets() {
        let rig = arm_rig();
        let start = end_effector(&rig, ChainId(0));
        let end = start + Vector3::new(-0.3, -0.3, 0.0);
        let weights = all_joints(&rig, 1.0);
        let track = CueTrack::new(vec![Cue {
            chain: ChainId(0),
            from: start.coords.into(),
            to: end.coords.into(),
            start: 0.0,
            duration: 0.25,
            easing: Easing::EaseInOutCubic,
        }]);
        track.validate().unwrap();

        let mut engine = manual_engine(EngineConfig::default(), vec![rig]);
        let mut time = SimTime::ZERO;
        for _ in 0..40 {
            time += FRAME;
            let puppet = PuppetInput::new(PuppetId(0))
                .with_targets(track.targets_at(time))
                .with_weights(weights.clone());
            engine.tick(&TickInput::new(FRAME).with_puppet(puppet));
        }
        assert_eq!(engine.scheduler().time(), time);
        let tip = end_effector(engine.rig(PuppetId(0)).unwrap(), ChainId(0));
        assert!((tip - end).norm() < 2e-2, "tip {tip:?} end {end:?}");
    }

    #[test]
    fn lighting_light_budget_is_respected() {
        let mut config = EngineConfig::default();
        config.lighting.max_lights = 32;
        let mut engine = manual_engine(config, vec![arm_rig(), puppet_rig()]);
        let lights: Vec<LightSource> = (0..40)
            .map(|i| LightSource::new(LightId(i), Point3::new(0.0, 0.0, 3.0 + i as f32 * 0.1), 0.2))
            .collect();
        let out = engine.tick(&TickInput::new(FRAME).with_lights(lights));
        assert_eq!(out.shadows.params.len(), 64);
        assert!(out.shadows.params.iter().all(|p| p.light.0 < 32));
    }
}
