//! Runs the files under `demos/` through the public engine API.

use std::path::PathBuf;
use std::sync::Arc;

use shadowplay_core::config::read_toml;
use shadowplay_core::time::SimTime;
use shadowplay_core::types::{JointId, LightId, PuppetId};
use shadowplay_lighting::LightSource;
use shadowplay_pose::{CueTrack, OverrideWeights};
use shadowplay_sim::{EngineBuilder, EngineConfig, PuppetInput, TickInput};
use shadowplay_test_utils::ManualClock;

use nalgebra::Point3;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn demo_config_parses() {
    let config = EngineConfig::from_file(demo("shadowplay.toml")).unwrap();
    assert!(config.tick.parallel_solve);
    assert!(config.lighting.interference);
    assert_eq!(config.safe_mode.budget_threshold, 12);
}

#[test]
fn demo_session_runs_clean() {
    let cues: CueTrack = read_toml(demo("cues.toml")).unwrap();
    cues.validate().unwrap();
    assert_eq!(cues.cues.len(), 2);

    let mut engine = EngineBuilder::new()
        .with_config_file(demo("shadowplay.toml"))
        .unwrap()
        .with_rig_file(demo("puppet.rig.json"))
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();
    let rig = engine.rig(PuppetId(0)).unwrap();
    let weights = OverrideWeights::uniform((0..rig.joint_count()).map(JointId::from_index), 1.0);
    let delta = engine.scheduler().config().commit_interval();
    let light = LightSource::new(LightId(0), Point3::new(0.0, 1.0, 4.0), 0.5);

    let mut time = SimTime::ZERO;
    for _ in 0..150 {
        time += delta;
        let input = TickInput::new(delta).with_lights([light]).with_puppet(
            PuppetInput::new(PuppetId(0))
                .with_targets(cues.targets_at(time))
                .with_weights(weights.clone())
                .with_thickness(0.05),
        );
        let output = engine.tick(&input);
        assert_eq!(output.frames.len(), 1);
        assert_eq!(output.shadows.params.len(), 1);
        assert!(output.shadows.params[0].penumbra_radius.is_finite());
    }

    let diagnostics = engine.diagnostics();
    assert_eq!(diagnostics.ticks, 150);
    assert_eq!(diagnostics.ik_ticks, 75);
    assert!(diagnostics.chain_solves >= 75);
    assert_eq!(diagnostics.frame_budget_exceeded_total, 0);
    assert_eq!(diagnostics.safe_mode, engine.state());
    assert!(diagnostics.to_json().unwrap().contains("\"ik_ticks\": 75"));
}
