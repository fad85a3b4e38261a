//! Shadowplay command-line runner.
//!
//! Provides three modes of operation:
//! - `validate`: Load rig documents and report schema errors
//! - `run`: Tick an engine headlessly and print diagnostics as JSON
//! - `info`: Print crate versions and default configuration

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use nalgebra::Point3;
use tracing_subscriber::EnvFilter;

use shadowplay_core::config::read_toml;
use shadowplay_core::time::SimTime;
use shadowplay_core::types::{JointId, LightId, PuppetId};
use shadowplay_lighting::LightSource;
use shadowplay_pose::{CueTrack, OverrideWeights};
use shadowplay_rig::parse_file;
use shadowplay_sim::{Engine, EngineBuilder, EngineConfig, EngineError, PuppetInput, TickInput};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Deterministic rig-and-lighting tick engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load rig documents and report whether they are valid.
    Validate {
        /// Rig JSON files.
        #[arg(required = true)]
        rigs: Vec<PathBuf>,
    },

    /// Tick an engine headlessly and print diagnostics.
    Run {
        /// Rig JSON files, one puppet each.
        #[arg(required = true)]
        rigs: Vec<PathBuf>,

        /// Number of ticks to run.
        #[arg(short = 'n', long, default_value_t = 600)]
        ticks: u64,

        /// Engine configuration (TOML).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cue track driving chain targets (TOML).
        #[arg(long)]
        cues: Option<PathBuf>,

        /// Number of lanterns placed in a ring above the stage.
        #[arg(short, long, default_value_t = 1)]
        lights: u32,

        /// IK override weight applied to every joint.
        #[arg(short = 'w', long, default_value_t = 1.0)]
        ik_weight: f32,

        /// Occluder thickness for every puppet.
        #[arg(long, default_value_t = 0.05)]
        thickness: f32,
    },

    /// Print crate information and the default configuration.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_validate(rigs: &[PathBuf]) -> ExitCode {
    let mut failed = false;
    for path in rigs {
        match parse_file(path) {
            Ok(rig) => println!(
                "{}: ok ({} joints, {} chains)",
                path.display(),
                rig.joint_count(),
                rig.chains().len()
            ),
            Err(e) => {
                println!("{}: {e}", path.display());
                failed = true;
            }
        }
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Lanterns spread evenly on a ring of radius 1.5 at height 4.
#[allow(clippy::cast_precision_loss)]
fn lantern_ring(count: u32) -> Vec<LightSource> {
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count.max(1) as f32;
            LightSource::new(
                LightId(i),
                Point3::new(1.5 * angle.cos(), 1.5 * angle.sin(), 4.0),
                0.5,
            )
        })
        .collect()
}

struct RunOptions<'a> {
    rigs: &'a [PathBuf],
    ticks: u64,
    config: Option<&'a Path>,
    cues: Option<&'a Path>,
    lights: u32,
    ik_weight: f32,
    thickness: f32,
}

fn build_engine(opts: &RunOptions<'_>) -> Result<(Engine, CueTrack), EngineError> {
    let config = match opts.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let cues: CueTrack = match opts.cues {
        Some(path) => read_toml(path)?,
        None => CueTrack::default(),
    };
    cues.validate()?;

    let mut builder = EngineBuilder::new().with_config(config);
    for path in opts.rigs {
        builder = builder.with_rig_file(path)?;
    }
    Ok((builder.build()?, cues))
}

fn run_headless(opts: &RunOptions<'_>) -> Result<(), EngineError> {
    let (mut engine, cues) = build_engine(opts)?;
    let delta = engine.scheduler().config().commit_interval();
    let lights = lantern_ring(opts.lights);

    let weights: Vec<OverrideWeights> = (0..engine.puppet_count())
        .filter_map(|p| engine.rig(PuppetId::from_index(p)))
        .map(|rig| {
            OverrideWeights::uniform(
                (0..rig.joint_count()).map(JointId::from_index),
                opts.ik_weight,
            )
        })
        .collect();
    let chain_counts: Vec<usize> = (0..engine.puppet_count())
        .filter_map(|p| engine.rig(PuppetId::from_index(p)))
        .map(|rig| rig.chains().len())
        .collect();

    let mut time = SimTime::ZERO;
    for _ in 0..opts.ticks {
        time += delta;
        let targets = cues.targets_at(time);
        let mut input = TickInput::new(delta).with_lights(lights.iter().copied());
        for (p, weights) in weights.iter().enumerate() {
            let chains = chain_counts[p];
            input = input.with_puppet(
                PuppetInput::new(PuppetId::from_index(p))
                    .with_targets(targets.iter().copied().filter(|t| t.chain.index() < chains))
                    .with_weights(weights.clone())
                    .with_thickness(opts.thickness),
            );
        }
        let output = engine.tick(&input);
        for signal in &output.signals {
            tracing::debug!(tick = output.tick, %signal, "condition");
        }
    }

    let diagnostics = engine.diagnostics();
    tracing::info!(
        ticks = diagnostics.ticks,
        safe_mode = %diagnostics.safe_mode,
        "run complete"
    );
    match diagnostics.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize diagnostics: {e}"),
    }
    Ok(())
}

fn run_info() {
    println!("shadowplay v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  shadowplay-core      {}", env!("CARGO_PKG_VERSION"));
    println!("  shadowplay-rig       {}", env!("CARGO_PKG_VERSION"));
    println!("  shadowplay-ik        {}", env!("CARGO_PKG_VERSION"));
    println!("  shadowplay-pose      {}", env!("CARGO_PKG_VERSION"));
    println!("  shadowplay-lighting  {}", env!("CARGO_PKG_VERSION"));
    println!("  shadowplay-sim       {}", env!("CARGO_PKG_VERSION"));
    println!();
    let config = EngineConfig::default();
    println!(
        "defaults: commit {} Hz, ik {} Hz, cpu budget {} ms, max lights {}",
        config.tick.commit_hz,
        config.tick.ik_hz,
        config.tick.cpu_budget_ms,
        config.lighting.max_lights
    );
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Validate { rigs }) => run_validate(&rigs),
        Some(Commands::Run {
            rigs,
            ticks,
            config,
            cues,
            lights,
            ik_weight,
            thickness,
        }) => {
            let opts = RunOptions {
                rigs: &rigs,
                ticks,
                config: config.as_deref(),
                cues: cues.as_deref(),
                lights,
                ik_weight,
                thickness,
            };
            match run_headless(&opts) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Info) | None => {
            run_info();
            ExitCode::SUCCESS
        }
    }
}
