//! Headless performance runner
//!
//! Drives a [`PerformanceOrchestrator`] against the simulated rig at a fixed
//! frame rate, the way a render loop would, and reports what happened.

use anyhow::{bail, Context, Result};
use facecast_core::sim::SimRig;
use facecast_core::{ClipPlayer, FacecastConfig, PerformanceOrchestrator, TimelineMode};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Sample rate of the synthesized clip
const SYNTH_SAMPLE_RATE: u32 = 16_000;

/// Runner settings from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dialogue clip; a synthesized voice is used when absent
    pub wav: Option<PathBuf>,
    /// Length of the synthesized clip in seconds
    pub clip_length: f64,
    /// Frames per second
    pub fps: u32,
    /// Play requests fired before the first frame
    pub plays: u32,
    /// Clip length reported by simulated animator states
    pub state_length: f64,
    /// Blendshapes on the simulated mesh
    pub blendshapes: usize,
    /// Give up after this much simulated time
    pub max_seconds: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            wav: None,
            clip_length: 9.0,
            fps: 60,
            plays: 1,
            state_length: 1.5,
            blendshapes: 16,
            max_seconds: 600.0,
        }
    }
}

/// Outcome of a headless run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Runs started, including queued re-runs
    pub runs: u64,
    /// Frames ticked
    pub frames: u64,
    /// Simulated seconds
    pub seconds: f64,
    /// Largest mouth weight written
    pub peak_mouth: f32,
    /// Every status text shown, oldest first
    pub statuses: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} run(s), {} frames, {:.2}s simulated",
            self.runs, self.frames, self.seconds
        )?;
        writeln!(f, "peak mouth weight: {:.1}", self.peak_mouth)?;
        write!(f, "status: {}", self.statuses.join(" -> "))
    }
}

fn load_clip(options: &RunOptions) -> Result<ClipPlayer> {
    match &options.wav {
        Some(path) => ClipPlayer::from_wav(path)
            .with_context(|| format!("Failed to load clip {:?}", path)),
        None => {
            if !(options.clip_length.is_finite() && options.clip_length >= 0.0) {
                bail!("clip length must be non-negative, got {}", options.clip_length);
            }
            Ok(ClipPlayer::synthesized_voice(
                options.clip_length,
                SYNTH_SAMPLE_RATE,
            ))
        }
    }
}

/// Run until the orchestrator returns to idle
pub fn run(options: &RunOptions, config: &FacecastConfig) -> Result<RunSummary> {
    if options.fps == 0 {
        bail!("fps must be positive");
    }

    let clip = load_clip(options)?;
    let sim = SimRig::new(clip, options.blendshapes);
    if config.timeline.mode == TimelineMode::AnimationDriven {
        // Let each phase cue move the simulated animator into its state
        for phase in &config.timeline.state_phases {
            if let Some(cue) = &phase.cue {
                sim.animator
                    .map_trigger(cue, &phase.state, options.state_length);
            }
        }
    }

    let mut orchestrator = PerformanceOrchestrator::new(sim.rig(), config)
        .context("Failed to set up performance")?;

    let dt = 1.0 / options.fps as f64;
    info!(
        "Running {:.2}s clip at {} fps, {} request(s)",
        sim.audio.duration(),
        options.fps,
        options.plays
    );
    for _ in 0..options.plays {
        orchestrator.request_play();
    }

    let mut frames = 0u64;
    let mut seconds = 0.0f64;
    let mut peak_mouth = 0.0f32;
    let mut shown = 0;
    while orchestrator.is_running() {
        if seconds >= options.max_seconds {
            warn!("Stopping after {:.0}s of simulated time", seconds);
            break;
        }

        sim.audio.advance(dt);
        orchestrator.tick(dt);
        frames += 1;
        seconds += dt;
        peak_mouth = peak_mouth.max(orchestrator.mouth_value());

        let history = sim.status.history();
        for text in &history[shown..] {
            info!("[{:7.3}s] {}", seconds, text);
        }
        shown = history.len();
    }

    Ok(RunSummary {
        runs: orchestrator.runs_started(),
        frames,
        seconds,
        peak_mouth,
        statuses: sim.status.history(),
    })
}
