//! Performance orchestration
//!
//! Owns the play lifecycle of one character. A run starts on a play request,
//! drives the emotion timeline and the mouth estimator once per host tick,
//! and ends when both the audio and the timeline are finished. Requests that
//! arrive mid-run are coalesced into a single queued re-run.

use crate::config::{FacecastConfig, RigConfig};
use crate::emotion::{Emotion, ExpressionSet};
use crate::lip_sync::MouthSignalEstimator;
use crate::rig::Rig;
use crate::timeline::{PhaseChange, Timeline, TimelineCursor, TimelineStatus, TimePoint};
use crate::Result;
use tracing::{debug, info};

/// Status text while a run is starting
pub const STATUS_SPEAKING: &str = "Speaking...";
/// Status text between runs
pub const STATUS_IDLE: &str = "Idle";

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    /// No run in flight; mouth closed, face neutral
    #[default]
    Idle,
    /// A run is in flight
    Running,
}

/// Play/stop state machine for one character
#[derive(Debug)]
pub struct PerformanceOrchestrator {
    rig: Rig,
    estimator: MouthSignalEstimator,
    timeline: Timeline,
    expressions: ExpressionSet,
    rig_config: RigConfig,
    state: OrchestratorState,
    queued: bool,
    cursor: TimelineCursor,
    runs_started: u64,
}

impl PerformanceOrchestrator {
    /// Build from a validated configuration
    pub fn new(rig: Rig, config: &FacecastConfig) -> Result<Self> {
        config.validate()?;
        let timeline = config.timeline.build()?;
        Ok(Self::with_parts(
            rig,
            MouthSignalEstimator::new(config.lip_sync.clone()),
            timeline,
            config.expressions.clone(),
            config.rig.clone(),
        ))
    }

    /// Assemble from parts. Puts the rig into its idle presentation.
    pub fn with_parts(
        rig: Rig,
        estimator: MouthSignalEstimator,
        timeline: Timeline,
        expressions: ExpressionSet,
        rig_config: RigConfig,
    ) -> Self {
        let mut orchestrator = Self {
            rig,
            estimator,
            timeline,
            expressions,
            rig_config,
            state: OrchestratorState::Idle,
            queued: false,
            cursor: TimelineCursor::new(),
            runs_started: 0,
        };
        orchestrator.rig.set_status(STATUS_IDLE);
        orchestrator.reset_expression_layer();
        orchestrator
    }

    /// Lifecycle state
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.state == OrchestratorState::Running
    }

    /// Whether a re-run is pending
    pub fn is_queued(&self) -> bool {
        self.queued
    }

    /// Emotion currently on the expression layer
    pub fn current_emotion(&self) -> Emotion {
        match self.state {
            OrchestratorState::Idle => Emotion::Neutral,
            OrchestratorState::Running => self.cursor.current_emotion(&self.timeline),
        }
    }

    /// Runs started since construction, including queued re-runs
    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    /// Seconds since the current run started
    pub fn elapsed(&self) -> TimePoint {
        self.cursor.elapsed()
    }

    /// Current mouth weight
    pub fn mouth_value(&self) -> f32 {
        self.estimator.current_value()
    }

    /// Mouth estimator
    pub fn estimator(&self) -> &MouthSignalEstimator {
        &self.estimator
    }

    /// Emotion timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Collaborators
    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    /// Collaborators, mutably
    pub fn rig_mut(&mut self) -> &mut Rig {
        &mut self.rig
    }

    /// Handle a play request.
    ///
    /// Idle: starts a run immediately. Running: remembers one pending request;
    /// further requests are dropped until that one is consumed.
    pub fn request_play(&mut self) {
        match self.state {
            OrchestratorState::Idle => self.enter_running(),
            OrchestratorState::Running if self.queued => {
                debug!("Play request dropped, one already queued");
            }
            OrchestratorState::Running => {
                self.queued = true;
                debug!("Play request queued behind current run");
            }
        }
    }

    /// Advance one host frame.
    ///
    /// Steps the timeline and the mouth estimator, then ends the run once the
    /// timeline is done and the audio has stopped. A queued request starts the
    /// next run within the same tick. Elapsed time accumulates at `f64`; only
    /// the estimator sees the step as `f32`.
    pub fn tick(&mut self, dt: TimePoint) -> OrchestratorState {
        if self.state != OrchestratorState::Running {
            return self.state;
        }

        let change = self
            .cursor
            .step(&self.timeline, dt, self.rig.animator.as_ref());
        if let Some(change) = change {
            self.apply_phase_change(change);
        }

        let (audio, mesh) = self.rig.playback_and_mesh();
        self.estimator.step(dt as f32, audio, mesh);

        if self.cursor.status() == TimelineStatus::Done && !self.rig.audio.is_playing() {
            self.exit_running();
            if self.queued {
                self.queued = false;
                debug!("Starting queued run");
                self.enter_running();
            }
        }

        self.state
    }

    fn enter_running(&mut self) {
        self.state = OrchestratorState::Running;
        self.queued = false;
        self.runs_started += 1;
        info!("Performance run {} started", self.runs_started);

        self.rig.animator.play_state(&self.rig_config.rest_state);
        for cue in self.timeline.cues() {
            self.rig.animator.reset_trigger(cue);
        }

        self.reset_expression_layer();
        self.rig.clear_blendshapes();

        let audio = self.rig.audio.as_mut();
        audio.stop();
        audio.seek(0.0);
        audio.play();

        self.estimator
            .arm(Some(self.rig.audio.as_ref()), self.rig.mesh.as_deref());
        self.rig.set_status(STATUS_SPEAKING);

        self.cursor = TimelineCursor::new();
        if let Some(change) = self
            .cursor
            .step(&self.timeline, 0.0, self.rig.animator.as_ref())
        {
            self.apply_phase_change(change);
        }
    }

    fn exit_running(&mut self) {
        self.estimator.disarm(self.rig.mesh_mut());
        self.reset_expression_layer();
        self.rig.clear_blendshapes();
        self.rig.set_status(STATUS_IDLE);
        self.state = OrchestratorState::Idle;
        info!(
            "Performance run {} finished after {:.2}s",
            self.runs_started,
            self.cursor.elapsed()
        );
    }

    fn apply_phase_change(&mut self, change: PhaseChange) {
        match change {
            PhaseChange::Entered {
                index,
                emotion,
                cue,
            } => {
                debug!(
                    "Phase {} ({}) at {:.2}s",
                    index,
                    emotion,
                    self.cursor.elapsed()
                );
                self.rig.apply_expression(
                    self.expressions.expression_for(emotion),
                    &self.expressions.default,
                    self.rig_config.expression_layer,
                );
                self.rig.set_status(emotion.status_label());
                if let Some(cue) = cue {
                    self.rig.animator.set_trigger(&cue);
                }
            }
            PhaseChange::Settled => {
                debug!("Timeline settled at {:.2}s", self.cursor.elapsed());
                self.reset_expression_layer();
                self.rig.set_status(Emotion::Neutral.status_label());
            }
        }
    }

    fn reset_expression_layer(&mut self) {
        self.rig.reset_expression_layer(
            &self.expressions.default,
            self.rig_config.expression_layer,
        );
    }
}
