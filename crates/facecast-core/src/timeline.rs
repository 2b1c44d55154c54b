//! Emotion Timeline - Phase Sequencing Against Run Time
//!
//! A timeline is an ordered list of phases, each an emotion plus an optional
//! body-animation cue. Two flavours exist:
//! - [`EmotionTimeline`]: phases end at fixed cumulative times
//! - [`StateTimeline`]: each phase waits for the animator to report a named
//!   state, then holds for that state's clip length
//!
//! Neither suspends. A [`TimelineCursor`] is stepped once per frame and
//! reports the phase changes the orchestrator must apply.

use crate::emotion::Emotion;
use crate::rig::Animator;
use crate::{FaceError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Time in seconds
pub type TimePoint = f64;

/// One fixed-schedule phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionPhase {
    /// Emotion held during the phase
    pub emotion: Emotion,
    /// Trigger raised once on phase entry
    #[serde(default)]
    pub cue: Option<String>,
    /// Cumulative end time from run start
    pub end_time: TimePoint,
}

impl EmotionPhase {
    /// Phase with the emotion's conventional cue
    pub fn new(emotion: Emotion, end_time: TimePoint) -> Self {
        Self {
            emotion,
            cue: emotion.default_cue().map(str::to_string),
            end_time,
        }
    }
}

/// Fixed-schedule timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionTimeline {
    phases: Vec<EmotionPhase>,
}

impl EmotionTimeline {
    /// Build and validate a timeline.
    ///
    /// End times must be finite, non-negative and strictly increasing.
    pub fn new(phases: Vec<EmotionPhase>) -> Result<Self> {
        let mut previous: Option<TimePoint> = None;
        for (i, phase) in phases.iter().enumerate() {
            if !phase.end_time.is_finite() || phase.end_time < 0.0 {
                return Err(FaceError::InvalidTimeline(format!(
                    "phase {} has invalid end time {}",
                    i, phase.end_time
                )));
            }
            if let Some(prev) = previous {
                if phase.end_time <= prev {
                    return Err(FaceError::InvalidTimeline(format!(
                        "phase {} ends at {}s, not after the previous phase ({}s)",
                        i, phase.end_time, prev
                    )));
                }
            }
            previous = Some(phase.end_time);
        }
        Ok(Self { phases })
    }

    /// Happy until 1.40s, Sad until 3.20s, Happy until 5.20s, SoftSad until
    /// 7.50s, Neutral afterwards
    pub fn reference() -> Self {
        Self {
            phases: reference_phases(),
        }
    }

    /// Configured phases in order
    pub fn phases(&self) -> &[EmotionPhase] {
        &self.phases
    }

    /// Index of the first phase whose end time exceeds `elapsed`.
    ///
    /// An elapsed time exactly on a boundary belongs to the later phase.
    pub fn phase_index_at(&self, elapsed: TimePoint) -> Option<usize> {
        self.phases.iter().position(|p| p.end_time > elapsed)
    }

    /// Emotion shown at `elapsed`; Neutral once the schedule is exhausted
    pub fn emotion_at(&self, elapsed: TimePoint) -> Emotion {
        self.phase_index_at(elapsed)
            .map(|i| self.phases[i].emotion)
            .unwrap_or(Emotion::Neutral)
    }

    /// Time at which the schedule settles to Neutral
    pub fn duration(&self) -> TimePoint {
        self.phases.last().map(|p| p.end_time).unwrap_or(0.0)
    }
}

pub(crate) fn reference_phases() -> Vec<EmotionPhase> {
    vec![
        EmotionPhase::new(Emotion::Happy, 1.40),
        EmotionPhase::new(Emotion::Sad, 3.20),
        EmotionPhase::new(Emotion::Happy, 5.20),
        EmotionPhase::new(Emotion::SoftSad, 7.50),
    ]
}

/// One animation-driven phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatePhase {
    /// Emotion held during the phase
    pub emotion: Emotion,
    /// Trigger raised once on phase entry
    #[serde(default)]
    pub cue: Option<String>,
    /// Animator state name that starts the hold
    pub state: String,
}

impl StatePhase {
    /// Phase with the emotion's conventional cue
    pub fn new(emotion: Emotion, state: impl Into<String>) -> Self {
        Self {
            emotion,
            cue: emotion.default_cue().map(str::to_string),
            state: state.into(),
        }
    }
}

/// Animation-driven timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTimeline {
    phases: Vec<StatePhase>,
    /// Longest wait for a phase's state before skipping it
    state_timeout: TimePoint,
}

impl StateTimeline {
    /// Build a timeline; `state_timeout` must be positive and finite
    pub fn new(phases: Vec<StatePhase>, state_timeout: TimePoint) -> Result<Self> {
        if !state_timeout.is_finite() || state_timeout <= 0.0 {
            return Err(FaceError::InvalidTimeline(format!(
                "state timeout must be positive, got {}",
                state_timeout
            )));
        }
        if let Some(i) = phases.iter().position(|p| p.state.is_empty()) {
            return Err(FaceError::InvalidTimeline(format!(
                "phase {} has an empty state name",
                i
            )));
        }
        Ok(Self {
            phases,
            state_timeout,
        })
    }

    /// Configured phases in order
    pub fn phases(&self) -> &[StatePhase] {
        &self.phases
    }

    /// Wait limit per phase
    pub fn state_timeout(&self) -> TimePoint {
        self.state_timeout
    }
}

/// Either timeline flavour
#[derive(Debug, Clone, PartialEq)]
pub enum Timeline {
    /// Fixed schedule
    Scheduled(EmotionTimeline),
    /// Animator-reported states and clip lengths
    AnimationDriven(StateTimeline),
}

impl Default for Timeline {
    fn default() -> Self {
        Timeline::Scheduled(EmotionTimeline::reference())
    }
}

impl Timeline {
    /// Number of phases
    pub fn len(&self) -> usize {
        match self {
            Timeline::Scheduled(t) => t.phases.len(),
            Timeline::AnimationDriven(t) => t.phases.len(),
        }
    }

    /// Whether there are no phases at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emotion and cue of phase `index`
    pub fn phase(&self, index: usize) -> Option<(Emotion, Option<&str>)> {
        match self {
            Timeline::Scheduled(t) => t
                .phases
                .get(index)
                .map(|p| (p.emotion, p.cue.as_deref())),
            Timeline::AnimationDriven(t) => t
                .phases
                .get(index)
                .map(|p| (p.emotion, p.cue.as_deref())),
        }
    }

    /// Distinct cue names in first-use order
    pub fn cues(&self) -> Vec<&str> {
        let mut cues: Vec<&str> = Vec::new();
        for (_, cue) in (0..self.len()).filter_map(|i| self.phase(i)) {
            if let Some(cue) = cue {
                if !cues.contains(&cue) {
                    cues.push(cue);
                }
            }
        }
        cues
    }
}

/// Continuation status of a stepped timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineStatus {
    /// More phases to come
    Running,
    /// Settled to Neutral; nothing further will change
    Done,
}

/// A change the caller must apply to the rig
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseChange {
    /// A new phase started
    Entered {
        /// Phase index
        index: usize,
        /// Emotion to show
        emotion: Emotion,
        /// Trigger to raise
        cue: Option<String>,
    },
    /// The last phase ended; return to Neutral
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StateWait {
    /// Waiting for the animator to report the phase's state
    Entering { waited: TimePoint },
    /// State seen; holding for the rest of its clip
    Holding { remaining: TimePoint },
}

/// Per-run playback position within a [`Timeline`]
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCursor {
    elapsed: TimePoint,
    active: Option<usize>,
    status: TimelineStatus,
    wait: StateWait,
}

impl Default for TimelineCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineCursor {
    /// Cursor at run start, no phase applied yet
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            active: None,
            status: TimelineStatus::Running,
            wait: StateWait::Entering { waited: 0.0 },
        }
    }

    /// Seconds since run start
    pub fn elapsed(&self) -> TimePoint {
        self.elapsed
    }

    /// Continuation status
    pub fn status(&self) -> TimelineStatus {
        self.status
    }

    /// Index of the phase currently applied
    pub fn active_phase(&self) -> Option<usize> {
        self.active
    }

    /// Emotion currently applied
    pub fn current_emotion(&self, timeline: &Timeline) -> Emotion {
        self.active
            .and_then(|i| timeline.phase(i))
            .map(|(emotion, _)| emotion)
            .unwrap_or(Emotion::Neutral)
    }

    /// Advance by `dt` seconds and report at most one change.
    ///
    /// Call with `dt = 0.0` at run start to enter the first phase. Once the
    /// status is [`TimelineStatus::Done`] this always returns `None`.
    pub fn step(
        &mut self,
        timeline: &Timeline,
        dt: TimePoint,
        animator: &dyn Animator,
    ) -> Option<PhaseChange> {
        if self.status == TimelineStatus::Done {
            return None;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;

        match timeline {
            Timeline::Scheduled(schedule) => self.step_scheduled(schedule),
            Timeline::AnimationDriven(states) => self.step_state_driven(states, dt, animator),
        }
    }

    fn step_scheduled(&mut self, schedule: &EmotionTimeline) -> Option<PhaseChange> {
        match schedule.phase_index_at(self.elapsed) {
            Some(index) if self.active == Some(index) => None,
            Some(index) => {
                self.active = Some(index);
                let phase = &schedule.phases[index];
                Some(PhaseChange::Entered {
                    index,
                    emotion: phase.emotion,
                    cue: phase.cue.clone(),
                })
            }
            None => self.settle(),
        }
    }

    fn step_state_driven(
        &mut self,
        states: &StateTimeline,
        dt: TimePoint,
        animator: &dyn Animator,
    ) -> Option<PhaseChange> {
        let Some(index) = self.active else {
            return self.enter_state_phase(states, 0);
        };
        let phase = &states.phases[index];

        match self.wait {
            StateWait::Entering { waited } => {
                if animator.current_state_name().as_deref() == Some(phase.state.as_str()) {
                    let length = animator.current_state_length().max(0.0);
                    debug!(
                        "Timeline: state '{}' entered, holding {:.2}s",
                        phase.state, length
                    );
                    self.wait = StateWait::Holding { remaining: length };
                    if length > 0.0 {
                        return None;
                    }
                    return self.enter_state_phase(states, index + 1);
                }

                let waited = waited + dt;
                if waited >= states.state_timeout {
                    warn!(
                        "Timeline: animator never reported state '{}' within {:.2}s, skipping phase {}",
                        phase.state, states.state_timeout, index
                    );
                    return self.enter_state_phase(states, index + 1);
                }
                self.wait = StateWait::Entering { waited };
                None
            }
            StateWait::Holding { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    return self.enter_state_phase(states, index + 1);
                }
                self.wait = StateWait::Holding { remaining };
                None
            }
        }
    }

    fn enter_state_phase(&mut self, states: &StateTimeline, index: usize) -> Option<PhaseChange> {
        let Some(phase) = states.phases.get(index) else {
            return self.settle();
        };
        self.active = Some(index);
        self.wait = StateWait::Entering { waited: 0.0 };
        Some(PhaseChange::Entered {
            index,
            emotion: phase.emotion,
            cue: phase.cue.clone(),
        })
    }

    fn settle(&mut self) -> Option<PhaseChange> {
        self.active = None;
        self.status = TimelineStatus::Done;
        Some(PhaseChange::Settled)
    }
}
