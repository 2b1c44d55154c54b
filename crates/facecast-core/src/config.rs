//! Performance configuration
//!
//! The whole configuration surface is a static TOML document. Every section
//! falls back to the reference values, so a partial file is valid.

use crate::audio::spectrum::is_valid_band_count;
use crate::audio::SpectrumWindow;
use crate::emotion::{Emotion, ExpressionSet};
use crate::logging::LogConfig;
use crate::timeline::{
    reference_phases, EmotionPhase, EmotionTimeline, StatePhase, StateTimeline, Timeline,
    TimePoint,
};
use crate::{FaceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Mouth estimator tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Gain from peak band energy to [0, 1] openness (50-120 typical)
    pub sensitivity: f32,
    /// Exponential convergence speed, per second
    pub smoothing_rate: f32,
    /// Blendshape index of the mouth-open shape. A negative value in the
    /// file leaves it unset, and arming then reports the estimator misconfigured.
    #[serde(with = "shape_index")]
    pub mouth_shape_index: Option<usize>,
    /// Spectrum bins requested per frame (power of two, 64-8192)
    pub band_count: usize,
    /// Window applied before the spectrum transform
    pub window: SpectrumWindow,
    /// Fully open mouth in blendshape units
    pub output_scale: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            sensitivity: 65.0,
            smoothing_rate: 12.0,
            mouth_shape_index: Some(6),
            band_count: 128,
            window: SpectrumWindow::BlackmanHarris,
            output_scale: 100.0,
        }
    }
}

/// TOML has no null, so an unset index is written as `-1`
mod shape_index {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Any negative value reads back as unset
    pub const UNSET: i64 = -1;

    pub fn serialize<S: Serializer>(
        index: &Option<usize>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match index {
            Some(index) => serializer.serialize_u64(*index as u64),
            None => serializer.serialize_i64(UNSET),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Ok(None);
        }
        usize::try_from(raw).map(Some).map_err(de::Error::custom)
    }
}

impl LipSyncConfig {
    /// Check parameter ranges. An unset mouth shape index is not an error
    /// here; it is reported when the estimator is armed.
    pub fn validate(&self) -> Result<()> {
        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return Err(FaceError::Configuration(format!(
                "lip_sync.sensitivity must be positive, got {}",
                self.sensitivity
            )));
        }
        if !(self.smoothing_rate.is_finite() && self.smoothing_rate > 0.0) {
            return Err(FaceError::Configuration(format!(
                "lip_sync.smoothing_rate must be positive, got {}",
                self.smoothing_rate
            )));
        }
        if !is_valid_band_count(self.band_count) {
            return Err(FaceError::Configuration(format!(
                "lip_sync.band_count must be a power of two in 64..=8192, got {}",
                self.band_count
            )));
        }
        if !(self.output_scale.is_finite() && self.output_scale > 0.0) {
            return Err(FaceError::Configuration(format!(
                "lip_sync.output_scale must be positive, got {}",
                self.output_scale
            )));
        }
        Ok(())
    }
}

/// Animator wiring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RigConfig {
    /// Base-layer state played at run entry
    pub rest_state: String,
    /// Animation layer the expression layer blends on
    pub expression_layer: usize,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            rest_state: "Idle".to_string(),
            expression_layer: 1,
        }
    }
}

/// Which timeline flavour drives the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineMode {
    /// Fixed end times
    #[default]
    Scheduled,
    /// Animator-reported states and clip lengths
    AnimationDriven,
}

/// Emotion timeline table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Flavour
    pub mode: TimelineMode,
    /// Phases for [`TimelineMode::Scheduled`]
    pub phases: Vec<EmotionPhase>,
    /// Phases for [`TimelineMode::AnimationDriven`]
    pub state_phases: Vec<StatePhase>,
    /// Seconds to wait for a state before skipping its phase
    pub state_timeout: TimePoint,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            mode: TimelineMode::Scheduled,
            phases: reference_phases(),
            state_phases: vec![
                StatePhase::new(Emotion::Happy, "Smile"),
                StatePhase::new(Emotion::Sad, "Sad"),
                StatePhase::new(Emotion::Happy, "Smile"),
                StatePhase::new(Emotion::SoftSad, "Sad"),
            ],
            state_timeout: 2.0,
        }
    }
}

impl TimelineConfig {
    /// Build the configured timeline
    pub fn build(&self) -> Result<Timeline> {
        match self.mode {
            TimelineMode::Scheduled => Ok(Timeline::Scheduled(EmotionTimeline::new(
                self.phases.clone(),
            )?)),
            TimelineMode::AnimationDriven => Ok(Timeline::AnimationDriven(StateTimeline::new(
                self.state_phases.clone(),
                self.state_timeout,
            )?)),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FacecastConfig {
    /// Mouth estimator
    pub lip_sync: LipSyncConfig,
    /// Expression ids
    pub expressions: ExpressionSet,
    /// Animator wiring
    pub rig: RigConfig,
    /// Emotion timeline
    pub timeline: TimelineConfig,
    /// Logging
    pub logging: LogConfig,
}

impl FacecastConfig {
    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: FacecastConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| FaceError::Configuration(e.to_string()))
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.lip_sync.validate()?;
        if self.rig.rest_state.is_empty() {
            return Err(FaceError::Configuration(
                "rig.rest_state must not be empty".to_string(),
            ));
        }
        self.timeline.build()?;
        Ok(())
    }
}
