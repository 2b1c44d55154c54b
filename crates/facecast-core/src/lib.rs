//! Facecast Core - Character Performance Model
//!
//! This crate contains the domain model for driving a virtual character's face
//! in lockstep with a dialogue clip:
//! - Audio-reactive mouth openness estimation
//! - Scripted emotion timelines (fixed schedule or animation driven)
//! - The play/stop orchestrator and its single-slot request queue
//! - Capability traits for the host's audio, animation and mesh systems

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod config;
pub mod emotion;
pub mod lip_sync;
pub mod logging;
pub mod orchestrator;
pub mod rig;
pub mod sim;
pub mod timeline;

// --- Re-exports grouped by category ---

// Audio
pub use audio::{ClipPlayer, PcmClip, SpectrumAnalyzer, SpectrumWindow};

// Configuration
pub use config::{FacecastConfig, LipSyncConfig, RigConfig, TimelineConfig, TimelineMode};
pub use logging::LogConfig;

// Expressions & Timeline
pub use emotion::{Emotion, ExpressionSet};
pub use timeline::{
    EmotionPhase, EmotionTimeline, PhaseChange, StatePhase, StateTimeline, Timeline,
    TimelineCursor, TimelineStatus, TimePoint,
};

// Performance
pub use lip_sync::MouthSignalEstimator;
pub use orchestrator::{OrchestratorState, PerformanceOrchestrator};
pub use rig::{Animator, AudioPlayback, BlendshapeSink, FaceExpressionLayer, Rig, StatusDisplay};

/// Core error types
#[derive(Error, Debug)]
pub enum FaceError {
    /// Missing or invalid collaborator reference, index or parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Emotion timeline table is malformed
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    /// Audio clip could not be prepared
    #[error("Audio error: {0}")]
    Audio(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV decoding error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, FaceError>;

/// Clamp to the unit interval. NaN maps to 0.
pub(crate) fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Linear interpolation from `a` toward `b` by `t` (unclamped).
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
