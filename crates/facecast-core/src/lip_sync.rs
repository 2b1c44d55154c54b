//! Audio-reactive mouth openness
//!
//! Each frame the estimator takes the playing clip's spectrum, looks for the
//! strongest bin in the lowest quarter (where voiced speech energy sits),
//! turns it into a target blendshape weight and eases the mouth toward it.

use crate::config::LipSyncConfig;
use crate::rig::{AudioPlayback, BlendshapeSink};
use crate::{clamp01, lerp};
use tracing::{debug, trace, warn};

/// Gap (in weight units) below which the mouth snaps onto its target
const SNAP_EPSILON: f32 = 1e-4;

/// Peak magnitude over the low quarter of `bands`. Empty input yields 0.
pub fn voice_peak(bands: &[f32]) -> f32 {
    let voice_range = bands.len() / 4;
    bands[..voice_range]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max)
}

/// Target weight for a peak: `clamp01(peak * sensitivity) * scale`
pub fn target_weight(peak: f32, sensitivity: f32, scale: f32) -> f32 {
    clamp01(peak * sensitivity) * scale
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArmState {
    Disarmed,
    Armed,
    Misconfigured,
}

/// Smoothed mouth-open estimator
#[derive(Debug, Clone)]
pub struct MouthSignalEstimator {
    config: LipSyncConfig,
    /// Reused spectrum buffer, `config.band_count` long
    bands: Vec<f32>,
    current_value: f32,
    state: ArmState,
    /// Configuration warning already logged
    warned: bool,
}

impl MouthSignalEstimator {
    /// Create a disarmed estimator
    pub fn new(config: LipSyncConfig) -> Self {
        let bands = vec![0.0; config.band_count];
        Self {
            config,
            bands,
            current_value: 0.0,
            state: ArmState::Disarmed,
            warned: false,
        }
    }

    /// Replace the configuration. Clears a latched configuration error and
    /// disarms; the caller re-arms.
    pub fn reconfigure(&mut self, config: LipSyncConfig) {
        if config.band_count != self.bands.len() {
            self.bands = vec![0.0; config.band_count];
        }
        self.config = config;
        self.state = ArmState::Disarmed;
        self.warned = false;
        self.current_value = 0.0;
    }

    /// Active configuration
    pub fn config(&self) -> &LipSyncConfig {
        &self.config
    }

    /// Current smoothed weight
    pub fn current_value(&self) -> f32 {
        self.current_value
    }

    /// Whether per-frame updates run
    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    /// Whether the last `arm` failed on configuration
    pub fn is_misconfigured(&self) -> bool {
        self.state == ArmState::Misconfigured
    }

    /// Start per-frame updates against `audio`.
    ///
    /// Missing audio, missing mesh, or a mouth shape index the mesh does not
    /// have leave the estimator inert. The problem is logged once per
    /// configuration. Returns whether the estimator is now armed.
    pub fn arm(
        &mut self,
        audio: Option<&dyn AudioPlayback>,
        mesh: Option<&dyn BlendshapeSink>,
    ) -> bool {
        match self.check_setup(audio.is_some(), mesh) {
            Ok(()) => {
                self.state = ArmState::Armed;
                debug!("Lip sync armed");
                true
            }
            Err(problem) => {
                self.state = ArmState::Misconfigured;
                if !self.warned {
                    warn!("Lip sync: missing setup ({})", problem);
                    self.warned = true;
                }
                false
            }
        }
    }

    fn check_setup(
        &self,
        has_audio: bool,
        mesh: Option<&dyn BlendshapeSink>,
    ) -> std::result::Result<(), String> {
        if !has_audio {
            return Err("no audio source".to_string());
        }
        let Some(mesh) = mesh else {
            return Err("no face mesh".to_string());
        };
        let Some(index) = self.config.mouth_shape_index else {
            return Err("no mouth blendshape index".to_string());
        };
        if index >= mesh.weight_count() {
            return Err(format!(
                "mouth blendshape index {} out of range (mesh has {})",
                index,
                mesh.weight_count()
            ));
        }
        Ok(())
    }

    /// Stop updates and close the mouth.
    ///
    /// Writes weight 0 to the mouth shape whenever the mesh and index allow
    /// it, armed or not.
    pub fn disarm(&mut self, mesh: Option<&mut dyn BlendshapeSink>) {
        if self.state == ArmState::Armed {
            self.state = ArmState::Disarmed;
        }
        self.current_value = 0.0;

        if let (Some(mesh), Some(index)) = (mesh, self.config.mouth_shape_index) {
            if index < mesh.weight_count() {
                mesh.set_weight(index, 0.0);
            }
        }
    }

    /// Per-frame update.
    ///
    /// Does nothing unless armed and `audio` is playing. Returns the weight
    /// written to the mesh, if any.
    pub fn step(
        &mut self,
        dt: f32,
        audio: &mut dyn AudioPlayback,
        mesh: Option<&mut dyn BlendshapeSink>,
    ) -> Option<f32> {
        if self.state != ArmState::Armed || !audio.is_playing() {
            return None;
        }
        let mesh = mesh?;
        let index = self.config.mouth_shape_index?;

        audio.spectrum_snapshot(&mut self.bands, self.config.window);
        let value = self.sample(dt);
        mesh.set_weight(index, value);

        trace!("Lip sync weight {:.2}", value);
        Some(value)
    }

    /// Ease toward the target implied by the current band buffer
    pub fn sample(&mut self, dt: f32) -> f32 {
        let peak = voice_peak(&self.bands);
        let target = target_weight(peak, self.config.sensitivity, self.config.output_scale);
        self.ease_toward(target, dt)
    }

    /// One exponential smoothing step toward `target`.
    ///
    /// `dt * smoothing_rate >= 1` lands exactly on the target. A step too small
    /// to move the value in f32 precision also lands on it.
    pub fn ease_toward(&mut self, target: f32, dt: f32) -> f32 {
        let t = clamp01(dt * self.config.smoothing_rate);
        let mut next = lerp(self.current_value, target, t);
        let stalled = t > 0.0 && next == self.current_value;
        if t >= 1.0 || stalled || (target - next).abs() < SNAP_EPSILON {
            next = target;
        }
        self.current_value = next;
        next
    }

    /// Band buffer, for hosts that compute the spectrum themselves
    pub fn bands_mut(&mut self) -> &mut [f32] {
        &mut self.bands
    }
}
