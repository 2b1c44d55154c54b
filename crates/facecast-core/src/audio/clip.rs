//! In-memory dialogue clip player

use super::{SpectrumAnalyzer, SpectrumWindow};
use crate::rig::AudioPlayback;
use crate::{FaceError, Result};
use parking_lot::Mutex;
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mono PCM clip with a playhead the host advances once per frame.
///
/// Clones are handles to the same clip: the orchestrator can own one as its
/// [`AudioPlayback`] while the host loop keeps another to drive the clock.
#[derive(Clone)]
pub struct ClipPlayer {
    inner: Arc<Mutex<ClipState>>,
}

struct ClipState {
    samples: Vec<f32>,
    sample_rate: u32,
    /// Playhead in seconds
    position: f64,
    playing: bool,
    analyzer: Option<SpectrumAnalyzer>,
}

impl ClipPlayer {
    /// Wrap mono samples at `sample_rate`
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(FaceError::Audio("sample rate must be positive".to_string()));
        }
        Ok(Self::build(samples, sample_rate))
    }

    fn build(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClipState {
                samples,
                sample_rate: sample_rate.max(1),
                position: 0.0,
                playing: false,
                analyzer: None,
            })),
        }
    }

    /// Load a WAV file, mixing all channels down to mono
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        info!(
            "Loaded {:?}: {} Hz, {} channel(s), {:.2}s",
            path,
            spec.sample_rate,
            channels,
            samples.len() as f64 / spec.sample_rate.max(1) as f64
        );

        Self::from_samples(samples, spec.sample_rate)
    }

    /// A silent clip of `duration` seconds
    pub fn silence(duration: f64, sample_rate: u32) -> Self {
        let len = (duration.max(0.0) * sample_rate as f64).round() as usize;
        Self::build(vec![0.0; len], sample_rate)
    }

    /// A voice-like test clip: a 160 Hz harmonic buzz gated into syllables
    pub fn synthesized_voice(duration: f64, sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let len = (duration.max(0.0) * sample_rate as f64).round() as usize;
        let fundamental = 160.0;
        let syllable_rate = 4.0;

        let samples = (0..len)
            .map(|n| {
                let t = n as f32 / sr;
                let envelope = (PI * syllable_rate * t).sin().abs().powf(0.7);
                let buzz = (1..=4)
                    .map(|h| (2.0 * PI * fundamental * h as f32 * t).sin() / h as f32)
                    .sum::<f32>();
                0.3 * envelope * buzz
            })
            .collect();

        Self::build(samples, sample_rate)
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        let state = self.inner.lock();
        state.samples.len() as f64 / state.sample_rate as f64
    }

    /// Current playhead in seconds
    pub fn position(&self) -> f64 {
        self.inner.lock().position
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().sample_rate
    }

    /// Move the playhead forward by `dt` seconds if playing.
    ///
    /// Reaching the end stops playback with the playhead on the last sample.
    pub fn advance(&self, dt: f64) {
        let mut state = self.inner.lock();
        if !state.playing || dt <= 0.0 {
            return;
        }
        let duration = state.samples.len() as f64 / state.sample_rate as f64;
        state.position += dt;
        if state.position >= duration {
            state.position = duration;
            state.playing = false;
            debug!("Clip finished at {:.3}s", duration);
        }
    }
}

impl AudioPlayback for ClipPlayer {
    fn play(&mut self) {
        let mut state = self.inner.lock();
        let duration = state.samples.len() as f64 / state.sample_rate as f64;
        // An empty or exhausted clip has nothing to make audible
        state.playing = state.position < duration;
    }

    fn stop(&mut self) {
        self.inner.lock().playing = false;
    }

    fn seek(&mut self, time: f64) {
        let mut state = self.inner.lock();
        let duration = state.samples.len() as f64 / state.sample_rate as f64;
        state.position = time.clamp(0.0, duration);
    }

    fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    fn spectrum_snapshot(&mut self, bands: &mut [f32], window: SpectrumWindow) {
        let mut state = self.inner.lock();
        let state = &mut *state;

        let needs_analyzer = state
            .analyzer
            .as_ref()
            .map_or(true, |a| a.band_count() != bands.len());
        if needs_analyzer {
            state.analyzer = Some(SpectrumAnalyzer::new(bands.len()));
        }

        let end = ((state.position * state.sample_rate as f64) as usize).min(state.samples.len());
        if let Some(analyzer) = state.analyzer.as_mut() {
            analyzer.analyze(&state.samples[..end], window, bands);
        }
    }
}

impl std::fmt::Debug for ClipPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ClipPlayer")
            .field("samples", &state.samples.len())
            .field("sample_rate", &state.sample_rate)
            .field("position", &state.position)
            .field("playing", &state.playing)
            .finish()
    }
}
