//! FFT magnitude spectrum for lip sync
//!
//! Produces `band_count` linearly spaced magnitude bins from the most recent
//! `2 * band_count` samples, the same shape a game engine's per-frame
//! spectrum query returns.

use super::SpectrumWindow;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

/// Smallest supported band count
pub const MIN_BAND_COUNT: usize = 64;
/// Largest supported band count
pub const MAX_BAND_COUNT: usize = 8192;

/// Whether `band_count` is a power of two inside the supported range
pub fn is_valid_band_count(band_count: usize) -> bool {
    band_count.is_power_of_two() && (MIN_BAND_COUNT..=MAX_BAND_COUNT).contains(&band_count)
}

/// Spectrum analyzer with preallocated buffers
pub struct SpectrumAnalyzer {
    /// FFT instance
    fft: Arc<dyn Fft<f32>>,

    /// FFT size (twice the band count)
    fft_size: usize,

    /// Window the cached coefficients were computed for
    window_kind: SpectrumWindow,

    /// Cached window coefficients
    window: Vec<f32>,

    /// FFT complex buffer
    fft_buffer: Vec<Complex<f32>>,

    /// FFT scratch buffer
    scratch_buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer producing `band_count` bins
    pub fn new(band_count: usize) -> Self {
        let band_count = band_count.max(1);
        let fft_size = band_count * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let window_kind = SpectrumWindow::default();
        let mut window = vec![0.0; fft_size];
        window_kind.fill(&mut window);

        debug!(
            "SpectrumAnalyzer created: bands={}, fft_size={}",
            band_count, fft_size
        );

        Self {
            fft,
            fft_size,
            window_kind,
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Number of output bins
    pub fn band_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute magnitudes of the samples ending at `samples.len()`.
    ///
    /// Fewer samples than the FFT size are zero-padded at the front. NaN and
    /// infinite samples are treated as silence. Writes
    /// `min(bands.len(), band_count)` bins and zeroes any remainder.
    pub fn analyze(&mut self, samples: &[f32], window: SpectrumWindow, bands: &mut [f32]) {
        if window != self.window_kind {
            window.fill(&mut self.window);
            self.window_kind = window;
        }

        let take = samples.len().min(self.fft_size);
        let tail = &samples[samples.len() - take..];
        let pad = self.fft_size - take;

        for i in 0..self.fft_size {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            self.fft_buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        // Single-sided amplitude
        let norm_factor = 2.0 / self.fft_size as f32;
        let bins = self.band_count().min(bands.len());
        for (i, band) in bands.iter_mut().enumerate() {
            *band = if i < bins {
                self.fft_buffer[i].norm() * norm_factor
            } else {
                0.0
            };
        }
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft_size", &self.fft_size)
            .field("window_kind", &self.window_kind)
            .finish()
    }
}
