//! Reference audio backend
//!
//! Hosts normally bring their own [`AudioPlayback`](crate::rig::AudioPlayback).
//! This module provides an in-memory one for headless runs and tests: a clip
//! player with a host-advanced playhead and an FFT spectrum analyzer.

pub mod clip;
pub mod spectrum;

pub use clip::ClipPlayer;
pub use spectrum::SpectrumAnalyzer;

/// Alias kept for hosts that think of the clip as PCM data first
pub type PcmClip = ClipPlayer;

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Window function applied to samples before the spectrum transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumWindow {
    /// No windowing
    Rectangular,
    /// Hann (raised cosine)
    Hann,
    /// Hamming
    Hamming,
    /// Classic three-term Blackman
    Blackman,
    /// Four-term Blackman-Harris, lowest leakage
    #[default]
    BlackmanHarris,
}

impl SpectrumWindow {
    /// Coefficient for sample `i` of a window `len` samples long
    pub fn coefficient(&self, i: usize, len: usize) -> f32 {
        if len <= 1 {
            return 1.0;
        }
        let t = i as f32 / (len - 1) as f32;
        let c1 = (2.0 * PI * t).cos();
        let c2 = (4.0 * PI * t).cos();
        let c3 = (6.0 * PI * t).cos();

        match self {
            SpectrumWindow::Rectangular => 1.0,
            SpectrumWindow::Hann => 0.5 - 0.5 * c1,
            SpectrumWindow::Hamming => 0.54 - 0.46 * c1,
            SpectrumWindow::Blackman => 0.42 - 0.5 * c1 + 0.08 * c2,
            SpectrumWindow::BlackmanHarris => {
                0.35875 - 0.48829 * c1 + 0.14128 * c2 - 0.01168 * c3
            }
        }
    }

    /// Fill `out` with this window's coefficients
    pub fn fill(&self, out: &mut [f32]) {
        let len = out.len();
        for (i, w) in out.iter_mut().enumerate() {
            *w = self.coefficient(i, len);
        }
    }
}
