use facecast_core::sim::SimMesh;
use facecast_core::{AudioPlayback, LipSyncConfig, MouthSignalEstimator, SpectrumWindow};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Counts every event, and warnings separately
#[derive(Clone, Default)]
struct EventCounter {
    events: Arc<AtomicUsize>,
    warnings: Arc<AtomicUsize>,
}

impl EventCounter {
    fn events(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.events.fetch_add(1, Ordering::SeqCst);
        if *event.metadata().level() == Level::WARN {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Audio source that reports a fixed spectrum while "playing"
struct ConstantSpectrum {
    bands: Vec<f32>,
    playing: bool,
    snapshots: usize,
}

impl ConstantSpectrum {
    fn new(bands: &[f32]) -> Self {
        Self {
            bands: bands.to_vec(),
            playing: true,
            snapshots: 0,
        }
    }
}

impl AudioPlayback for ConstantSpectrum {
    fn play(&mut self) {
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, _time: f64) {}

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn spectrum_snapshot(&mut self, bands: &mut [f32], _window: SpectrumWindow) {
        self.snapshots += 1;
        for (dst, src) in bands.iter_mut().zip(self.bands.iter().chain(std::iter::repeat(&0.0))) {
            *dst = *src;
        }
    }
}

fn four_band_config() -> LipSyncConfig {
    LipSyncConfig {
        band_count: 4,
        ..LipSyncConfig::default()
    }
}

#[test]
fn test_reference_spectrum_snaps_to_full_open() {
    let mut audio = ConstantSpectrum::new(&[0.9, 0.1, 0.05, 0.0]);
    let mut mesh = SimMesh::new(8);
    let mut estimator = MouthSignalEstimator::new(four_band_config());

    assert!(estimator.arm(Some(&audio), Some(&mesh)));
    let written = estimator.step(1.0, &mut audio, Some(&mut mesh));

    assert_eq!(written, Some(100.0));
    assert_eq!(estimator.current_value(), 100.0);
    assert_eq!(mesh.weight(6), Some(100.0));
}

#[test]
fn test_step_skips_when_not_playing() {
    let mut audio = ConstantSpectrum::new(&[0.9, 0.1, 0.05, 0.0]);
    let mut mesh = SimMesh::new(8);
    let mut estimator = MouthSignalEstimator::new(four_band_config());
    assert!(estimator.arm(Some(&audio), Some(&mesh)));

    audio.stop();
    assert_eq!(estimator.step(1.0, &mut audio, Some(&mut mesh)), None);
    assert_eq!(audio.snapshots, 0);
    assert_eq!(mesh.write_count(), 0);

    // Picks up again on the next playing frame
    audio.play();
    assert_eq!(estimator.step(1.0, &mut audio, Some(&mut mesh)), Some(100.0));
}

#[test]
fn test_step_skips_when_not_armed() {
    let mut audio = ConstantSpectrum::new(&[0.9, 0.1, 0.05, 0.0]);
    let mut mesh = SimMesh::new(8);
    let mut estimator = MouthSignalEstimator::new(four_band_config());

    assert_eq!(estimator.step(1.0, &mut audio, Some(&mut mesh)), None);
    assert_eq!(mesh.write_count(), 0);
}

#[test]
fn test_misconfigured_estimator_stays_inert() {
    let mut audio = ConstantSpectrum::new(&[0.9, 0.1, 0.05, 0.0]);
    let mut mesh = SimMesh::new(4);
    let mut estimator = MouthSignalEstimator::new(four_band_config());

    // Index 6 on a four-weight mesh
    assert!(!estimator.arm(Some(&audio), Some(&mesh)));
    assert!(estimator.is_misconfigured());
    assert_eq!(estimator.step(1.0, &mut audio, Some(&mut mesh)), None);
    assert_eq!(mesh.weights(), vec![0.0; 4]);
}

#[test]
fn test_disarm_closes_mouth() {
    let mut audio = ConstantSpectrum::new(&[0.9, 0.1, 0.05, 0.0]);
    let mut mesh = SimMesh::new(8);
    let mut estimator = MouthSignalEstimator::new(four_band_config());
    assert!(estimator.arm(Some(&audio), Some(&mesh)));

    for _ in 0..3 {
        estimator.step(1.0 / 60.0, &mut audio, Some(&mut mesh));
    }
    assert!(mesh.weight(6).unwrap() > 0.0);

    estimator.disarm(Some(&mut mesh));
    assert_eq!(mesh.weight(6), Some(0.0));
    assert_eq!(estimator.current_value(), 0.0);
    assert!(!estimator.is_armed());

    // Idempotent
    estimator.disarm(Some(&mut mesh));
    assert_eq!(mesh.weight(6), Some(0.0));
}

#[test]
fn test_only_low_quarter_drives_mouth() {
    let mut bands = vec![0.0; 64];
    bands[40] = 1.0;
    let mut audio = ConstantSpectrum::new(&bands);
    let mut mesh = SimMesh::new(8);
    let mut estimator = MouthSignalEstimator::new(LipSyncConfig {
        band_count: 64,
        ..LipSyncConfig::default()
    });
    assert!(estimator.arm(Some(&audio), Some(&mesh)));

    assert_eq!(estimator.step(1.0, &mut audio, Some(&mut mesh)), Some(0.0));
}

proptest! {
    #[test]
    fn prop_smoothing_converges_without_overshoot(
        start in 0.0f32..100.0,
        target in 0.0f32..100.0,
        dt in 0.001f32..0.5,
        rate in 0.5f32..60.0,
    ) {
        let mut estimator = MouthSignalEstimator::new(LipSyncConfig {
            smoothing_rate: rate,
            ..LipSyncConfig::default()
        });
        estimator.ease_toward(start, 1.0 / rate);
        prop_assert_eq!(estimator.current_value(), start);

        let initial_gap = (target - start).abs();
        let t = dt * rate;
        let horizon = (1.0 / t).ceil() as usize;

        let mut previous = start;
        let mut steps = 0usize;
        while estimator.current_value() != target {
            let value = estimator.ease_toward(target, dt);
            steps += 1;

            // Never crosses the target
            if start <= target {
                prop_assert!(value >= previous && value <= target);
            } else {
                prop_assert!(value <= previous && value >= target);
            }
            if steps == horizon {
                let gap = (target - value).abs();
                prop_assert!(gap <= initial_gap * (-1.0f32).exp() + 1e-3);
            }

            previous = value;
            prop_assert!(steps <= horizon * 25, "did not settle");
        }
        if t >= 1.0 {
            prop_assert!(steps <= 1);
        }
    }

    #[test]
    fn prop_disarm_always_zero(value in 0.0f32..100.0) {
        let mut mesh = SimMesh::new(8);
        let mut estimator = MouthSignalEstimator::new(LipSyncConfig::default());
        estimator.ease_toward(value, 1.0);
        estimator.disarm(Some(&mut mesh));
        prop_assert_eq!(estimator.current_value(), 0.0);
        prop_assert_eq!(mesh.weight(6), Some(0.0));
    }
}

#[test]
fn test_missing_setup_warns_once_per_configuration() {
    let counter = EventCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    tracing::subscriber::with_default(subscriber, || {
        let audio = ConstantSpectrum::new(&[0.5]);
        // Default mouth index 6 is out of range for four shapes
        let mesh = SimMesh::new(4);
        let mut estimator = MouthSignalEstimator::new(four_band_config());

        assert!(!estimator.arm(Some(&audio), Some(&mesh)));
        assert!(!estimator.arm(Some(&audio), Some(&mesh)));
        assert!(!estimator.arm(Some(&audio), None));
        assert_eq!(counter.warnings(), 1);

        // A new configuration gets its own warning
        estimator.reconfigure(four_band_config());
        assert!(!estimator.arm(Some(&audio), Some(&mesh)));
        assert!(!estimator.arm(Some(&audio), Some(&mesh)));
        assert_eq!(counter.warnings(), 2);
    });
}

#[test]
fn test_stopped_audio_is_skipped_silently() {
    let counter = EventCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut audio = ConstantSpectrum::new(&[0.5]);
        let mut mesh = SimMesh::new(8);
        let mut estimator = MouthSignalEstimator::new(four_band_config());
        assert!(estimator.arm(Some(&audio), Some(&mesh)));

        audio.stop();
        let before = counter.events();
        for _ in 0..10 {
            assert_eq!(estimator.step(1.0 / 60.0, &mut audio, Some(&mut mesh)), None);
        }
        assert_eq!(counter.events(), before);
        assert_eq!(counter.warnings(), 0);

        // Playback resuming picks up on the next step
        audio.play();
        assert!(estimator.step(1.0 / 60.0, &mut audio, Some(&mut mesh)).is_some());
    });
}
