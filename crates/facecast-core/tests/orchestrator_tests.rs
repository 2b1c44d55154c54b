use facecast_core::sim::{AnimatorCall, SimAnimator, SimRig, SimStatus};
use facecast_core::{
    ClipPlayer, Emotion, FacecastConfig, OrchestratorState, PerformanceOrchestrator, Rig,
    TimelineMode,
};

const FRAME: f64 = 1.0 / 60.0;
const SAMPLE_RATE: u32 = 8000;

/// A host loop: advances the clip, then ticks the orchestrator
struct Host {
    orchestrator: PerformanceOrchestrator,
    sim: SimRig,
    time: f64,
}

impl Host {
    fn new(clip: ClipPlayer) -> Self {
        Self::with_config(clip, &FacecastConfig::default())
    }

    fn with_config(clip: ClipPlayer, config: &FacecastConfig) -> Self {
        let sim = SimRig::new(clip, 12);
        let orchestrator = PerformanceOrchestrator::new(sim.rig(), config).unwrap();
        Self {
            orchestrator,
            sim,
            time: 0.0,
        }
    }

    fn frame(&mut self) -> OrchestratorState {
        self.sim.audio.advance(FRAME);
        self.time += FRAME;
        self.orchestrator.tick(FRAME)
    }

    /// Tick until Idle; returns host time spent
    fn run_until_idle(&mut self, limit: f64) -> f64 {
        let start = self.time;
        while self.orchestrator.is_running() {
            self.frame();
            assert!(self.time - start < limit, "run did not finish");
        }
        self.time - start
    }
}

#[test]
fn test_reference_run_end_to_end() {
    let mut host = Host::new(ClipPlayer::synthesized_voice(9.0, SAMPLE_RATE));
    host.orchestrator.request_play();

    let samples = [0.5, 2.0, 4.0, 6.5, 8.5];
    let mut seen = Vec::new();
    let mut running_at_7_5 = false;
    let mut peak_mouth = 0.0f32;
    let mut idle_at = None;

    while idle_at.is_none() {
        let state = host.frame();
        peak_mouth = peak_mouth.max(host.orchestrator.mouth_value());

        if seen.len() < samples.len() && host.time >= samples[seen.len()] {
            seen.push(host.orchestrator.current_emotion());
        }
        if host.time >= 7.5 && host.time < 8.9 {
            running_at_7_5 |= state == OrchestratorState::Running;
            assert_eq!(state, OrchestratorState::Running);
        }
        if state == OrchestratorState::Idle {
            idle_at = Some(host.time);
        }
        assert!(host.time < 12.0, "run did not finish");
    }

    assert_eq!(
        seen,
        vec![
            Emotion::Happy,
            Emotion::Sad,
            Emotion::Happy,
            Emotion::SoftSad,
            Emotion::Neutral
        ]
    );
    assert!(running_at_7_5);
    let idle_at = idle_at.unwrap();
    assert!(idle_at >= 9.0 - 1e-6, "went idle at {}", idle_at);
    assert!(idle_at < 9.0 + 2.0 * FRAME);

    // The voice moved the mouth, and exit closed it
    assert!(peak_mouth > 10.0, "peak mouth {}", peak_mouth);
    assert_eq!(host.sim.mesh.weight(6), Some(0.0));
    assert_eq!(host.orchestrator.mouth_value(), 0.0);
    assert!(!host.orchestrator.estimator().is_armed());
}

#[test]
fn test_status_sequence() {
    let mut host = Host::new(ClipPlayer::silence(9.0, SAMPLE_RATE));
    host.orchestrator.request_play();
    host.run_until_idle(12.0);

    assert_eq!(
        host.sim.status.history(),
        vec![
            "Idle",
            "Speaking...",
            "Happy 😊",
            "Sad 😢",
            "Happy 😊",
            "Soft Sad 😔",
            "Neutral",
            "Idle"
        ]
    );
}

#[test]
fn test_entry_resets_rig() {
    let mut host = Host::new(ClipPlayer::silence(9.0, SAMPLE_RATE));
    host.sim.animator.clear_calls();
    host.sim.face.clear_calls();
    host.orchestrator.request_play();

    let calls = host.sim.animator.calls();
    assert_eq!(calls[0], AnimatorCall::PlayState("Idle".to_string()));
    assert!(calls.contains(&AnimatorCall::ResetTrigger("SmileTrigger".to_string())));
    assert!(calls.contains(&AnimatorCall::ResetTrigger("SadTrigger".to_string())));
    assert!(calls.contains(&AnimatorCall::SetLayerWeight(1, 0.0)));
    assert_eq!(
        calls.last(),
        Some(&AnimatorCall::SetTrigger("SmileTrigger".to_string()))
    );

    assert!(!host.sim.face.keep_face());
    assert_eq!(
        host.sim.face.current_expression().as_deref(),
        Some("conf@unitychan")
    );
    assert_eq!(host.sim.mesh.weights(), vec![0.0; 12]);
    assert!(host.orchestrator.estimator().is_armed());
}

#[test]
fn test_each_cue_fires_once_per_entry() {
    let mut host = Host::new(ClipPlayer::silence(9.0, SAMPLE_RATE));
    host.orchestrator.request_play();
    host.run_until_idle(12.0);

    assert_eq!(host.sim.animator.trigger_count("SmileTrigger"), 2);
    assert_eq!(host.sim.animator.trigger_count("SadTrigger"), 2);
}

#[test]
fn test_three_requests_cause_one_rerun() {
    let mut host = Host::new(ClipPlayer::silence(9.0, SAMPLE_RATE));
    host.orchestrator.request_play();
    for _ in 0..30 {
        host.frame();
    }
    let elapsed = host.orchestrator.elapsed();

    host.orchestrator.request_play();
    host.orchestrator.request_play();
    host.orchestrator.request_play();
    assert!(host.orchestrator.is_queued());
    assert_eq!(host.orchestrator.runs_started(), 1);
    // The current run is not restarted
    assert_eq!(host.orchestrator.elapsed(), elapsed);

    // First run ends and the queued one starts within the same tick
    while host.orchestrator.runs_started() == 1 {
        assert_eq!(host.frame(), OrchestratorState::Running);
        assert!(host.time < 12.0);
    }
    assert!(host.orchestrator.is_running());
    assert!(!host.orchestrator.is_queued());

    host.run_until_idle(12.0);
    assert_eq!(host.orchestrator.state(), OrchestratorState::Idle);
    assert_eq!(host.orchestrator.runs_started(), 2);

    // Nothing else is pending
    for _ in 0..60 {
        assert_eq!(host.frame(), OrchestratorState::Idle);
    }
    assert_eq!(host.orchestrator.runs_started(), 2);
}

#[test]
fn test_request_during_rerun_queues_again() {
    let mut host = Host::new(ClipPlayer::silence(9.0, SAMPLE_RATE));
    host.orchestrator.request_play();
    host.orchestrator.request_play();
    while host.orchestrator.runs_started() == 1 {
        host.frame();
    }

    host.orchestrator.request_play();
    assert!(host.orchestrator.is_queued());
    while host.orchestrator.runs_started() == 2 {
        host.frame();
    }
    host.run_until_idle(12.0);
    assert_eq!(host.orchestrator.runs_started(), 3);
}

#[test]
fn test_short_clip_still_waits_for_timeline() {
    let mut host = Host::new(ClipPlayer::silence(3.0, SAMPLE_RATE));
    host.orchestrator.request_play();

    let spent = host.run_until_idle(12.0);
    assert!(spent >= 7.5 - 1e-6, "went idle at {}", spent);
    assert!(spent < 7.5 + 2.0 * FRAME);
    assert_eq!(host.sim.status.current().as_deref(), Some("Idle"));
}

#[test]
fn test_empty_clip_runs_the_timeline() {
    let mut host = Host::new(ClipPlayer::silence(0.0, SAMPLE_RATE));
    host.orchestrator.request_play();
    assert!(host.orchestrator.is_running());

    let spent = host.run_until_idle(12.0);
    assert!(spent >= 7.5 - 1e-6);
}

#[test]
fn test_rig_without_face_or_mesh() {
    let clip = ClipPlayer::silence(2.0, SAMPLE_RATE);
    let animator = SimAnimator::new();
    let status = SimStatus::new();
    let rig = Rig::new(
        Box::new(clip.clone()),
        Box::new(animator.clone()),
        Box::new(status.clone()),
    );
    let mut orchestrator = PerformanceOrchestrator::new(rig, &FacecastConfig::default()).unwrap();

    orchestrator.request_play();
    assert!(orchestrator.estimator().is_misconfigured());

    let mut time = 0.0;
    while orchestrator.is_running() {
        clip.advance(FRAME);
        orchestrator.tick(FRAME);
        time += FRAME;
        assert!(time < 12.0);
    }
    assert_eq!(animator.trigger_count("SmileTrigger"), 2);
    assert_eq!(status.current().as_deref(), Some("Idle"));
}

#[test]
fn test_animation_driven_run() {
    let config = FacecastConfig {
        timeline: facecast_core::TimelineConfig {
            mode: TimelineMode::AnimationDriven,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut host = Host::with_config(ClipPlayer::silence(2.0, SAMPLE_RATE), &config);
    host.sim.animator.map_trigger("SmileTrigger", "Smile", 1.0);
    host.sim.animator.map_trigger("SadTrigger", "Sad", 1.0);

    host.orchestrator.request_play();
    let spent = host.run_until_idle(12.0);

    // Four one-second holds, each seen a frame after its trigger
    assert!(spent > 4.0 && spent < 4.0 + 12.0 * FRAME, "spent {}", spent);
    assert_eq!(host.sim.animator.trigger_count("SmileTrigger"), 2);
    assert_eq!(host.sim.animator.trigger_count("SadTrigger"), 2);
    assert_eq!(host.sim.status.current().as_deref(), Some("Idle"));
}

#[test]
fn test_invalid_config_rejected() {
    let sim = SimRig::new(ClipPlayer::silence(1.0, SAMPLE_RATE), 12);
    let mut config = FacecastConfig::default();
    config.lip_sync.smoothing_rate = -1.0;
    assert!(PerformanceOrchestrator::new(sim.rig(), &config).is_err());
}
