//! Headless collaborators
//!
//! Recording implementations of the rig traits. Each is a cheap handle onto
//! shared state, so a host (or a test) can keep a clone for inspection after
//! boxing another clone into a [`Rig`].

use crate::audio::ClipPlayer;
use crate::rig::{Animator, BlendshapeSink, FaceExpressionLayer, Rig, StatusDisplay};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A call made on a [`SimAnimator`]
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorCall {
    /// `play_state(name)`
    PlayState(String),
    /// `set_trigger(name)`
    SetTrigger(String),
    /// `reset_trigger(name)`
    ResetTrigger(String),
    /// `set_layer_weight(layer, weight)`
    SetLayerWeight(usize, f32),
}

#[derive(Debug, Default)]
struct AnimatorState {
    calls: Vec<AnimatorCall>,
    current_state: Option<String>,
    current_length: f64,
    /// Trigger name -> (state entered, clip length)
    trigger_states: HashMap<String, (String, f64)>,
    state_lengths: HashMap<String, f64>,
}

/// Animator that records calls and optionally follows triggers into states
#[derive(Debug, Clone, Default)]
pub struct SimAnimator {
    inner: Arc<Mutex<AnimatorState>>,
}

impl SimAnimator {
    /// Create an animator with no states
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `trigger` move the base layer into `state`, lasting `length` seconds
    pub fn map_trigger(&self, trigger: &str, state: &str, length: f64) {
        let mut inner = self.inner.lock();
        inner
            .trigger_states
            .insert(trigger.to_string(), (state.to_string(), length));
        inner.state_lengths.insert(state.to_string(), length);
    }

    /// Force the reported state, as a host transition would
    pub fn enter_state(&self, state: &str, length: f64) {
        let mut inner = self.inner.lock();
        inner.current_state = Some(state.to_string());
        inner.current_length = length;
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<AnimatorCall> {
        self.inner.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// How many times `trigger` was set
    pub fn trigger_count(&self, trigger: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, AnimatorCall::SetTrigger(t) if t == trigger))
            .count()
    }
}

impl Animator for SimAnimator {
    fn play_state(&mut self, name: &str) {
        let mut inner = self.inner.lock();
        inner.calls.push(AnimatorCall::PlayState(name.to_string()));
        let length = inner.state_lengths.get(name).copied().unwrap_or(0.0);
        inner.current_state = Some(name.to_string());
        inner.current_length = length;
    }

    fn set_trigger(&mut self, name: &str) {
        let mut inner = self.inner.lock();
        inner.calls.push(AnimatorCall::SetTrigger(name.to_string()));
        if let Some((state, length)) = inner.trigger_states.get(name).cloned() {
            trace!("SimAnimator: {} -> {}", name, state);
            inner.current_state = Some(state);
            inner.current_length = length;
        }
    }

    fn reset_trigger(&mut self, name: &str) {
        self.inner
            .lock()
            .calls
            .push(AnimatorCall::ResetTrigger(name.to_string()));
    }

    fn set_layer_weight(&mut self, layer: usize, weight: f32) {
        self.inner
            .lock()
            .calls
            .push(AnimatorCall::SetLayerWeight(layer, weight));
    }

    fn current_state_name(&self) -> Option<String> {
        self.inner.lock().current_state.clone()
    }

    fn current_state_length(&self) -> f64 {
        self.inner.lock().current_length
    }
}

/// A call made on a [`SimFace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceCall {
    /// `change_expression(id)`
    ChangeExpression(String),
    /// `set_keep_face(flag)`
    KeepFace(bool),
}

#[derive(Debug, Default)]
struct FaceState {
    calls: Vec<FaceCall>,
    current: Option<String>,
    keep_face: bool,
}

/// Expression layer that records calls
#[derive(Debug, Clone, Default)]
pub struct SimFace {
    inner: Arc<Mutex<FaceState>>,
}

impl SimFace {
    /// Create a face with no expression selected
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<FaceCall> {
        self.inner.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Most recently selected expression
    pub fn current_expression(&self) -> Option<String> {
        self.inner.lock().current.clone()
    }

    /// Current keep-face flag
    pub fn keep_face(&self) -> bool {
        self.inner.lock().keep_face
    }
}

impl FaceExpressionLayer for SimFace {
    fn change_expression(&mut self, expression: &str) {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(FaceCall::ChangeExpression(expression.to_string()));
        inner.current = Some(expression.to_string());
    }

    fn set_keep_face(&mut self, keep: bool) {
        let mut inner = self.inner.lock();
        inner.calls.push(FaceCall::KeepFace(keep));
        inner.keep_face = keep;
    }
}

#[derive(Debug, Default)]
struct MeshState {
    weights: Vec<f32>,
    writes: usize,
}

/// Blendshape mesh holding plain weights
#[derive(Debug, Clone, Default)]
pub struct SimMesh {
    inner: Arc<Mutex<MeshState>>,
}

impl SimMesh {
    /// Mesh with `count` weights, all zero
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MeshState {
                weights: vec![0.0; count],
                writes: 0,
            })),
        }
    }

    /// Weight at `index`
    pub fn weight(&self, index: usize) -> Option<f32> {
        self.inner.lock().weights.get(index).copied()
    }

    /// Copy of all weights
    pub fn weights(&self) -> Vec<f32> {
        self.inner.lock().weights.clone()
    }

    /// Number of `set_weight` calls
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }
}

impl BlendshapeSink for SimMesh {
    fn set_weight(&mut self, index: usize, value: f32) {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        if let Some(weight) = inner.weights.get_mut(index) {
            *weight = value;
        }
    }

    fn weight_count(&self) -> usize {
        self.inner.lock().weights.len()
    }
}

/// Status display keeping its full history
#[derive(Debug, Clone, Default)]
pub struct SimStatus {
    inner: Arc<Mutex<Vec<String>>>,
}

impl SimStatus {
    /// Empty display
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently shown
    pub fn current(&self) -> Option<String> {
        self.inner.lock().last().cloned()
    }

    /// Every text shown, oldest first
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().clone()
    }
}

impl StatusDisplay for SimStatus {
    fn set_text(&mut self, text: &str) {
        self.inner.lock().push(text.to_string());
    }
}

/// A complete headless rig plus handles for inspecting it
#[derive(Debug, Clone)]
pub struct SimRig {
    /// Dialogue clip
    pub audio: ClipPlayer,
    /// Body animation
    pub animator: SimAnimator,
    /// Expression layer
    pub face: SimFace,
    /// Face mesh
    pub mesh: SimMesh,
    /// Status text
    pub status: SimStatus,
}

impl SimRig {
    /// Build around `audio` with a mesh of `weight_count` blendshapes
    pub fn new(audio: ClipPlayer, weight_count: usize) -> Self {
        Self {
            audio,
            animator: SimAnimator::new(),
            face: SimFace::new(),
            mesh: SimMesh::new(weight_count),
            status: SimStatus::new(),
        }
    }

    /// Box handles onto the shared state into a [`Rig`]
    pub fn rig(&self) -> Rig {
        Rig::new(
            Box::new(self.audio.clone()),
            Box::new(self.animator.clone()),
            Box::new(self.status.clone()),
        )
        .with_face(Box::new(self.face.clone()))
        .with_mesh(Box::new(self.mesh.clone()))
    }
}
