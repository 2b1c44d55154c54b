//! Host collaborator capabilities
//!
//! The core never renders, decodes or animates anything itself. It drives the
//! host's systems through these traits, one per collaborator, and the [`Rig`]
//! bundles one instance of each for the orchestrator.

use crate::audio::SpectrumWindow;

/// A playing (or stopped) dialogue audio source.
pub trait AudioPlayback {
    /// Start playback from the current position
    fn play(&mut self);
    /// Stop playback, keeping the position
    fn stop(&mut self);
    /// Move the playhead to `time` seconds
    fn seek(&mut self, time: f64);
    /// Whether audio is currently audible
    fn is_playing(&self) -> bool;
    /// Overwrite `bands` with the current frame's frequency magnitudes.
    ///
    /// Index 0 is the lowest frequency. Implementations must not resize the
    /// buffer.
    fn spectrum_snapshot(&mut self, bands: &mut [f32], window: SpectrumWindow);
}

/// The host's skeletal animation state graph.
pub trait Animator {
    /// Jump the base layer to the named state at its first frame
    fn play_state(&mut self, name: &str);
    /// Raise a named trigger
    fn set_trigger(&mut self, name: &str);
    /// Clear a named trigger
    fn reset_trigger(&mut self, name: &str);
    /// Set the blend weight of an animation layer
    fn set_layer_weight(&mut self, layer: usize, weight: f32);
    /// Name of the state the base layer is currently in
    fn current_state_name(&self) -> Option<String>;
    /// Length in seconds of the current state's clip
    fn current_state_length(&self) -> f64;
}

/// Discrete facial expression layer.
pub trait FaceExpressionLayer {
    /// Switch the face to the named expression
    fn change_expression(&mut self, expression: &str);
    /// Hold (or release) the current expression against automatic resets
    fn set_keep_face(&mut self, keep: bool);
}

/// Deformable face mesh weights (0-100).
pub trait BlendshapeSink {
    /// Set one deform weight
    fn set_weight(&mut self, index: usize, value: f32);
    /// Number of deform weights the mesh exposes
    fn weight_count(&self) -> usize;
}

/// One-way human readable status output.
pub trait StatusDisplay {
    /// Replace the displayed text
    fn set_text(&mut self, text: &str);
}

/// The set of host collaborators a performance drives.
///
/// Audio, animator and status display are required. The face layer and the
/// blendshape mesh are optional; operations that need a missing one do nothing.
pub struct Rig {
    /// Dialogue audio
    pub audio: Box<dyn AudioPlayback>,
    /// Body animation
    pub animator: Box<dyn Animator>,
    /// Expression layer
    pub face: Option<Box<dyn FaceExpressionLayer>>,
    /// Face mesh
    pub mesh: Option<Box<dyn BlendshapeSink>>,
    /// Status text
    pub status: Box<dyn StatusDisplay>,
}

impl Rig {
    /// Create a rig without face layer or mesh
    pub fn new(
        audio: Box<dyn AudioPlayback>,
        animator: Box<dyn Animator>,
        status: Box<dyn StatusDisplay>,
    ) -> Self {
        Self {
            audio,
            animator,
            face: None,
            mesh: None,
            status,
        }
    }

    /// Attach an expression layer
    pub fn with_face(mut self, face: Box<dyn FaceExpressionLayer>) -> Self {
        self.face = Some(face);
        self
    }

    /// Attach a face mesh
    pub fn with_mesh(mut self, mesh: Box<dyn BlendshapeSink>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Return the expression layer to its default pose.
    ///
    /// Releases `keep_face`, zeroes the expression animation layer and selects
    /// `default_expression`. Safe to call any number of times.
    pub fn reset_expression_layer(&mut self, default_expression: &str, layer: usize) {
        let Some(face) = self.face.as_deref_mut() else {
            return;
        };

        face.set_keep_face(false);
        self.animator.set_layer_weight(layer, 0.0);
        face.change_expression(default_expression);
    }

    /// Reset the expression layer, then layer `expression` on top of it
    pub fn apply_expression(&mut self, expression: &str, default_expression: &str, layer: usize) {
        self.reset_expression_layer(default_expression, layer);
        if let Some(face) = self.face.as_deref_mut() {
            face.change_expression(expression);
        }
    }

    /// Zero every deform weight on the face mesh
    pub fn clear_blendshapes(&mut self) {
        if let Some(mesh) = self.mesh.as_deref_mut() {
            for index in 0..mesh.weight_count() {
                mesh.set_weight(index, 0.0);
            }
        }
    }

    /// Face mesh, mutably
    pub fn mesh_mut(&mut self) -> Option<&mut dyn BlendshapeSink> {
        match self.mesh.as_mut() {
            Some(mesh) => Some(mesh.as_mut()),
            None => None,
        }
    }

    /// Audio and face mesh borrowed together for the mouth update
    pub fn playback_and_mesh(
        &mut self,
    ) -> (&mut dyn AudioPlayback, Option<&mut dyn BlendshapeSink>) {
        let mesh: Option<&mut dyn BlendshapeSink> = match self.mesh.as_mut() {
            Some(mesh) => Some(mesh.as_mut()),
            None => None,
        };
        (self.audio.as_mut(), mesh)
    }

    /// Update the status display
    pub fn set_status(&mut self, text: &str) {
        self.status.set_text(text);
    }
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("has_face", &self.face.is_some())
            .field("has_mesh", &self.mesh.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ClipPlayer;
    use crate::sim::{AnimatorCall, FaceCall, SimAnimator, SimFace, SimMesh, SimStatus};

    fn test_rig() -> (Rig, SimAnimator, SimFace, SimMesh) {
        let animator = SimAnimator::new();
        let face = SimFace::new();
        let mesh = SimMesh::new(4);
        let rig = Rig::new(
            Box::new(ClipPlayer::silence(1.0, 8000)),
            Box::new(animator.clone()),
            Box::new(SimStatus::new()),
        )
        .with_face(Box::new(face.clone()))
        .with_mesh(Box::new(mesh.clone()));
        (rig, animator, face, mesh)
    }

    #[test]
    fn test_reset_expression_layer_order() {
        let (mut rig, animator, face, _mesh) = test_rig();
        let mut handle = face.clone();
        handle.set_keep_face(true);
        face.clear_calls();

        rig.reset_expression_layer("default", 1);

        assert_eq!(
            face.calls(),
            vec![
                FaceCall::KeepFace(false),
                FaceCall::ChangeExpression("default".to_string())
            ]
        );
        assert_eq!(animator.calls(), vec![AnimatorCall::SetLayerWeight(1, 0.0)]);
    }

    #[test]
    fn test_reset_without_face_is_noop() {
        let animator = SimAnimator::new();
        let mut rig = Rig::new(
            Box::new(ClipPlayer::silence(1.0, 8000)),
            Box::new(animator.clone()),
            Box::new(SimStatus::new()),
        );

        rig.reset_expression_layer("default", 1);
        assert!(animator.calls().is_empty());
    }

    #[test]
    fn test_apply_expression_resets_first() {
        let (mut rig, _animator, face, _mesh) = test_rig();
        rig.apply_expression("happy", "default", 1);

        let calls = face.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], FaceCall::ChangeExpression("default".to_string()));
        assert_eq!(calls[2], FaceCall::ChangeExpression("happy".to_string()));
        assert_eq!(face.current_expression().as_deref(), Some("happy"));
    }

    #[test]
    fn test_clear_blendshapes() {
        let (mut rig, _animator, _face, mesh) = test_rig();
        if let Some(sink) = rig.mesh.as_deref_mut() {
            sink.set_weight(0, 40.0);
            sink.set_weight(3, 100.0);
        }

        rig.clear_blendshapes();
        assert_eq!(mesh.weights(), vec![0.0; 4]);
    }
}
