//! Discrete emotion states and the expression ids that show them

use serde::{Deserialize, Serialize};

/// Emotion shown on the expression layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Default face
    #[default]
    Neutral,
    /// Smiling
    Happy,
    /// Upset
    Sad,
    /// Mild, low-energy sadness
    SoftSad,
}

impl Emotion {
    /// Text for the status display when this emotion starts
    pub fn status_label(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Happy => "Happy 😊",
            Emotion::Sad => "Sad 😢",
            Emotion::SoftSad => "Soft Sad 😔",
        }
    }

    /// Body-animation trigger conventionally paired with this emotion
    pub fn default_cue(&self) -> Option<&'static str> {
        match self {
            Emotion::Neutral => None,
            Emotion::Happy => Some("SmileTrigger"),
            Emotion::Sad | Emotion::SoftSad => Some("SadTrigger"),
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::SoftSad => "soft_sad",
        };
        f.write_str(name)
    }
}

/// Expression layer ids for each emotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionSet {
    /// Resting face, also used for [`Emotion::Neutral`]
    pub default: String,
    /// Expression for [`Emotion::Happy`]
    pub happy: String,
    /// Expression for [`Emotion::Sad`]
    pub sad: String,
    /// Expression for [`Emotion::SoftSad`]
    pub soft_sad: String,
}

impl Default for ExpressionSet {
    fn default() -> Self {
        Self {
            default: "default@unitychan".to_string(),
            happy: "conf@unitychan".to_string(),
            sad: "ASHAMED".to_string(),
            soft_sad: "disstract1@unitychan".to_string(),
        }
    }
}

impl ExpressionSet {
    /// Expression id that shows `emotion`
    pub fn expression_for(&self, emotion: Emotion) -> &str {
        match emotion {
            Emotion::Neutral => &self.default,
            Emotion::Happy => &self.happy,
            Emotion::Sad => &self.sad,
            Emotion::SoftSad => &self.soft_sad,
        }
    }
}
