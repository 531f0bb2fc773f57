//! Detection types: emotion vocabulary, raw detector output and results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed emotion vocabulary of the expression classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or_else(|| format!("Unknown emotion '{}'", s))
    }
}

/// One candidate label with its score, as returned by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionScore {
    pub label: String,
    pub score: f32,
}

impl ExpressionScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Raw output for a single detected face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Candidate expressions in the detector's native order
    #[serde(default)]
    pub expressions: Vec<ExpressionScore>,
}

/// The winning label for one face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub label: Emotion,
    /// Confidence in [0, 1]
    pub score: f32,
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}%)", self.label, self.score * 100.0)
    }
}

/// Failure to fetch or initialise detector assets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load detection models: {message}")]
pub struct ModelLoadError {
    pub message: String,
}

impl ModelLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from a detection pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error("detector request failed: {0}")]
    Inference(String),

    #[error("detected face has no usable expression scores")]
    NoUsableExpression,
}

impl DetectionError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            DetectionError::ModelLoad(_) => "Error loading AI models.".to_string(),
            DetectionError::Inference(_) => {
                "Emotion detection failed. Please try again.".to_string()
            }
            DetectionError::NoUsableExpression => {
                "Could not read an expression from the detected face.".to_string()
            }
        }
    }
}
