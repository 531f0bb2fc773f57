//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera (selfie)
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::User => "user",
            Facing::Environment => "environment",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Facing::User),
            "environment" => Ok(Facing::Environment),
            other => Err(format!(
                "Unknown facing '{}'. Expected 'user' or 'environment'",
                other
            )),
        }
    }
}

/// A sampled video frame.
///
/// Frames carry encoded image bytes as produced by the backend; the
/// detector is responsible for decoding them.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image data
    pub data: Vec<u8>,
    /// MIME type of `data` (e.g. `image/jpeg`)
    pub mime_type: String,
    /// Timestamp when the frame was sampled
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            timestamp: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Description of a live stream, handed to preview sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Process-unique stream id
    pub id: u64,
    /// Facing the stream was opened with
    pub facing: Facing,
    /// Human-readable device label
    pub label: String,
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.label, self.facing)
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("camera access denied")]
    PermissionDenied,

    #[error("no {facing} camera available")]
    NoDevice { facing: Facing },

    #[error("camera stream has ended")]
    StreamEnded,

    #[error("camera backend error: {0}")]
    Backend(String),
}

impl DeviceError {
    /// Message shown to the user when a session fails to start.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => "camera access denied".to_string(),
            DeviceError::NoDevice { .. } => "No camera available.".to_string(),
            DeviceError::StreamEnded => "The camera stream ended unexpectedly.".to_string(),
            DeviceError::Backend(_) => "Failed to access the camera.".to_string(),
        }
    }
}

/// Guess the MIME type of an encoded image from its file extension.
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_parse() {
        assert_eq!("user".parse::<Facing>(), Ok(Facing::User));
        assert_eq!(" Environment ".parse::<Facing>(), Ok(Facing::Environment));
        assert!("left".parse::<Facing>().is_err());
    }

    #[test]
    fn test_permission_denied_message() {
        assert_eq!(
            DeviceError::PermissionDenied.user_message(),
            "camera access denied"
        );
        assert_eq!(DeviceError::PermissionDenied.to_string(), "camera access denied");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension("JPG"), "image/jpeg");
        assert_eq!(mime_from_extension("png"), "image/png");
        assert_eq!(mime_from_extension("bmp"), "application/octet-stream");
    }
}
