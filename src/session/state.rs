//! Capture session states, events and the observable snapshot.

use std::fmt;

use crate::detector::DetectionResult;
use crate::store::EmotionRecord;

pub const NO_FACE_MESSAGE: &str = "No face detected. Please try again.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save emotion. Please try again.";
pub const ENROLL_FAILED_MESSAGE: &str = "Failed to enroll the face. Please try again.";
pub const NOT_SIGNED_IN_MESSAGE: &str = "You must be signed in to save emotions.";
pub const HISTORY_FAILED_MESSAGE: &str = "Error fetching emotion history. Please try again.";

/// What a confirmed capture is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// One-shot face enrollment during registration
    Enroll,
    /// Repeatable emotion capture appended to the history
    Classify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
    Detecting,
    AwaitingConfirmation,
    Saving,
    /// Enrollment finished; only reachable in [`CaptureMode::Enroll`]
    Completed,
    Error,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Streaming => "streaming",
            CaptureState::Detecting => "detecting",
            CaptureState::AwaitingConfirmation => "awaiting confirmation",
            CaptureState::Saving => "saving",
            CaptureState::Completed => "completed",
            CaptureState::Error => "error",
        };
        f.write_str(name)
    }
}

/// User-facing events accepted by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Capture,
    Confirm,
    Cancel,
    Stop,
    Reset,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Start => "start",
            SessionEvent::Capture => "capture",
            SessionEvent::Confirm => "confirm",
            SessionEvent::Cancel => "cancel",
            SessionEvent::Stop => "stop",
            SessionEvent::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Events rejected by the session. Device, detector and persistence
/// failures are not reported here; they surface as `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: CaptureState,
        event: SessionEvent,
    },

    #[error("a camera start is already in progress")]
    StartInProgress,

    #[error("no user is signed in")]
    NotSignedIn,
}

/// Everything a hosting view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub mode: CaptureMode,
    pub state: CaptureState,
    /// A camera acquisition is in flight (state is still `Idle`)
    pub starting: bool,
    pub last_result: Option<DetectionResult>,
    pub error_message: Option<String>,
    /// History as last fetched from the store
    pub history: Vec<EmotionRecord>,
}

impl SessionSnapshot {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            state: CaptureState::Idle,
            starting: false,
            last_result: None,
            error_message: None,
            history: Vec::new(),
        }
    }

    /// Whether the capture trigger should be enabled.
    pub fn can_capture(&self) -> bool {
        self.state == CaptureState::Streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = SessionError::InvalidTransition {
            state: CaptureState::Detecting,
            event: SessionEvent::Capture,
        };
        assert_eq!(err.to_string(), "cannot capture while detecting");
    }

    #[test]
    fn test_new_snapshot_is_idle() {
        let snapshot = SessionSnapshot::new(CaptureMode::Classify);
        assert_eq!(snapshot.state, CaptureState::Idle);
        assert!(!snapshot.can_capture());
        assert!(snapshot.last_result.is_none());
    }
}
