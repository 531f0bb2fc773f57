//! Capture sessions: camera, detection and confirmation in one workflow.
//!
//! A [`CaptureSession`] moves through
//! `Idle -> Streaming -> Detecting -> AwaitingConfirmation -> Saving` and
//! back, with `Error` for device and detector failures and `Completed` as
//! the end of an enrollment.

mod session;
mod state;

pub use session::{CaptureSession, Collaborators};
pub use state::{
    CaptureMode, CaptureState, SessionError, SessionEvent, SessionSnapshot,
    ENROLL_FAILED_MESSAGE, HISTORY_FAILED_MESSAGE, NOT_SIGNED_IN_MESSAGE, NO_FACE_MESSAGE,
    SAVE_FAILED_MESSAGE,
};
