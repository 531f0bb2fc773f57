//! CaptureSession - the capture-and-confirm state machine.
//!
//! All session state lives behind one mutex that is never held across an
//! await. Every state-entering transition bumps a generation counter; an
//! async completion applies only if the generation it started under is
//! still current, so results that arrive after `stop()` are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::state::{
    CaptureMode, CaptureState, SessionError, SessionEvent, SessionSnapshot,
    ENROLL_FAILED_MESSAGE, HISTORY_FAILED_MESSAGE, NOT_SIGNED_IN_MESSAGE, NO_FACE_MESSAGE,
    SAVE_FAILED_MESSAGE,
};
use crate::camera::{DeviceError, DeviceManager, Facing, Frame, StreamHandle};
use crate::detector::{DetectionError, DetectionResult, DetectorAdapter};
use crate::store::{
    AuthContext, EmotionRecord, EnrollmentSample, EnrollmentStore, HistoryStore, NewEmotion,
    UserId,
};

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthContext>,
    pub history: Arc<dyn HistoryStore>,
    pub enrollment: Arc<dyn EnrollmentStore>,
}

struct Core {
    state: CaptureState,
    generation: u64,
    starting: bool,
    /// A camera acquisition is outstanding, possibly for a superseded start.
    acquiring: bool,
    stream: Option<StreamHandle>,
    last_result: Option<DetectionResult>,
    captured_frame: Option<Frame>,
    error_message: Option<String>,
    history: Vec<EmotionRecord>,
    history_request: u64,
}

impl Core {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            generation: 0,
            starting: false,
            acquiring: false,
            stream: None,
            last_result: None,
            captured_frame: None,
            error_message: None,
            history: Vec::new(),
            history_request: 0,
        }
    }

    /// Enter `state`, invalidating any outstanding async work.
    fn enter(&mut self, state: CaptureState) {
        log::debug!("Capture state {} -> {}", self.state, state);
        self.state = state;
        self.generation += 1;
        if state != CaptureState::Error {
            self.error_message = None;
        }
    }

    fn fail(&mut self, message: String) {
        self.enter(CaptureState::Error);
        self.error_message = Some(message);
    }

    fn discard_capture(&mut self) {
        self.last_result = None;
        self.captured_frame = None;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// Marks an outstanding `acquire`. Cleared through [`PendingAcquire::settle`]
/// under the same lock that stores or releases the stream, or on drop if the
/// start future is cancelled mid-acquire.
struct PendingAcquire<'a> {
    core: &'a Mutex<Core>,
    settled: bool,
}

impl PendingAcquire<'_> {
    fn settle(mut self, core: &mut Core) {
        core.acquiring = false;
        self.settled = true;
    }
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.core
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .acquiring = false;
        }
    }
}

enum Submission {
    Emotion(NewEmotion),
    Enrollment(EnrollmentSample),
}

/// One capture workflow instance (enrollment or emotion capture).
///
/// Event methods take `&self`, so a session shared through an `Arc` can be
/// stopped from another task while a detection or save is outstanding.
pub struct CaptureSession {
    mode: CaptureMode,
    facing: Facing,
    devices: DeviceManager,
    detector: DetectorAdapter,
    collaborators: Collaborators,
    core: Mutex<Core>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl CaptureSession {
    pub fn new(
        mode: CaptureMode,
        facing: Facing,
        devices: DeviceManager,
        detector: DetectorAdapter,
        collaborators: Collaborators,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::new(mode));
        Self {
            mode,
            facing,
            devices,
            detector,
            collaborators,
            core: Mutex::new(Core::new()),
            snapshot_tx,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Observe every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn state(&self) -> CaptureState {
        self.core().state
    }

    pub fn last_result(&self) -> Option<DetectionResult> {
        self.core().last_result
    }

    pub fn error_message(&self) -> Option<String> {
        self.core().error_message.clone()
    }

    pub fn history(&self) -> Vec<EmotionRecord> {
        self.core().history.clone()
    }

    /// Whether the session currently holds a live camera stream.
    pub fn holds_stream(&self) -> bool {
        self.core().stream.as_ref().is_some_and(StreamHandle::is_live)
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, core: &Core) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            mode: self.mode,
            state: core.state,
            starting: core.starting,
            last_result: core.last_result,
            error_message: core.error_message.clone(),
            history: core.history.clone(),
        });
    }

    fn reject(state: CaptureState, event: SessionEvent) -> SessionError {
        log::debug!("Ignoring {} while {}", event, state);
        SessionError::InvalidTransition { state, event }
    }

    /// Idle -> Streaming: load models, then open the camera.
    ///
    /// Failures move the session to `Error`. Returns the state after the
    /// event was processed.
    pub async fn start(&self) -> Result<CaptureState, SessionError> {
        let generation = {
            let mut core = self.core();
            if core.state != CaptureState::Idle {
                return Err(Self::reject(core.state, SessionEvent::Start));
            }
            if core.starting || core.acquiring {
                return Err(SessionError::StartInProgress);
            }
            core.starting = true;
            core.generation += 1;
            core.error_message = None;
            self.publish(&core);
            core.generation
        };

        if let Err(e) = self.detector.ensure_models_loaded().await {
            let mut core = self.core();
            if core.is_current(generation) {
                core.starting = false;
                core.fail(DetectionError::from(e).user_message());
                self.publish(&core);
            }
            return Ok(core.state);
        }

        let pending = {
            let mut core = self.core();
            if !core.is_current(generation) {
                return Ok(core.state);
            }
            core.acquiring = true;
            PendingAcquire {
                core: &self.core,
                settled: false,
            }
        };

        let acquired = self.devices.acquire(self.facing).await;

        let mut core = self.core();
        pending.settle(&mut core);
        if !core.is_current(generation) {
            if let Ok(stream) = acquired {
                log::debug!("Releasing stream acquired for a cancelled start");
                self.devices.release(&mut Some(stream));
            }
            return Ok(core.state);
        }

        core.starting = false;
        match acquired {
            Ok(stream) => {
                core.stream = Some(stream);
                core.enter(CaptureState::Streaming);
            }
            Err(e) => {
                log::warn!("Camera start failed: {}", e);
                core.fail(e.user_message());
            }
        }
        self.publish(&core);
        Ok(core.state)
    }

    /// Streaming -> Detecting: classify the current frame.
    ///
    /// Ends in `AwaitingConfirmation` with a result, back in `Streaming`
    /// when no face is found, or in `Error`.
    pub async fn capture(&self) -> Result<CaptureState, SessionError> {
        let (generation, frame) = {
            let mut core = self.core();
            if core.state != CaptureState::Streaming {
                return Err(Self::reject(core.state, SessionEvent::Capture));
            }
            let sampled = core
                .stream
                .as_mut()
                .ok_or(DeviceError::StreamEnded)
                .and_then(StreamHandle::grab_frame);
            let frame = match sampled {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Could not sample camera frame: {}", e);
                    core.fail(e.user_message());
                    self.publish(&core);
                    return Ok(core.state);
                }
            };
            core.discard_capture();
            core.enter(CaptureState::Detecting);
            self.publish(&core);
            (core.generation, frame)
        };

        let outcome = self.detector.detect(&frame).await;

        let mut core = self.core();
        if !core.is_current(generation) {
            log::debug!("Discarding stale detection result");
            return Ok(core.state);
        }

        match outcome {
            Ok(Some(result)) => {
                log::info!("Detected {}", result);
                core.enter(CaptureState::AwaitingConfirmation);
                core.last_result = Some(result);
                if self.mode == CaptureMode::Enroll {
                    core.captured_frame = Some(frame);
                }
            }
            Ok(None) => {
                log::info!("No face detected");
                core.enter(CaptureState::Streaming);
                core.error_message = Some(NO_FACE_MESSAGE.to_string());
            }
            Err(e) => {
                log::error!("Detection failed: {}", e);
                core.fail(e.user_message());
            }
        }
        self.publish(&core);
        Ok(core.state)
    }

    /// AwaitingConfirmation -> Saving: persist the detected result.
    ///
    /// On success the camera is released and the session ends in `Idle`
    /// (emotion capture, followed by a history refetch) or `Completed`
    /// (enrollment). On failure the result is kept so `confirm()` can be
    /// retried without capturing again.
    pub async fn confirm(&self) -> Result<CaptureState, SessionError> {
        let (generation, submission, user_id) = {
            let mut core = self.core();
            if core.state != CaptureState::AwaitingConfirmation {
                return Err(Self::reject(core.state, SessionEvent::Confirm));
            }
            let Some(result) = core.last_result else {
                return Err(Self::reject(core.state, SessionEvent::Confirm));
            };
            let Some(user) = self.collaborators.auth.current_user() else {
                log::error!("No signed-in user, cannot persist capture");
                core.error_message = Some(NOT_SIGNED_IN_MESSAGE.to_string());
                self.publish(&core);
                return Err(SessionError::NotSignedIn);
            };

            let submission = match self.mode {
                CaptureMode::Classify => Submission::Emotion(NewEmotion {
                    user_id: user.id,
                    emotion: result.label,
                }),
                CaptureMode::Enroll => {
                    let Some(frame) = core.captured_frame.as_ref() else {
                        return Err(Self::reject(core.state, SessionEvent::Confirm));
                    };
                    Submission::Enrollment(EnrollmentSample {
                        user_id: user.id,
                        data: frame.data.clone(),
                        mime_type: frame.mime_type.clone(),
                    })
                }
            };
            core.enter(CaptureState::Saving);
            self.publish(&core);
            (core.generation, submission, user.id)
        };

        let outcome = match submission {
            Submission::Emotion(entry) => self.collaborators.history.append(entry).await,
            Submission::Enrollment(sample) => self.collaborators.enrollment.submit(sample).await,
        };

        let saved = {
            let mut core = self.core();
            if !core.is_current(generation) {
                log::debug!("Discarding stale save completion");
                return Ok(core.state);
            }

            match outcome {
                Ok(()) => {
                    self.devices.release(&mut core.stream);
                    core.discard_capture();
                    core.enter(match self.mode {
                        CaptureMode::Classify => CaptureState::Idle,
                        CaptureMode::Enroll => CaptureState::Completed,
                    });
                    self.publish(&core);
                    true
                }
                Err(e) => {
                    log::error!("Failed to persist capture: {}", e);
                    core.enter(CaptureState::AwaitingConfirmation);
                    core.error_message = Some(
                        match self.mode {
                            CaptureMode::Classify => SAVE_FAILED_MESSAGE,
                            CaptureMode::Enroll => ENROLL_FAILED_MESSAGE,
                        }
                        .to_string(),
                    );
                    self.publish(&core);
                    return Ok(core.state);
                }
            }
        };

        if saved && self.mode == CaptureMode::Classify {
            self.fetch_history(user_id).await;
        }
        Ok(self.state())
    }

    /// AwaitingConfirmation -> Streaming, discarding the result.
    pub fn cancel(&self) -> Result<CaptureState, SessionError> {
        let mut core = self.core();
        if core.state != CaptureState::AwaitingConfirmation {
            return Err(Self::reject(core.state, SessionEvent::Cancel));
        }
        core.discard_capture();
        core.enter(CaptureState::Streaming);
        self.publish(&core);
        Ok(core.state)
    }

    /// Any state -> Idle. Always releases the camera and drops any
    /// outstanding async work.
    pub fn stop(&self) -> CaptureState {
        let mut core = self.core();
        if self.devices.release(&mut core.stream) {
            log::info!("Capture stopped");
        }
        core.starting = false;
        core.discard_capture();
        core.enter(CaptureState::Idle);
        self.publish(&core);
        core.state
    }

    /// Error -> Idle.
    pub fn reset(&self) -> Result<CaptureState, SessionError> {
        let mut core = self.core();
        if core.state != CaptureState::Error {
            return Err(Self::reject(core.state, SessionEvent::Reset));
        }
        self.devices.release(&mut core.stream);
        core.discard_capture();
        core.enter(CaptureState::Idle);
        self.publish(&core);
        Ok(core.state)
    }

    /// Refetch the signed-in user's history.
    pub async fn refresh_history(&self) -> Result<(), SessionError> {
        let user = self
            .collaborators
            .auth
            .current_user()
            .ok_or(SessionError::NotSignedIn)?;
        self.fetch_history(user.id).await;
        Ok(())
    }

    async fn fetch_history(&self, user_id: UserId) {
        let request = {
            let mut core = self.core();
            core.history_request += 1;
            core.history_request
        };

        let fetched = self.collaborators.history.fetch(user_id).await;

        let mut core = self.core();
        if core.history_request != request {
            log::debug!("Discarding superseded history fetch");
            return;
        }
        match fetched {
            Ok(records) => core.history = records,
            Err(e) => {
                log::error!("Failed to fetch emotion history: {}", e);
                core.error_message = Some(HISTORY_FAILED_MESSAGE.to_string());
            }
        }
        self.publish(&core);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        self.devices.release(&mut core.stream);
    }
}
