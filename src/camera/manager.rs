//! Device manager: acquires and releases camera streams.
//!
//! A [`StreamHandle`] is the only handle to the hardware resource. It stops
//! its tracks when released through [`DeviceManager::release`] and, as a
//! backstop, when dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::types::{DeviceError, Facing, Frame, StreamInfo};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// One track of a media stream.
pub trait MediaTrack: Send {
    /// Sample the current frame.
    fn grab_frame(&mut self) -> Result<Frame, DeviceError>;

    /// Stop the track. Must tolerate being called more than once.
    fn stop(&mut self);
}

/// Tracks returned by a backend for a freshly opened stream.
pub struct OpenedStream {
    /// Human-readable device label
    pub label: String,
    /// Tracks of the stream; the first one is sampled for frames
    pub tracks: Vec<Box<dyn MediaTrack>>,
}

/// Source of camera streams (hardware, file replay, test fakes).
pub trait CameraBackend: Send + Sync {
    fn open(&self, facing: Facing) -> BoxFuture<'_, Result<OpenedStream, DeviceError>>;
}

/// Rendering target a live stream is bound to while it is held.
pub trait PreviewSink: Send + Sync {
    fn attach(&self, stream: &StreamInfo);
    fn detach(&self, stream: &StreamInfo);
}

/// Sink that renders nothing.
#[derive(Debug, Default)]
pub struct NullSink;

impl PreviewSink for NullSink {
    fn attach(&self, _stream: &StreamInfo) {}
    fn detach(&self, _stream: &StreamInfo) {}
}

/// Sink that only logs binding changes.
#[derive(Debug, Default)]
pub struct LogSink;

impl PreviewSink for LogSink {
    fn attach(&self, stream: &StreamInfo) {
        log::info!("Preview attached to stream {}", stream);
    }

    fn detach(&self, stream: &StreamInfo) {
        log::info!("Preview detached from stream {}", stream);
    }
}

/// Exclusive handle to a live camera stream.
pub struct StreamHandle {
    info: StreamInfo,
    tracks: Vec<Box<dyn MediaTrack>>,
    live: bool,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("info", &self.info)
            .field("tracks", &self.tracks.len())
            .field("live", &self.live)
            .finish()
    }
}

impl StreamHandle {
    fn new(info: StreamInfo, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            info,
            tracks,
            live: true,
        }
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Sample the current frame of the first track.
    pub fn grab_frame(&mut self) -> Result<Frame, DeviceError> {
        if !self.live {
            return Err(DeviceError::StreamEnded);
        }
        self.tracks
            .first_mut()
            .ok_or(DeviceError::StreamEnded)?
            .grab_frame()
    }

    /// Stop every track. No-op on an already stopped handle.
    pub fn stop(&mut self) {
        if !self.live {
            return;
        }
        for track in &mut self.tracks {
            track.stop();
        }
        self.live = false;
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.live {
            log::warn!("Stream {} dropped while live, stopping tracks", self.info);
            self.stop();
        }
    }
}

/// Acquires and releases camera streams on behalf of a capture session.
#[derive(Clone)]
pub struct DeviceManager {
    backend: Arc<dyn CameraBackend>,
    sink: Arc<dyn PreviewSink>,
}

impl DeviceManager {
    pub fn new(backend: Arc<dyn CameraBackend>, sink: Arc<dyn PreviewSink>) -> Self {
        Self { backend, sink }
    }

    /// Open a stream with the given facing preference and bind it to the
    /// preview sink.
    pub async fn acquire(&self, facing: Facing) -> Result<StreamHandle, DeviceError> {
        log::debug!("Requesting {} camera", facing);
        let opened = self.backend.open(facing).await?;
        if opened.tracks.is_empty() {
            return Err(DeviceError::NoDevice { facing });
        }

        let info = StreamInfo {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
            facing,
            label: opened.label,
        };
        self.sink.attach(&info);
        log::info!("Camera stream acquired: {}", info);
        Ok(StreamHandle::new(info, opened.tracks))
    }

    /// Stop and drop the held stream, if any.
    ///
    /// Returns `true` when a live stream was released. Calling this with
    /// `None` or with an already stopped handle does nothing.
    pub fn release(&self, handle: &mut Option<StreamHandle>) -> bool {
        let Some(mut stream) = handle.take() else {
            return false;
        };
        if !stream.is_live() {
            return false;
        }
        stream.stop();
        self.sink.detach(stream.info());
        log::info!("Camera stream released: {}", stream.info());
        true
    }
}
