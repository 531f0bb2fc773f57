//! Camera access for capture sessions.
//!
//! This module provides the device side of a capture session:
//! - Stream acquisition and release via [`DeviceManager`]
//! - Pluggable sources via [`CameraBackend`] and [`MediaTrack`]
//! - A file-backed source via [`StillImageCamera`]

mod manager;
mod still;
mod types;

pub use manager::{
    CameraBackend, DeviceManager, LogSink, MediaTrack, NullSink, OpenedStream, PreviewSink,
    StreamHandle,
};
pub use still::StillImageCamera;
pub use types::{mime_from_extension, DeviceError, Facing, Frame, StreamInfo};
