//! File-backed camera backend.
//!
//! Serves the contents of an image file as the live frame of a stream. The
//! file is read once when the stream opens; sampling never touches the
//! filesystem. Reopen the stream to pick up a changed file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;

use super::manager::{CameraBackend, MediaTrack, OpenedStream};
use super::types::{mime_from_extension, DeviceError, Facing, Frame};

/// Camera backend that reads frames from image files, one per facing.
#[derive(Debug, Clone, Default)]
pub struct StillImageCamera {
    user: Option<PathBuf>,
    environment: Option<PathBuf>,
}

impl StillImageCamera {
    pub fn new(user: Option<PathBuf>, environment: Option<PathBuf>) -> Self {
        Self { user, environment }
    }

    fn path_for(&self, facing: Facing) -> Option<&Path> {
        match facing {
            Facing::User => self.user.as_deref(),
            Facing::Environment => self.environment.as_deref(),
        }
    }
}

fn map_io_error(error: std::io::Error, facing: Facing) -> DeviceError {
    match error.kind() {
        ErrorKind::PermissionDenied => DeviceError::PermissionDenied,
        ErrorKind::NotFound => DeviceError::NoDevice { facing },
        _ => DeviceError::Backend(error.to_string()),
    }
}

impl CameraBackend for StillImageCamera {
    fn open(&self, facing: Facing) -> BoxFuture<'_, Result<OpenedStream, DeviceError>> {
        let path = self.path_for(facing).map(Path::to_path_buf);
        Box::pin(async move {
            let path = path.ok_or(DeviceError::NoDevice { facing })?;
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| map_io_error(e, facing))?;
            let mime = path
                .extension()
                .and_then(|e| e.to_str())
                .map(mime_from_extension)
                .unwrap_or("application/octet-stream");

            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            log::debug!("Loaded {} byte frame from {}", data.len(), path.display());
            let track = FileTrack {
                data,
                mime,
                stopped: false,
            };
            Ok(OpenedStream {
                label,
                tracks: vec![Box::new(track)],
            })
        })
    }
}

struct FileTrack {
    data: Vec<u8>,
    mime: &'static str,
    stopped: bool,
}

impl MediaTrack for FileTrack {
    fn grab_frame(&mut self) -> Result<Frame, DeviceError> {
        if self.stopped {
            return Err(DeviceError::StreamEnded);
        }
        Ok(Frame::new(self.data.clone(), self.mime))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DeviceManager, NullSink};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_reads_frame_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("face.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();

        let camera = StillImageCamera::new(Some(path), None);
        let manager = DeviceManager::new(Arc::new(camera), Arc::new(NullSink));
        let mut handle = manager.acquire(Facing::User).await.unwrap();

        let frame = handle.grab_frame().unwrap();
        assert_eq!(frame.data, b"jpeg-bytes");
        assert_eq!(frame.mime_type, "image/jpeg");
        assert_eq!(handle.info().label, "face.jpg");
    }

    #[tokio::test]
    async fn test_missing_facing_is_no_device() {
        let camera = StillImageCamera::new(None, None);
        let result = camera.open(Facing::Environment).await;
        assert_eq!(
            result.err(),
            Some(DeviceError::NoDevice {
                facing: Facing::Environment
            })
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_no_device() {
        let dir = TempDir::new().unwrap();
        let camera = StillImageCamera::new(Some(dir.path().join("absent.png")), None);
        let result = camera.open(Facing::User).await;
        assert_eq!(
            result.err(),
            Some(DeviceError::NoDevice {
                facing: Facing::User
            })
        );
    }

    #[tokio::test]
    async fn test_grab_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.png");
        std::fs::write(&path, b"first").unwrap();

        let camera = StillImageCamera::new(Some(path.clone()), None);
        let mut opened = camera.open(Facing::User).await.unwrap();
        let track = &mut opened.tracks[0];

        std::fs::remove_file(&path).unwrap();
        let frame = track.grab_frame().unwrap();
        assert_eq!(frame.data, b"first");
        assert_eq!(frame.mime_type, "image/png");

        track.stop();
        assert_eq!(track.grab_frame().unwrap_err(), DeviceError::StreamEnded);
    }

    #[tokio::test]
    async fn test_reopen_picks_up_new_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.jpg");
        std::fs::write(&path, b"first").unwrap();
        let camera = StillImageCamera::new(Some(path.clone()), None);

        let mut opened = camera.open(Facing::User).await.unwrap();
        assert_eq!(opened.tracks[0].grab_frame().unwrap().data, b"first");

        std::fs::write(&path, b"second").unwrap();
        let mut reopened = camera.open(Facing::User).await.unwrap();
        assert_eq!(reopened.tracks[0].grab_frame().unwrap().data, b"second");
    }
}
