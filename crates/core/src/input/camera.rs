//! Live camera capture.
//!
//! A [`CameraSession`] owns an open [`MediaStream`] and stops every track when it is closed
//! or dropped, whichever exit path the caller takes.

use super::split_command;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, pointed at the medicine packaging.
    Environment,
    /// Front camera.
    User,
}

impl FacingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    /// Request a video stream. Permission problems surface here.
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn MediaStream>, CaptureError>;
}

#[async_trait]
pub trait MediaStream: Send {
    /// Grab the current frame as encoded image bytes.
    async fn capture_frame(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Stop all tracks of the stream. Must be idempotent.
    fn stop_all_tracks(&mut self);
}

/// Scoped ownership of an open camera stream.
pub struct CameraSession {
    stream: Option<Box<dyn MediaStream>>,
}

impl CameraSession {
    pub async fn open(camera: &dyn Camera, facing: FacingMode) -> Result<Self, CaptureError> {
        let stream = camera.open(facing).await.inspect_err(|e| {
            tracing::warn!("error accessing camera: {}", e);
        })?;
        tracing::debug!("camera opened ({})", facing.as_str());
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub async fn capture_frame(&mut self) -> Result<Vec<u8>, CaptureError> {
        match self.stream.as_mut() {
            Some(stream) => stream.capture_frame().await,
            None => Err(CaptureError::CameraUnavailable("camera is closed".into())),
        }
    }

    /// Close the camera view, releasing the stream now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            tracing::debug!("camera released");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Camera backed by an external capture command that writes one encoded frame to stdout
/// per invocation (for example `fswebcam --no-banner -`).
///
/// The facing preference is passed in `MEDINFO_CAMERA_FACING`.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let (program, args) = split_command(command_line)?;
        Some(Self { program, args })
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn MediaStream>, CaptureError> {
        Ok(Box::new(CommandStream {
            program: self.program.clone(),
            args: self.args.clone(),
            facing,
            live: true,
        }))
    }
}

struct CommandStream {
    program: String,
    args: Vec<String>,
    facing: FacingMode,
    live: bool,
}

#[async_trait]
impl MediaStream for CommandStream {
    async fn capture_frame(&mut self) -> Result<Vec<u8>, CaptureError> {
        if !self.live {
            return Err(CaptureError::CameraUnavailable("stream stopped".into()));
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .env("MEDINFO_CAMERA_FACING", self.facing.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::CameraUnavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CaptureError::CameraUnavailable(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::CameraUnavailable("no frame captured".into()));
        }
        Ok(output.stdout)
    }

    fn stop_all_tracks(&mut self) {
        self.live = false;
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeCamera;
    use super::*;

    #[tokio::test]
    async fn test_close_stops_tracks() {
        let camera = FakeCamera::default();
        let mut session = CameraSession::open(&camera, FacingMode::Environment)
            .await
            .unwrap();
        assert_eq!(session.capture_frame().await.unwrap(), vec![0xFF, 0xD8, 0xFF]);

        session.close();
        assert_eq!(camera.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_on_error_path_stops_tracks() {
        let camera = FakeCamera::default();

        async fn capture_then_fail(camera: &FakeCamera) -> Result<(), CaptureError> {
            let _session = CameraSession::open(camera, FacingMode::Environment).await?;
            Err(CaptureError::Ocr("abandoned".into()))
        }

        assert!(capture_then_fail(&camera).await.is_err());
        assert_eq!(camera.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_denied_permission_is_dismissible() {
        let camera = FakeCamera {
            deny: true,
            ..FakeCamera::default()
        };
        let result = CameraSession::open(&camera, FacingMode::Environment).await;
        match result {
            Err(e) => assert!(!e.is_unsupported()),
            Ok(_) => panic!("expected camera error"),
        }
        assert_eq!(camera.stop_count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_camera_frames_and_stop() {
        let camera = CommandCamera::from_command_line("echo frame").unwrap();
        let mut stream = camera.open(FacingMode::Environment).await.unwrap();

        assert_eq!(stream.capture_frame().await.unwrap(), b"frame\n".to_vec());

        stream.stop_all_tracks();
        assert!(matches!(
            stream.capture_frame().await,
            Err(CaptureError::CameraUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_camera_passes_facing() {
        let camera = CommandCamera::from_command_line("printenv MEDINFO_CAMERA_FACING").unwrap();
        let mut session = CameraSession::open(&camera, FacingMode::User).await.unwrap();

        assert_eq!(session.capture_frame().await.unwrap(), b"user\n".to_vec());
        session.close();
    }
}
