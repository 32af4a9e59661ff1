//! Still capture through an external camera command

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Camera, CameraSession, Frame};
use crate::{Error, Result};

/// Camera backed by a still-capture command printing one image to stdout
///
/// Only one session may be open at a time; the session releases the camera
/// when dropped.
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    in_use: Arc<AtomicBool>,
}

impl CommandCamera {
    /// Create a camera from a command line (`program arg...`)
    ///
    /// # Errors
    ///
    /// Returns error if the command is empty
    pub fn new(command: Vec<String>, timeout: Duration) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config("camera capture command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
            in_use: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Camera for CommandCamera {
    fn open(&self) -> Result<Box<dyn CameraSession>> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Camera("camera is already in use".to_string()));
        }

        tracing::debug!(program = %self.program, "camera acquired");
        Ok(Box::new(CommandSession {
            program: self.program.clone(),
            args: self.args.clone(),
            timeout: self.timeout,
            in_use: Arc::clone(&self.in_use),
        }))
    }
}

struct CommandSession {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    in_use: Arc<AtomicBool>,
}

#[async_trait]
impl CameraSession for CommandSession {
    async fn capture_frame(&mut self) -> Result<Option<Frame>> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Camera(format!("failed to spawn {}: {e}", self.program)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::Camera(format!(
                    "capture timed out ({}s)",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Camera(format!("capture process error: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Camera(format!(
                "capture exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }

        Ok(Some(Frame::new(output.stdout)))
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
        tracing::debug!(program = %self.program, "camera released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandCamera::new(vec![], Duration::from_secs(1)).is_err());
        assert!(CommandCamera::new(vec![String::new()], Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_single_session_until_released() {
        let camera = CommandCamera::new(sh("true"), Duration::from_secs(1)).unwrap();

        let session = camera.open().unwrap();
        assert!(matches!(camera.open(), Err(Error::Camera(_))));

        drop(session);
        assert!(camera.open().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_as_frame() {
        let camera =
            CommandCamera::new(sh("printf '\\377\\330\\377frame'"), Duration::from_secs(5)).unwrap();
        let mut session = camera.open().unwrap();

        let frame = session.capture_frame().await.unwrap().unwrap();
        assert_eq!(frame.mime_type, "image/jpeg");
        assert!(frame.data.ends_with(b"frame"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_no_frame() {
        let camera = CommandCamera::new(sh("true"), Duration::from_secs(5)).unwrap();
        let mut session = camera.open().unwrap();
        assert!(session.capture_frame().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_camera_error() {
        let camera =
            CommandCamera::new(sh("echo 'no camera' >&2; exit 3"), Duration::from_secs(5)).unwrap();
        let mut session = camera.open().unwrap();

        let err = session.capture_frame().await.unwrap_err();
        assert!(err.to_string().contains("no camera"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_timeout() {
        let camera = CommandCamera::new(sh("sleep 5"), Duration::from_millis(100)).unwrap();
        let mut session = camera.open().unwrap();

        let err = session.capture_frame().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
